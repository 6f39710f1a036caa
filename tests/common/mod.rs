//! Fixture helpers shared by the integration tests.
//!
//! Fixtures are synthesised with the `ffmpeg` executable so nothing binary is
//! checked in. Tests that need one return early when `ffmpeg` is missing.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use image::{Rgb, RgbImage};

/// Width of every synthesised clip.
pub const CLIP_WIDTH: u32 = 64;
/// Height of every synthesised clip.
pub const CLIP_HEIGHT: u32 = 48;
/// Frame rate of every synthesised clip.
pub const CLIP_FPS: u32 = 20;

/// Whether the `ffmpeg` executable can be run.
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Write a 3 second clip into `dir`: 1.5 s of blue, then 1.5 s of red.
///
/// The single cut sits on frame 30. Returns `None` when `ffmpeg` is not
/// available or fails.
pub fn two_shot_clip(dir: &Path, name: &str) -> Option<PathBuf> {
    if !ffmpeg_available() {
        return None;
    }
    let path = dir.join(name);
    let source = |colour: &str| {
        format!("color=c={colour}:s={CLIP_WIDTH}x{CLIP_HEIGHT}:r={CLIP_FPS}:d=1.5")
    };
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "lavfi", "-i", &source("blue")])
        .args(["-f", "lavfi", "-i", &source("red")])
        .args(["-filter_complex", "[0:v][1:v]concat=n=2:v=1:a=0[v]", "-map", "[v]"])
        .args(["-c:v", "mpeg4", "-q:v", "2", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .ok()?;
    status.success().then_some(path)
}

/// Write the blue/red clip of [`two_shot_clip`] as MPEG-TS whose timestamps
/// start at `offset` seconds instead of zero.
pub fn offset_clip(dir: &Path, name: &str, offset: f64) -> Option<PathBuf> {
    let plain = two_shot_clip(dir, &format!("plain_{name}.mp4"))?;
    let path = dir.join(name);
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-i"])
        .arg(&plain)
        .args(["-c:v", "copy", "-output_ts_offset", &format!("{offset}"), "-f", "mpegts"])
        .arg(&path)
        .status()
        .ok()?;
    status.success().then_some(path)
}

/// Write `count` solid-colour PNGs of `width × height` into `dir`.
pub fn solid_images(dir: &Path, count: usize, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|index| {
            let shade = (index * 40 % 256) as u8;
            let path = dir.join(format!("image_{index:03}.png"));
            RgbImage::from_pixel(width, height, Rgb([shade, 255 - shade, 128]))
                .save(&path)
                .expect("Failed to write test image");
            path
        })
        .collect()
}
