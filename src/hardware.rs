//! Hardware-accelerated decoding for the external transcoder.
//!
//! [`HardwareAccelerationMode`] selects whether the `ffmpeg` executable is
//! asked to decode on a GPU (`-hwaccel <device>`). Availability depends on
//! both the FFmpeg build and the host drivers, so the device list is probed
//! from `ffmpeg -hwaccels` before use. An unavailable device means the GPU
//! attempt is skipped and CPU decoding is used.

use std::{path::Path, process::Command};

use serde::Serialize;

/// Hardware acceleration mode for video decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareAccelerationMode {
    /// Let FFmpeg pick the best available device (`-hwaccel auto`).
    Auto,
    /// Plain CPU decoding.
    #[default]
    Software,
    /// Use a specific device type.
    Specific(HardwareDeviceType),
}

impl HardwareAccelerationMode {
    /// Parse `auto`, `software`/`cpu`, or a device name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "auto" | "gpu" => Some(HardwareAccelerationMode::Auto),
            "software" | "sw" | "cpu" | "none" => Some(HardwareAccelerationMode::Software),
            other => HardwareDeviceType::from_hwaccel_name(other)
                .map(HardwareAccelerationMode::Specific),
        }
    }

    /// Whether a GPU attempt was requested at all.
    pub fn is_requested(self) -> bool {
        self != HardwareAccelerationMode::Software
    }
}

/// Supported hardware device types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareDeviceType {
    /// NVIDIA CUDA (Linux, Windows).
    Cuda,
    /// Video Acceleration API (Linux).
    Vaapi,
    /// DirectX Video Acceleration 2 (Windows).
    Dxva2,
    /// Direct3D 11 Video Acceleration (Windows).
    D3d11va,
    /// Apple VideoToolbox (macOS, iOS).
    VideoToolbox,
    /// Intel Quick Sync Video (cross-platform).
    Qsv,
}

impl HardwareDeviceType {
    /// The name `ffmpeg -hwaccel` expects.
    pub fn hwaccel_name(self) -> &'static str {
        match self {
            HardwareDeviceType::Cuda => "cuda",
            HardwareDeviceType::Vaapi => "vaapi",
            HardwareDeviceType::Dxva2 => "dxva2",
            HardwareDeviceType::D3d11va => "d3d11va",
            HardwareDeviceType::VideoToolbox => "videotoolbox",
            HardwareDeviceType::Qsv => "qsv",
        }
    }

    fn from_hwaccel_name(name: &str) -> Option<Self> {
        match name.trim() {
            "cuda" => Some(HardwareDeviceType::Cuda),
            "vaapi" => Some(HardwareDeviceType::Vaapi),
            "dxva2" => Some(HardwareDeviceType::Dxva2),
            "d3d11va" => Some(HardwareDeviceType::D3d11va),
            "videotoolbox" => Some(HardwareDeviceType::VideoToolbox),
            "qsv" => Some(HardwareDeviceType::Qsv),
            _ => None,
        }
    }
}

/// List the hardware decoders the given `ffmpeg` executable supports.
///
/// Returns an empty list when the tool cannot be run.
pub fn available_hardware_devices(program: &Path) -> Vec<HardwareDeviceType> {
    match Command::new(program)
        .args(["-hide_banner", "-hwaccels"])
        .output()
    {
        Ok(output) if output.status.success() => {
            parse_hwaccels(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            log::debug!("`ffmpeg -hwaccels` exited with {}", output.status);
            Vec::new()
        }
        Err(error) => {
            log::debug!("Could not run `ffmpeg -hwaccels`: {error}");
            Vec::new()
        }
    }
}

/// Parse the output of `ffmpeg -hwaccels`.
fn parse_hwaccels(output: &str) -> Vec<HardwareDeviceType> {
    output
        .lines()
        .skip_while(|line| !line.starts_with("Hardware acceleration methods"))
        .skip(1)
        .filter_map(HardwareDeviceType::from_hwaccel_name)
        .collect()
}

/// Resolve the `-hwaccel` argument for a requested mode.
///
/// Returns `None` when no GPU attempt should be made: software mode was
/// requested, no device is available, or the specific device is missing.
pub(crate) fn resolve_hwaccel(
    mode: HardwareAccelerationMode,
    available: &[HardwareDeviceType],
) -> Option<&'static str> {
    match mode {
        HardwareAccelerationMode::Software => None,
        HardwareAccelerationMode::Auto => (!available.is_empty()).then_some("auto"),
        HardwareAccelerationMode::Specific(device) => available
            .contains(&device)
            .then_some(device.hwaccel_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Hardware acceleration methods:\nvdpau\ncuda\nvaapi\nqsv\ndrm\n\n";

    #[test]
    fn parses_hwaccel_listing() {
        assert_eq!(
            parse_hwaccels(SAMPLE),
            vec![
                HardwareDeviceType::Cuda,
                HardwareDeviceType::Vaapi,
                HardwareDeviceType::Qsv
            ]
        );
        assert!(parse_hwaccels("").is_empty());
    }

    #[test]
    fn resolves_requested_device() {
        let available = parse_hwaccels(SAMPLE);
        assert_eq!(resolve_hwaccel(HardwareAccelerationMode::Software, &available), None);
        assert_eq!(resolve_hwaccel(HardwareAccelerationMode::Auto, &available), Some("auto"));
        assert_eq!(
            resolve_hwaccel(
                HardwareAccelerationMode::Specific(HardwareDeviceType::Cuda),
                &available
            ),
            Some("cuda")
        );
        assert_eq!(
            resolve_hwaccel(
                HardwareAccelerationMode::Specific(HardwareDeviceType::Dxva2),
                &available
            ),
            None
        );
        assert_eq!(resolve_hwaccel(HardwareAccelerationMode::Auto, &[]), None);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(HardwareAccelerationMode::parse("CPU"), Some(HardwareAccelerationMode::Software));
        assert_eq!(
            HardwareAccelerationMode::parse("videotoolbox"),
            Some(HardwareAccelerationMode::Specific(HardwareDeviceType::VideoToolbox))
        );
        assert_eq!(HardwareAccelerationMode::parse("voodoo"), None);
    }
}
