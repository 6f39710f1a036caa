use std::{env, path::PathBuf};

const WATCHED_ENV: [&str; 5] = [
    "FFMPEG_DIR",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
    "MOVIEPRINT_FFMPEG",
];

/// Hints for locating the FFmpeg development libraries on Windows, where
/// `ffmpeg-sys-next` has no pkg-config to fall back on.
fn windows_hints() -> Vec<String> {
    if env::var_os("FFMPEG_DIR").is_some() {
        return Vec::new();
    }
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        return vec![
            "FFMPEG_DIR is not set. Install FFmpeg through vcpkg and set VCPKG_ROOT and FFMPEG_DIR to build movieprint on Windows.".to_string(),
        ];
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if !install.exists() {
        return vec![format!(
            "VCPKG_ROOT is set but {} does not exist; FFmpeg libraries will not be found.",
            install.display()
        )];
    }

    let mut hints = vec![format!(
        "Found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it explicitly.",
        install.display()
    )];
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        hints.push("Set VCPKGRS_DYNAMIC=1 for dynamically linked vcpkg FFmpeg builds.".to_string());
    }
    let tools = install.join("tools").join("ffmpeg").join("ffmpeg.exe");
    if tools.exists() && env::var_os("MOVIEPRINT_FFMPEG").is_none() {
        hints.push(format!(
            "Set MOVIEPRINT_FFMPEG={} so interval extraction can use the bundled ffmpeg executable.",
            tools.display()
        ));
    }
    hints
}

fn main() {
    for name in WATCHED_ENV {
        println!("cargo:rerun-if-env-changed={name}");
    }

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows" {
        return;
    }
    for hint in windows_hints() {
        println!("cargo:warning={hint}");
    }
}
