//! Shot-boundary extraction integration tests.
//!
//! The synthesised clip cuts from blue to red on frame 30 (1.5 s at 20 fps).

mod common;

use movieprint::{ExtractionSpec, MoviePrintError, ShotBoundaryExtractor, extract};

#[test]
fn detects_the_single_cut() {
    if !ShotBoundaryExtractor::is_available() {
        return;
    }
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };

    let spec = ExtractionSpec::shots(10.0).build().unwrap();
    let records = extract(&clip, dir.path().join("shots"), &spec).expect("Shot extraction failed");

    assert_eq!(records.len(), 2, "records: {records:?}");
    let first = records[0].shot.expect("first record has no shot span");
    let second = records[1].shot.expect("second record has no shot span");

    assert_eq!(first.start_frame, 0);
    assert!(second.start_frame.abs_diff(30) <= 1, "cut at {}", second.start_frame);
    assert_eq!(first.end_frame, second.start_frame);
    assert!(second.end_frame.abs_diff(60) <= 1);
    assert_eq!(records[1].frame_number, second.start_frame);
    assert_eq!(records[1].weight(), second.duration_frames as f64);

    let name = records[1].path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("shot_0002_absFN"), "unexpected name {name}");
    assert_eq!(records[0].shot_number, Some(1));
    assert_eq!(records[1].shot_number, Some(2));

    // First frame of the second shot is red.
    let pixel = image::open(&records[1].path).unwrap().to_rgb8().get_pixel(32, 24).0;
    assert!(pixel[0] > 180 && pixel[2] < 80, "unexpected colour {pixel:?}");
}

#[test]
fn window_after_the_cut_is_one_shot() {
    if !ShotBoundaryExtractor::is_available() {
        return;
    }
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };

    let spec = ExtractionSpec::shots(10.0)
        .with_window(Some(2.0), None)
        .build()
        .unwrap();
    let records = extract(&clip, dir.path().join("shots"), &spec).expect("Shot extraction failed");

    assert_eq!(records.len(), 1);
    let shot = records[0].shot.unwrap();
    assert_eq!(shot.start_frame, 40);
    assert!(shot.end_frame.abs_diff(60) <= 1);
}

#[test]
fn maximum_threshold_finds_no_cut() {
    if !ShotBoundaryExtractor::is_available() {
        return;
    }
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };

    let spec = ExtractionSpec::shots(100.0).build().unwrap();
    let records = extract(&clip, dir.path().join("shots"), &spec).expect("Shot extraction failed");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].shot.unwrap().start_frame, 0);
}

#[test]
fn threshold_outside_scale_is_rejected() {
    let result = ExtractionSpec::shots(150.0).build();
    assert!(matches!(result, Err(MoviePrintError::InvalidParameters(_))));
    let result = ExtractionSpec::shots(-1.0).build();
    assert!(matches!(result, Err(MoviePrintError::InvalidParameters(_))));
}

#[cfg(not(feature = "scene"))]
#[test]
fn shot_mode_without_feature_is_capability_missing() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };
    let spec = ExtractionSpec::shots(10.0).build().unwrap();
    let result = extract(&clip, dir.path().join("shots"), &spec);
    assert!(matches!(result, Err(MoviePrintError::CapabilityMissing(_))));
}
