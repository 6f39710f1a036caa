//! End-to-end print generation tests.
//!
//! Each test synthesises clips with the `ffmpeg` executable and returns
//! early when it is not installed.

mod common;

use std::sync::{Arc, Mutex};

use movieprint::{
    ExtractionSpec, LabelStyle, LayoutSpec, MoviePrintError, PrintSettings, ProgressCallback,
    ProgressInfo, ShotBoundaryExtractor, process_video, run_batch,
};

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressInfo>>);

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0.lock().unwrap().push(info.clone());
    }
}

fn read_json(path: &std::path::Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).expect("Failed to read sidecar");
    serde_json::from_str(&text).expect("Sidecar is not valid JSON")
}

// ── grid ───────────────────────────────────────────────────────────

#[test]
fn interval_grid_print_with_sidecar() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };
    let prints = dir.path().join("prints");

    let settings = PrintSettings::new(
        ExtractionSpec::interval_seconds(0.5).build().unwrap(),
        LayoutSpec::grid()
            .with_columns(2)
            .with_label(LabelStyle::default())
            .build()
            .unwrap(),
        &prints,
    )
    .unwrap()
    .with_max_frames(4);

    let outcome = process_video(&clip, &settings, "clip_movieprint.jpg").expect("Pipeline failed");
    assert_eq!(outcome.print_path, prints.join("clip_movieprint.jpg"));
    assert_eq!(outcome.frames_extracted, 6);
    assert_eq!(outcome.frames_in_print, 4);

    let print = image::open(&outcome.print_path).expect("Print is not a readable image");
    assert_eq!(print.width(), 2 * 64 + 3 * 5);
    assert_eq!(print.height(), 2 * 48 + 3 * 5);

    let sidecar_path = outcome.sidecar_path.expect("Sidecar was not written");
    assert_eq!(sidecar_path, prints.join("clip_movieprint.json"));
    let sidecar = read_json(&sidecar_path);
    assert_eq!(sidecar["movieprint_image_filename"], "clip_movieprint.jpg");
    assert_eq!(sidecar["generation_parameters"]["actual_frames_in_print"], 4);
    assert_eq!(sidecar["generation_parameters"]["max_frames_for_print"], 4);

    let thumbnails = sidecar["thumbnails"].as_array().unwrap();
    assert_eq!(thumbnails.len(), 4);
    assert_eq!(thumbnails[0]["frame_number"], 0);
    assert_eq!(thumbnails[0]["timecode"], "00:00:00.000");
    assert_eq!(thumbnails[1]["layout_in_movieprint"]["x"], 5 + 64 + 5);
    assert!(thumbnails[0].get("start_frame").is_none());
}

#[test]
fn existing_print_gets_a_fresh_name() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };
    let prints = dir.path().join("prints");
    let settings = PrintSettings::new(
        ExtractionSpec::interval_seconds(1.0),
        LayoutSpec::grid(),
        &prints,
    )
    .unwrap()
    .with_sidecar(false);

    let first = process_video(&clip, &settings, "clip.png").unwrap();
    let second = process_video(&clip, &settings, "clip.png").unwrap();
    assert_eq!(first.print_path, prints.join("clip.png"));
    assert_eq!(second.print_path, prints.join("clip_1.png"));
    assert!(second.sidecar_path.is_none());
}

#[test]
fn persistent_frame_directory_is_kept() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };
    let frames = dir.path().join("frames");
    let settings = PrintSettings::new(
        ExtractionSpec::interval_seconds(1.0),
        LayoutSpec::grid(),
        dir.path().join("prints"),
    )
    .unwrap()
    .with_frame_root(&frames);

    process_video(&clip, &settings, "clip.png").unwrap();
    let kept = std::fs::read_dir(frames.join("movieprint_temp_clip")).unwrap().count();
    assert_eq!(kept, 3);
}

// ── timeline ───────────────────────────────────────────────────────

#[test]
fn shot_timeline_print() {
    if !ShotBoundaryExtractor::is_available() {
        return;
    }
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };
    let prints = dir.path().join("prints");
    let settings = PrintSettings::new(
        ExtractionSpec::shots(10.0).build().unwrap(),
        LayoutSpec::timeline(300, 48).build().unwrap(),
        &prints,
    )
    .unwrap();

    let outcome = process_video(&clip, &settings, "clip_timeline.png").expect("Pipeline failed");
    assert_eq!(outcome.frames_in_print, 2);
    let print = image::open(&outcome.print_path).unwrap();
    assert_eq!(print.width(), 300);

    let sidecar = read_json(&outcome.sidecar_path.unwrap());
    let thumbnails = sidecar["thumbnails"].as_array().unwrap();
    assert_eq!(thumbnails.len(), 2);
    assert_eq!(thumbnails[0]["start_frame"], 0);
    assert_eq!(sidecar["generation_parameters"]["extraction"]["mode"], "shot");
    assert!(thumbnails[1]["duration_frames"].as_u64().unwrap() > 0);
}

// ── batches ────────────────────────────────────────────────────────

#[test]
fn batch_over_a_directory() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let videos = dir.path().join("videos");
    std::fs::create_dir_all(videos.join("nested")).unwrap();
    let Some(_) = common::two_shot_clip(&videos, "a.mp4") else {
        return;
    };
    common::two_shot_clip(&videos.join("nested"), "b.mp4").unwrap();
    std::fs::write(videos.join("notes.txt"), b"not a video").unwrap();

    let prints = dir.path().join("prints");
    let settings = PrintSettings::new(
        ExtractionSpec::interval_seconds(1.0),
        LayoutSpec::grid(),
        &prints,
    )
    .unwrap()
    .with_output_filename("ignored.png")
    .with_recursive(true);

    let recorder = Arc::new(Recorder::default());
    let report = run_batch(&[&videos], &settings, recorder.clone()).unwrap();

    assert!(report.is_success(), "failures: {:?}", report.failed);
    assert_eq!(report.succeeded.len(), 2);
    assert!(prints.join("a_movieprint.jpg").is_file());
    assert!(prints.join("b_movieprint.jpg").is_file());
    assert!(!prints.join("ignored.png").exists());

    let updates = recorder.0.lock().unwrap();
    assert_eq!(updates.len(), 3);
    assert!(updates.last().unwrap().video.is_none());
}

#[test]
fn explicit_name_applies_to_a_single_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };
    let prints = dir.path().join("prints");
    let settings = PrintSettings::new(
        ExtractionSpec::interval_seconds(1.0),
        LayoutSpec::grid(),
        &prints,
    )
    .unwrap()
    .with_output_filename("overview");

    let report = run_batch(&[&clip], &settings, Arc::new(movieprint::NoOpProgress)).unwrap();
    assert_eq!(report.succeeded[0].1, prints.join("overview.jpg"));
}

#[test]
fn everything_excluded_is_no_placeable_images() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let Some(clip) = common::two_shot_clip(dir.path(), "clip.mp4") else {
        return;
    };
    let frames = movieprint::extract(
        &clip,
        dir.path().join("probe_frames"),
        &ExtractionSpec::interval_seconds(1.0),
    )
    .unwrap();
    let excluded = frames.iter().map(|record| record.frame_number).collect();

    let settings = PrintSettings::new(
        ExtractionSpec::interval_seconds(1.0),
        LayoutSpec::grid(),
        dir.path().join("prints"),
    )
    .unwrap()
    .with_exclusions(movieprint::Exclusions::Frames(excluded));

    let result = process_video(&clip, &settings, "clip.png");
    assert!(matches!(result, Err(MoviePrintError::NoPlaceableImages)));
}

#[test]
fn missing_inputs_find_no_video() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings = PrintSettings::new(
        ExtractionSpec::interval_seconds(1.0),
        LayoutSpec::grid(),
        dir.path().join("prints"),
    )
    .unwrap();
    let result = run_batch(
        &[dir.path().join("absent.mp4")],
        &settings,
        Arc::new(movieprint::NoOpProgress),
    );
    assert!(matches!(result, Err(MoviePrintError::NoVideoFound)));
}
