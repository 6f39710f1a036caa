//! Down-sampling and exclusion integration tests.

use movieprint::{Exclusions, FrameRecord, ShotSpan, apply_exclusions, sample, sample_indices};

fn interval_records(count: u64) -> Vec<FrameRecord> {
    (0..count)
        .map(|index| {
            FrameRecord::new(
                "clip.mp4",
                index * 25,
                index as f64,
                format!("/frames/frame_{index:05}_absFN{}.jpg", index * 25),
            )
        })
        .collect()
}

// ── sample_indices ─────────────────────────────────────────────────

#[test]
fn picks_exactly_the_target_when_dropping() {
    for count in 2..120 {
        for target in 1..count {
            let picks = sample_indices(count, target);
            assert_eq!(picks.len(), target, "count={count} target={target}");
        }
    }
}

#[test]
fn picks_are_strictly_increasing_and_keep_both_ends() {
    for count in 3..80 {
        for target in 2..count {
            let picks = sample_indices(count, target);
            assert!(picks.windows(2).all(|pair| pair[0] < pair[1]));
            assert_eq!(picks.first(), Some(&0));
            assert_eq!(picks.last(), Some(&(count - 1)));
        }
    }
}

#[test]
fn small_inputs_are_kept_whole() {
    assert_eq!(sample_indices(4, 10), vec![0, 1, 2, 3]);
    assert_eq!(sample_indices(4, 4), vec![0, 1, 2, 3]);
    assert_eq!(sample_indices(9, 1), vec![0]);
    assert!(sample_indices(0, 3).is_empty());
}

#[test]
fn known_selection() {
    assert_eq!(sample_indices(10, 4), vec![0, 3, 6, 9]);
    assert_eq!(sample_indices(100, 5), vec![0, 24, 49, 74, 99]);
}

// ── sample ─────────────────────────────────────────────────────────

#[test]
fn sampling_is_idempotent() {
    let once = sample(interval_records(57), Some(12));
    let twice = sample(once.clone(), Some(12));
    assert_eq!(once.len(), 12);
    assert_eq!(once, twice);
}

#[test]
fn sampling_preserves_order_and_records() {
    let records = interval_records(10);
    let kept = sample(records.clone(), Some(4));
    let frames: Vec<u64> = kept.iter().map(|record| record.frame_number).collect();
    assert_eq!(frames, vec![0, 75, 150, 225]);
    assert_eq!(kept[1], records[3]);
}

#[test]
fn no_target_keeps_everything() {
    let records = interval_records(7);
    assert_eq!(sample(records.clone(), None), records);
}

// ── exclusions ─────────────────────────────────────────────────────

#[test]
fn frame_exclusions_drop_matches_and_warn_on_misses() {
    let filtered = apply_exclusions(interval_records(5), &Exclusions::Frames(vec![25, 75, 999]));
    let frames: Vec<u64> = filtered.records.iter().map(|record| record.frame_number).collect();
    assert_eq!(frames, vec![0, 50, 100]);
    assert_eq!(filtered.warnings.len(), 1);
    assert!(filtered.warnings[0].contains("999"));
}

#[test]
fn shot_exclusions_are_one_based() {
    let records: Vec<FrameRecord> = [(0, 30), (30, 45), (45, 90)]
        .iter()
        .enumerate()
        .map(|(index, &(start, end))| {
            FrameRecord::new("clip.mp4", start, start as f64 / 30.0, format!("/shots/{index}.jpg"))
                .with_shot(ShotSpan::new(start, end).unwrap())
        })
        .collect();

    let filtered = apply_exclusions(records, &Exclusions::Shots(vec![2, 0, 7]));
    let starts: Vec<u64> = filtered.records.iter().map(|record| record.frame_number).collect();
    assert_eq!(starts, vec![0, 45]);
    assert_eq!(filtered.warnings.len(), 2);
}

#[test]
fn shot_exclusions_follow_shot_numbers_after_a_skip() {
    // Shot 3 could not be read, so the third record is shot 4.
    let records: Vec<FrameRecord> = [(1, 0, 30), (2, 30, 45), (4, 60, 90)]
        .iter()
        .map(|&(number, start, end)| {
            FrameRecord::new(
                "clip.mp4",
                start,
                start as f64 / 30.0,
                format!("/shots/shot_{number:04}_absFN{start}.jpg"),
            )
            .with_shot(ShotSpan::new(start, end).unwrap())
            .with_shot_number(number)
        })
        .collect();

    let filtered = apply_exclusions(records.clone(), &Exclusions::Shots(vec![4]));
    let starts: Vec<u64> = filtered.records.iter().map(|record| record.frame_number).collect();
    assert_eq!(starts, vec![0, 30]);
    assert!(filtered.warnings.is_empty());

    let filtered = apply_exclusions(records, &Exclusions::Shots(vec![3]));
    assert_eq!(filtered.records.len(), 3);
    assert_eq!(filtered.warnings.len(), 1);
    assert!(filtered.warnings[0].contains('3'));
}

#[test]
fn no_exclusions_is_a_no_op() {
    let records = interval_records(3);
    let filtered = apply_exclusions(records.clone(), &Exclusions::None);
    assert_eq!(filtered.records, records);
    assert!(filtered.warnings.is_empty());
    assert!(Exclusions::Frames(Vec::new()).is_empty());
}
