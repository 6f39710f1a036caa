//! Exclusion filtering and deterministic down-sampling.
//!
//! [`sample`] picks an evenly spaced (by index, not by time) subset of an
//! extracted sequence. The selection is reproducible: the same input and
//! target always give the same output, and sampling an already sampled
//! sequence again changes nothing.

use std::collections::BTreeSet;

use crate::frame::FrameRecord;

/// What exclusion values refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusions {
    /// Nothing is excluded.
    None,
    /// Absolute frame numbers (interval mode).
    Frames(Vec<u64>),
    /// 1-based shot numbers (shot mode), as in the `shot_NNNN` file names.
    /// Records without a shot number count by their 1-based position.
    Shots(Vec<usize>),
}

impl Exclusions {
    /// Whether nothing is excluded.
    pub fn is_empty(&self) -> bool {
        match self {
            Exclusions::None => true,
            Exclusions::Frames(frames) => frames.is_empty(),
            Exclusions::Shots(shots) => shots.is_empty(),
        }
    }
}

/// Result of [`apply_exclusions`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    /// Records that survived.
    pub records: Vec<FrameRecord>,
    /// One message per exclusion value that matched nothing.
    pub warnings: Vec<String>,
}

/// Remove excluded records.
///
/// Values that match no record are reported as warnings, not errors.
pub fn apply_exclusions(records: Vec<FrameRecord>, exclusions: &Exclusions) -> Filtered {
    let mut warnings = Vec::new();

    let records = match exclusions {
        Exclusions::None => records,
        Exclusions::Frames(frames) => {
            let excluded: BTreeSet<u64> = frames.iter().copied().collect();
            let present: BTreeSet<u64> = records.iter().map(|record| record.frame_number).collect();
            warnings.extend(
                excluded
                    .difference(&present)
                    .map(|frame| format!("excluded frame {frame} was not among the extracted frames")),
            );
            records
                .into_iter()
                .filter(|record| !excluded.contains(&record.frame_number))
                .collect()
        }
        Exclusions::Shots(shots) => {
            let excluded: BTreeSet<usize> = shots.iter().copied().collect();
            let numbered: Vec<(usize, FrameRecord)> = records
                .into_iter()
                .enumerate()
                .map(|(index, record)| (record.shot_number.unwrap_or(index + 1), record))
                .collect();
            let present: BTreeSet<usize> = numbered.iter().map(|(number, _)| *number).collect();
            warnings.extend(
                excluded
                    .difference(&present)
                    .map(|shot| format!("excluded shot {shot} was not among the extracted shots")),
            );
            numbered
                .into_iter()
                .filter(|(number, _)| !excluded.contains(number))
                .map(|(_, record)| record)
                .collect()
        }
    };

    for warning in &warnings {
        log::warn!("{warning}");
    }

    Filtered { records, warnings }
}

/// Indices picked when reducing `count` items to at most `target`.
///
/// For `count > target >= 2` the picks are `floor(i * (count-1) / (target-1))`
/// for `i in 0..target`, deduplicated and then truncated to `target`;
/// `target == 1` picks only the first item. When nothing needs dropping every
/// index is kept.
pub fn sample_indices(count: usize, target: usize) -> Vec<usize> {
    if count <= target {
        return (0..count).collect();
    }
    if target == 0 {
        return Vec::new();
    }
    if target == 1 {
        return vec![0];
    }

    let mut indices: Vec<usize> = (0..target)
        .map(|i| i * (count - 1) / (target - 1))
        .collect();
    indices.dedup();
    indices.truncate(target);
    indices
}

/// Reduce `records` to at most `max_count` evenly spaced entries.
///
/// `None` keeps everything.
pub fn sample(records: Vec<FrameRecord>, max_count: Option<usize>) -> Vec<FrameRecord> {
    let Some(target) = max_count else {
        return records;
    };
    if records.len() <= target {
        return records;
    }

    let keep = sample_indices(records.len(), target);
    log::info!("Down-sampling {} frames to {}", records.len(), keep.len());

    let mut keep = keep.into_iter().peekable();
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| {
            if keep.peek() == Some(&index) {
                keep.next();
                Some(record)
            } else {
                None
            }
        })
        .collect()
}
