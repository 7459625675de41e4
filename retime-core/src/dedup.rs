//! Rate-driven duplicate removal.
//!
//! Decimates a frame store by treating the detected duplication rate as a
//! sampling stride. This is deliberately distinct from
//! [`FrameStore::spaced_removal`]: that one removes a computed *count* of
//! frames evenly, while this one *keeps* every rate-th frame. The two serve
//! different callers and are not interchangeable.

use crate::detection::DuplicationRate;
use crate::error::CoreResult;
use crate::frames::FrameStore;
use std::fs;

/// Copies approximately `count / rate` frames from `input` into `output`,
/// keeping positions `round(i * rate)` of the sorted file list.
///
/// A rate at (or clamped to) 1.0 keeps every frame; callers are expected to
/// have short-circuited the removal branch before getting here, so this is
/// just a copy in that case. Returns the number of frames kept.
pub fn remove_duplicates(
    input: &FrameStore,
    output: &FrameStore,
    rate: DuplicationRate,
) -> CoreResult<u64> {
    let frames = input.files()?;
    let total = frames.len();
    if total == 0 {
        log::warn!(
            "No frames to deduplicate in {}",
            input.path().display()
        );
        return Ok(0);
    }

    let stride = rate.value();
    let keep_count = (total as f64 / stride) as usize;
    let mut keep_indices: Vec<usize> = (0..keep_count)
        .map(|i| (i as f64 * stride).round() as usize)
        .filter(|&i| i < total)
        .collect();
    keep_indices.dedup();

    fs::create_dir_all(output.path())?;
    for &i in &keep_indices {
        let name = frames[i].file_name().ok_or_else(|| {
            crate::error::CoreError::PathError(format!(
                "Frame file without a name: {}",
                frames[i].display()
            ))
        })?;
        fs::copy(&frames[i], output.path().join(name))?;
    }

    log::info!(
        "Duplicate removal: kept {} of {} frames (rate {})",
        keep_indices.len(),
        total,
        rate
    );
    Ok(keep_indices.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn store_with_frames(n: usize) -> (tempfile::TempDir, FrameStore) {
        let dir = tempdir().unwrap();
        for i in 1..=n {
            File::create(dir.path().join(format!("frame_{i:08}.png"))).unwrap();
        }
        let store = FrameStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn rate_two_keeps_every_other_frame() {
        let (_in_dir, input) = store_with_frames(100);
        let out_dir = tempdir().unwrap();
        let output = FrameStore::new(out_dir.path());

        let kept = remove_duplicates(&input, &output, DuplicationRate::new(2.0)).unwrap();
        assert_eq!(kept, 50);
        assert_eq!(output.count().unwrap(), 50);
        // Keep positions round(i * 2.0): the odd-numbered source frames.
        assert!(out_dir.path().join("frame_00000001.png").exists());
        assert!(out_dir.path().join("frame_00000003.png").exists());
        assert!(!out_dir.path().join("frame_00000002.png").exists());
    }

    #[test]
    fn fractional_rate_keeps_proportional_count() {
        let (_in_dir, input) = store_with_frames(100);
        let out_dir = tempdir().unwrap();
        let output = FrameStore::new(out_dir.path());

        let kept = remove_duplicates(&input, &output, DuplicationRate::new(1.25)).unwrap();
        assert_eq!(kept, 80);
    }

    #[test]
    fn unit_rate_copies_everything() {
        let (_in_dir, input) = store_with_frames(7);
        let out_dir = tempdir().unwrap();
        let output = FrameStore::new(out_dir.path());

        let kept = remove_duplicates(&input, &output, DuplicationRate::new(1.0)).unwrap();
        assert_eq!(kept, 7);
    }

    #[test]
    fn empty_input_keeps_nothing() {
        let (_in_dir, input) = store_with_frames(0);
        let out_dir = tempdir().unwrap();
        let output = FrameStore::new(out_dir.path());
        assert_eq!(
            remove_duplicates(&input, &output, DuplicationRate::new(2.0)).unwrap(),
            0
        );
    }
}
