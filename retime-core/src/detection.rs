//! Duplication-rate probe.
//!
//! Estimates how many times each real frame was repeated in a store by
//! comparing consecutive frames in grayscale. This is a cheap proxy for
//! stutter detection, not a perceptual similarity metric; false positives
//! and negatives near the threshold are an accepted approximation.

use crate::error::CoreResult;
use crate::frames::{frame_index, FrameStore};
use image::GrayImage;
use std::path::{Path, PathBuf};

/// Ratio of total frames to visually-unique frames in a store.
///
/// Always at least 1.0: a store cannot have fewer unique frames than total
/// frames, so lower computed values are clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicationRate(f64);

impl DuplicationRate {
    pub fn new(rate: f64) -> Self {
        Self(rate.max(1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether the rate is far enough above 1.0 to justify the removal
    /// branch at all.
    pub fn is_significant(&self, epsilon: f64) -> bool {
        self.0 > 1.0 + epsilon
    }
}

impl std::fmt::Display for DuplicationRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

fn load_grayscale(path: &Path) -> Option<GrayImage> {
    match image::open(path) {
        Ok(img) => Some(img.to_luma8()),
        Err(e) => {
            log::warn!("Skipping unreadable frame {}: {}", path.display(), e);
            None
        }
    }
}

/// Mean absolute pixel difference between two grayscale frames on the
/// 0-255 scale. Dimension mismatches compare over the overlapping region.
fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    if width == 0 || height == 0 {
        return 0.0;
    }
    let mut total: u64 = 0;
    for y in 0..height {
        for x in 0..width {
            let pa = a.get_pixel(x, y).0[0] as i64;
            let pb = b.get_pixel(x, y).0[0] as i64;
            total += pa.abs_diff(pb);
        }
    }
    total as f64 / (width as f64 * height as f64)
}

/// Estimates the duplication rate of a frame store.
///
/// Only frames with an embedded numeric index participate, visited in index
/// order; stray image files without one are ignored entirely. The first
/// frame is always unique, and each later frame counts as unique when its
/// mean grayscale difference against the previous successfully decoded
/// frame exceeds `threshold`. Unreadable frames are skipped outright: they
/// neither count as unique nor replace the comparison anchor.
///
/// Returns `None` (undetermined) for an empty store or when the first frame
/// cannot be decoded.
pub fn detect_duplication_rate(
    store: &FrameStore,
    threshold: f64,
) -> CoreResult<Option<DuplicationRate>> {
    let frames: Vec<PathBuf> = store
        .files_by_index()?
        .into_iter()
        .filter(|p| frame_index(p).is_some())
        .collect();
    if frames.is_empty() {
        log::warn!(
            "Duplication rate undetermined: no frames in {}",
            store.path().display()
        );
        return Ok(None);
    }

    let Some(first) = load_grayscale(&frames[0]) else {
        log::warn!(
            "Duplication rate undetermined: first frame unreadable in {}",
            store.path().display()
        );
        return Ok(None);
    };

    let total = frames.len() as u64;
    let mut unique: u64 = 1;
    let mut anchor = first;

    for frame in &frames[1..] {
        let Some(current) = load_grayscale(frame) else {
            continue;
        };
        let diff = mean_abs_diff(&anchor, &current);
        if diff > threshold {
            unique += 1;
        }
        anchor = current;
    }

    let rate = DuplicationRate::new(total as f64 / unique as f64);
    log::debug!(
        "Duplication rate for {}: {} ({} total / {} unique, threshold {})",
        store.path().display(),
        rate,
        total,
        unique,
        threshold
    );
    Ok(Some(rate))
}
