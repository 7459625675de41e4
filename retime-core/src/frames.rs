//! Filesystem-backed frame stores.
//!
//! A [`FrameStore`] is a directory of sequentially indexed image files
//! representing one logical sequence of video frames. Every pipeline stage
//! reads one store and writes a new one; stores are never mutated in place
//! once handed downstream, except for the final contiguous renumbering
//! right before reconstruction.

use crate::config::{FRAME_PADDING, ORIGINAL_FRAME_PREFIX};
use crate::error::{empty_store_error, CoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Image extensions recognized as frames.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// The palette file the GIF encode recipe drops into the frame directory.
/// It is an encoding artifact, not a frame, and never counts as one.
pub(crate) const PALETTE_FILE: &str = "palette.png";

static FRAME_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("frame number pattern is valid"));

/// Extracts the embedded frame index from a filename.
///
/// Takes the last run of digits so mixed naming conventions
/// (`frame_0001.png`, `0001_out.png`, `clip2_frame_17.png`) all resolve to
/// the intended index.
pub fn frame_index(path: &Path) -> Option<u64> {
    let name = path.file_stem()?.to_str()?;
    FRAME_NUMBER_RE
        .find_iter(name)
        .last()
        .and_then(|m| m.as_str().parse().ok())
}

fn is_frame_file(path: &Path) -> bool {
    if path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.eq_ignore_ascii_case(PALETTE_FILE))
    {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// A directory of ordered frame image files.
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
}

impl FrameStore {
    /// Wraps an existing directory as a frame store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the backing directory (and parents) if missing.
    pub fn create(dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Frame files in lexical filename order.
    pub fn files(&self) -> CoreResult<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_frame_file(p))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Frame files sorted by embedded numeric index, with lexical order as
    /// the tiebreak. Tolerates mixed naming conventions where lexical order
    /// would interleave (`frame_2` after `frame_10`).
    pub fn files_by_index(&self) -> CoreResult<Vec<PathBuf>> {
        let mut files = self.files()?;
        files.sort_by(|a, b| {
            let ia = frame_index(a).unwrap_or(u64::MAX);
            let ib = frame_index(b).unwrap_or(u64::MAX);
            ia.cmp(&ib).then_with(|| a.file_name().cmp(&b.file_name()))
        });
        Ok(files)
    }

    /// Number of frame files in the store.
    pub fn count(&self) -> CoreResult<u64> {
        Ok(self.files()?.len() as u64)
    }

    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.files()?.is_empty())
    }

    /// Renames all frames, in ascending discovered order, to the contiguous
    /// zero-padded sequence `frame_00000001.png ...` expected by the encode
    /// recipes. Fails on an empty store.
    ///
    /// Returns the frame count.
    pub fn renumber_contiguous(&self) -> CoreResult<u64> {
        let files = self.files()?;
        if files.is_empty() {
            return Err(empty_store_error(&self.dir));
        }

        // Two phases so a new name never collides with a not-yet-renamed
        // old one.
        let mut staged = Vec::with_capacity(files.len());
        for (i, old) in files.iter().enumerate() {
            let tmp = self.dir.join(format!(".renumber_{i}"));
            fs::rename(old, &tmp)?;
            staged.push(tmp);
        }
        for (i, tmp) in staged.iter().enumerate() {
            let new_name = format!("frame_{:0width$}.png", i + 1, width = FRAME_PADDING);
            fs::rename(tmp, self.dir.join(new_name))?;
        }

        log::debug!(
            "Renumbered {} frames in {} to a contiguous sequence",
            files.len(),
            self.dir.display()
        );
        Ok(files.len() as u64)
    }

    /// Reduces the store to exactly `target_count` frames by deleting frames
    /// at indices spread as evenly as possible across the whole sequence,
    /// instead of truncating the tail.
    ///
    /// With `preserve_original` set, frames named with the
    /// [`ORIGINAL_FRAME_PREFIX`] are kept out of the removable set — unless
    /// that set becomes too small to reach the target, in which case every
    /// frame is removable again.
    ///
    /// A store at or below `target_count` is left untouched. Returns the
    /// number of frames removed.
    pub fn spaced_removal(&self, target_count: u64, preserve_original: bool) -> CoreResult<u64> {
        let frames = self.files()?;
        let n = frames.len() as u64;
        if n <= target_count {
            return Ok(0);
        }
        let remove_count = (n - target_count) as usize;

        let removable: Vec<usize> = if preserve_original {
            let removable: Vec<usize> = (0..frames.len())
                .filter(|&i| {
                    !frames[i]
                        .file_name()
                        .and_then(|f| f.to_str())
                        .is_some_and(|f| f.starts_with(ORIGINAL_FRAME_PREFIX))
                })
                .collect();
            if removable.len() < remove_count {
                (0..frames.len()).collect()
            } else {
                removable
            }
        } else {
            (0..frames.len()).collect()
        };

        let step = removable.len() as f64 / remove_count as f64;
        let mut accum = 0.0_f64;
        let mut remove_indices = Vec::with_capacity(remove_count);
        while remove_indices.len() < remove_count {
            let idx = accum as usize;
            if idx >= removable.len() {
                break;
            }
            remove_indices.push(removable[idx]);
            accum += step;
        }
        remove_indices.sort_unstable();
        remove_indices.dedup();
        remove_indices.truncate(remove_count);

        for &i in &remove_indices {
            fs::remove_file(&frames[i])?;
            log::trace!("Removed frame {}", frames[i].display());
        }
        log::debug!(
            "Spaced removal: trimmed {} of {} frames in {} (target {})",
            remove_indices.len(),
            n,
            self.dir.display(),
            target_count
        );
        Ok(remove_indices.len() as u64)
    }

    /// Deletes the backing directory (with contents) and recreates it empty.
    pub fn clear(&self) -> CoreResult<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Copies every frame file into `dst`, preserving names. `dst` is not
    /// cleared first; callers that need a fresh copy clear it themselves.
    pub fn copy_into(&self, dst: &FrameStore) -> CoreResult<u64> {
        fs::create_dir_all(dst.path())?;
        let files = self.files()?;
        for file in &files {
            let name = file.file_name().ok_or_else(|| {
                crate::error::CoreError::PathError(format!(
                    "Frame file without a name: {}",
                    file.display()
                ))
            })?;
            fs::copy(file, dst.path().join(name))?;
        }
        Ok(files.len() as u64)
    }
}
