//! Core library for frame-interpolation based video retiming.
//!
//! This crate decides *how many* frames must exist at each stage of a
//! retiming job and *which* external invocation pattern achieves that,
//! then manages the filesystem state around those invocations: frame
//! extraction, duplicate detection and removal, frame-count restoration,
//! interpolation to a requested fps multiplier, and final reassembly. The
//! interpolation and upscaling algorithms themselves live in external
//! executors (rife-ncnn-vulkan, realsr/waifu2x, ffmpeg).
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use retime_core::{CoreConfig, InterpolationJob, run_interpolation_job};
//! use retime_core::interpolation::{Engine, InterpolationParams, RifeInterpolator};
//! use retime_core::external::{CrateFfprobeExecutor, SidecarSpawner};
//! use std::path::PathBuf;
//!
//! let config = CoreConfig::builder()
//!     .temp_root(PathBuf::from("/tmp/retime"))
//!     .build();
//! let job = InterpolationJob {
//!     input: PathBuf::from("clip.mp4"),
//!     output: PathBuf::from("clip_2x.mp4"),
//!     engine: Engine::from_model("rife-v4.6"),
//!     fps_factor: 2.0,
//!     remove_duplicates: true,
//!     preserve_original_frames: false,
//!     params: InterpolationParams::default(),
//!     output_format: None,
//! };
//! let interpolator = RifeInterpolator::new(&config.rife_path);
//! let written = run_interpolation_job(
//!     &config,
//!     &job,
//!     &SidecarSpawner,
//!     &CrateFfprobeExecutor::new(),
//!     &interpolator,
//! ).unwrap();
//! println!("wrote {}", written.display());
//! ```

pub mod config;
pub mod dedup;
pub mod detection;
pub mod error;
pub mod external;
pub mod frames;
pub mod interpolation;
pub mod pipeline;
pub mod reconstruct;
pub mod upscale;
pub mod util;

// Re-exports for the public API
pub use config::{CoreConfig, CoreConfigBuilder};
pub use detection::{detect_duplication_rate, DuplicationRate};
pub use error::{CoreError, CoreResult};
pub use frames::FrameStore;
pub use interpolation::{Engine, EngineCapability, FrameInterpolator, InterpolationParams};
pub use pipeline::{run_interpolation_job, InterpolationJob, Stage};
pub use reconstruct::{unique_output_path, OutputFormat};
pub use upscale::{run_upscale_job, NcnnUpscaler, UpscaleJob, UpscaleModel, Upscaler};
