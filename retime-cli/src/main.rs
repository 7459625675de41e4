// retime-cli/src/main.rs
//
// Command-line interface for the retime video retiming pipeline.
// Parses arguments, sets up logging, assembles the core configuration and
// job description, and invokes retime-core. Exit code reflects job outcome.

use clap::{Parser, Subcommand};
use log::{error, info};
use retime_core::external::{check_dependency, CrateFfprobeExecutor, SidecarSpawner};
use retime_core::interpolation::{Engine, InterpolationParams, RifeInterpolator};
use retime_core::{
    run_interpolation_job, run_upscale_job, CoreConfig, CoreResult, InterpolationJob,
    NcnnUpscaler, OutputFormat, UpscaleJob, UpscaleModel,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Retime: video frame interpolation and upscaling",
    long_about = "Changes a video's apparent frame rate with RIFE interpolation, \
                  optionally removing duplicated source frames first, or upscales \
                  it with realsr/waifu2x. External tools do the pixel work; retime \
                  does the frame accounting."
)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interpolates a video to a higher apparent frame rate
    Interpolate(InterpolateArgs),
    /// Upscales a video with a super-resolution model
    Upscale(UpscaleArgs),
}

#[derive(Parser, Debug)]
struct InterpolateArgs {
    /// Path to the input video
    #[arg(required = true, value_name = "INPUT_VIDEO")]
    input_video: PathBuf,

    /// Path for the output video
    #[arg(required = true, value_name = "OUTPUT_VIDEO")]
    output_video: PathBuf,

    /// RIFE model name/folder (rife-v4 and rife-v4.6 support explicit
    /// target counts; older models are driven by doubling passes)
    #[arg(long, default_value = "rife-v4.6")]
    model: String,

    /// How many times to increase the final FPS (may be non-integer)
    #[arg(long, default_value_t = 2.0, value_name = "FACTOR")]
    fps_factor: f64,

    /// Detect and remove duplicated source frames first
    #[arg(long)]
    remove_duplicates: bool,

    /// Grayscale difference threshold for duplicate detection (0-255)
    #[arg(long, value_name = "THRESHOLD")]
    threshold: Option<f64>,

    /// Bias frame trimming away from source frames
    #[arg(long)]
    preserve_original_frames: bool,

    /// Root directory for the job's temporary frame folders
    #[arg(long, default_value = "temp_interpolation", value_name = "DIR")]
    temp_dir: PathBuf,

    /// Path to the rife-ncnn-vulkan executable
    #[arg(long, default_value = "rife-ncnn-vulkan", value_name = "PATH")]
    rife_path: PathBuf,

    /// RIFE time step (v4.x only)
    #[arg(long, value_name = "STEP")]
    time_step: Option<f64>,

    /// GPU device index for rife-ncnn-vulkan
    #[arg(long, value_name = "ID")]
    gpu_id: Option<u32>,

    /// Thread configuration (e.g. "4:4:4")
    #[arg(long, value_name = "THREADS")]
    thread_config: Option<String>,

    /// Enable test-time augmentation
    #[arg(long)]
    tta: bool,

    /// Enable temporal test-time augmentation
    #[arg(long)]
    temporal_tta: bool,

    /// Enable UHD mode
    #[arg(long)]
    uhd: bool,

    /// Output pattern format passed through to rife-ncnn-vulkan
    #[arg(long, value_name = "FORMAT")]
    pattern_format: Option<String>,

    /// Output format (defaults to the output path's extension)
    #[arg(long, value_parser = parse_output_format, value_name = "mp4|gif")]
    output_format: Option<OutputFormat>,
}

#[derive(Parser, Debug)]
struct UpscaleArgs {
    /// Path to the input video
    #[arg(required = true, value_name = "INPUT_VIDEO")]
    input_video: PathBuf,

    /// Path for the upscaled video
    #[arg(required = true, value_name = "OUTPUT_VIDEO")]
    output_video: PathBuf,

    /// Upscaling model
    #[arg(long, default_value = "realsr", value_parser = parse_upscale_model)]
    model: UpscaleModel,

    /// Scale factor for the model
    #[arg(long, default_value_t = 2)]
    scale: u32,

    /// GPU device index for the ncnn executable
    #[arg(long, value_name = "ID")]
    gpu: Option<u32>,

    /// Root directory for the job's temporary frame folders
    #[arg(long, default_value = "temp_upscale", value_name = "DIR")]
    temp_dir: PathBuf,

    /// Output format (defaults to the output path's extension)
    #[arg(long, value_parser = parse_output_format, value_name = "mp4|gif")]
    output_format: Option<OutputFormat>,
}

fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_ascii_lowercase().as_str() {
        "gif" => Ok(OutputFormat::Gif),
        "mp4" | "video" => Ok(OutputFormat::Video),
        other => Err(format!("unknown output format '{other}' (expected mp4 or gif)")),
    }
}

fn parse_upscale_model(s: &str) -> Result<UpscaleModel, String> {
    match s.to_ascii_lowercase().as_str() {
        "realsr" => Ok(UpscaleModel::RealSr),
        "waifu2x" => Ok(UpscaleModel::Waifu2x),
        other => Err(format!("unknown model '{other}' (expected realsr or waifu2x)")),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run_interpolate(args: InterpolateArgs) -> CoreResult<PathBuf> {
    info!(
        "Interpolating {} with model {} (fps factor {})",
        args.input_video.display(),
        args.model,
        args.fps_factor
    );
    check_dependency("ffmpeg")?;
    check_dependency("ffprobe")?;

    let mut builder = CoreConfig::builder()
        .temp_root(args.temp_dir)
        .rife_path(args.rife_path);
    if let Some(threshold) = args.threshold {
        builder = builder.diff_threshold(threshold);
    }
    let config = builder.build();

    let job = InterpolationJob {
        input: args.input_video,
        output: args.output_video,
        engine: Engine::from_model(&args.model),
        fps_factor: args.fps_factor,
        remove_duplicates: args.remove_duplicates,
        preserve_original_frames: args.preserve_original_frames,
        params: InterpolationParams {
            time_step: args.time_step,
            gpu_id: args.gpu_id,
            thread_config: args.thread_config,
            tta: args.tta,
            temporal_tta: args.temporal_tta,
            uhd: args.uhd,
            pattern_format: args.pattern_format,
        },
        output_format: args.output_format,
    };

    let interpolator = RifeInterpolator::new(&config.rife_path);
    run_interpolation_job(
        &config,
        &job,
        &SidecarSpawner,
        &CrateFfprobeExecutor::new(),
        &interpolator,
    )
}

fn run_upscale(args: UpscaleArgs) -> CoreResult<PathBuf> {
    info!(
        "Upscaling {} with {} (scale {})",
        args.input_video.display(),
        args.model.executable_name(),
        args.scale
    );
    check_dependency("ffmpeg")?;
    check_dependency("ffprobe")?;

    let config = CoreConfig::builder().temp_root(args.temp_dir).build();

    let job = UpscaleJob {
        input: args.input_video,
        output: args.output_video,
        output_format: args.output_format,
    };

    let upscaler = NcnnUpscaler::new(args.model, args.scale, args.gpu);
    run_upscale_job(
        &config,
        &job,
        &SidecarSpawner,
        &CrateFfprobeExecutor::new(),
        &upscaler,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interpolate_defaults() {
        let cli = Cli::parse_from(["retime", "interpolate", "in.mp4", "out.mp4"]);
        assert!(!cli.verbose);
        match cli.command {
            Commands::Interpolate(args) => {
                assert_eq!(args.input_video, PathBuf::from("in.mp4"));
                assert_eq!(args.output_video, PathBuf::from("out.mp4"));
                assert_eq!(args.model, "rife-v4.6");
                assert_eq!(args.fps_factor, 2.0);
                assert!(!args.remove_duplicates);
                assert!(args.threshold.is_none());
                assert_eq!(args.temp_dir, PathBuf::from("temp_interpolation"));
                assert!(args.output_format.is_none());
            }
            _ => panic!("Expected Interpolate command"),
        }
    }

    #[test]
    fn parses_interpolate_flags() {
        let cli = Cli::parse_from([
            "retime",
            "-v",
            "interpolate",
            "in.mp4",
            "out.gif",
            "--model",
            "rife-v2.3",
            "--fps-factor",
            "2.5",
            "--remove-duplicates",
            "--threshold",
            "8",
            "--output-format",
            "gif",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Interpolate(args) => {
                assert_eq!(args.model, "rife-v2.3");
                assert_eq!(args.fps_factor, 2.5);
                assert!(args.remove_duplicates);
                assert_eq!(args.threshold, Some(8.0));
                assert_eq!(args.output_format, Some(OutputFormat::Gif));
            }
            _ => panic!("Expected Interpolate command"),
        }
    }

    #[test]
    fn parses_upscale_args() {
        let cli = Cli::parse_from([
            "retime", "upscale", "in.mp4", "out.mp4", "--model", "waifu2x", "--scale", "4",
        ]);
        match cli.command {
            Commands::Upscale(args) => {
                assert_eq!(args.model, UpscaleModel::Waifu2x);
                assert_eq!(args.scale, 4);
            }
            _ => panic!("Expected Upscale command"),
        }
    }

    #[test]
    fn rejects_unknown_output_format() {
        let result = Cli::try_parse_from([
            "retime",
            "interpolate",
            "a.mp4",
            "b.mp4",
            "--output-format",
            "webm",
        ]);
        assert!(result.is_err());
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Interpolate(args) => run_interpolate(args),
        Commands::Upscale(args) => run_upscale(args),
    };

    match result {
        Ok(path) => {
            println!("Done! Output video: {}", path.display());
        }
        Err(e) => {
            error!("Job failed: {e}");
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
