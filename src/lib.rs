//! vcompress - batch video transformation through ffmpeg.
//!
//! This crate ties the workspace together: it re-exports the public types of
//! the `vc-*` crates, wires a [`Toolkit`] from a JSON [`Config`], and sets up
//! logging.
//!
//! ```no_run
//! use std::path::Path;
//!
//! # async fn example() -> vcompress::Result<()> {
//! vcompress::logging::init("vcompress=info")?;
//! let toolkit = vcompress::toolkit(None)?;
//! let video = vcompress::Compressor::open(toolkit, "sample.mp4").await?;
//!
//! video.scale(640, -1).mute(true).export(Path::new("out/sample.mp4")).await?;
//! let report = video
//!     .export_collection(Path::new("out/sample.mp4"), &vcompress::web_ladder())
//!     .await;
//! assert!(report.all_succeeded());
//! # Ok(())
//! # }
//! ```

pub mod logging;

use std::path::Path;
use std::sync::Arc;

pub use vc_av::{
    CommandBuilder, MediaTool, ProbeFacade, ProcessTool, ToolCommand, ToolOutput, ToolRegistry,
    VideoMetrics,
};
pub use vc_core::config::{Config, ExecutionConfig, ToolsConfig};
pub use vc_core::{
    web_ladder, Bitrate, CodecPreset, Crop, Error, PresetOverlay, Quality, Resolution, Result,
    Scale, StreamKind, TransformSpec,
};
pub use vc_pipeline::{
    partition, solve_target_video_bitrate, BatchReport, Compressor, Partition, PresetOutcome,
    Toolkit, Video, VideoCollection, WorkerPool,
};

/// Load configuration from `config_path` (defaults when `None` or missing)
/// and discover the external tools.
///
/// # Errors
///
/// [`Error::MissingTool`] if ffmpeg or ffprobe cannot be found.
pub fn toolkit(config_path: Option<&Path>) -> Result<Arc<Toolkit>> {
    let config = Config::load_or_default(config_path);
    Toolkit::new(config)
}

/// Availability of every external tool vcompress can use.
pub fn check_tools(config: &Config) -> Vec<vc_av::ToolInfo> {
    ToolRegistry::discover(&config.tools).check_all()
}
