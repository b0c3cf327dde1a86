//! # vc-av
//!
//! External tool management for vcompress.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg,
//!   ffprobe, mp4fragment and mp4info.
//! - **Command execution** ([`ToolCommand`], [`MediaTool`], [`ProcessTool`])
//!   -- argv values with a timeout, run as async child processes that are
//!   killed on cancellation or timeout.
//! - **Command building** ([`CommandBuilder`]) -- pure functions turning a
//!   [`vc_core::TransformSpec`] into a deterministic ffmpeg invocation.
//! - **Probing** ([`ProbeFacade`]) -- integrity checks and metric queries,
//!   keeping all diagnostic-text scraping in one place.

pub mod builder;
pub mod command;
pub mod probe;
pub mod tools;

// ---- Re-exports for convenience ----

pub use builder::CommandBuilder;
pub use command::{run_checked, MediaTool, ProcessTool, ToolCommand, ToolOutput};
pub use probe::{ProbeFacade, VideoMetrics};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
