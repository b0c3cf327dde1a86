//! # vc-pipeline
//!
//! Drives exports of a source video through the external tools.
//!
//! This crate provides:
//!
//! - **[`Compressor`]** -- an immutable driver binding an input file to a
//!   [`vc_core::TransformSpec`], with export, slice, target-size, batch and
//!   fragment operations.
//! - **[`Toolkit`]** -- the shared tools, probe, worker pool and
//!   cancellation token.
//! - **[`partition`]** and **[`solve_target_video_bitrate`]** -- the pure
//!   algorithms behind slicing and target-size compression.
//! - **[`WorkerPool`]** -- bounded parallel execution of tool invocations.
//! - **[`VideoCollection`]** and **[`BatchReport`]** -- the results of
//!   multi-output operations.

pub mod collection;
pub mod compressor;
pub mod context;
pub mod naming;
pub mod partition;
pub mod pool;
pub mod report;
pub mod solver;

// Re-export key types at the crate root.
pub use collection::{Video, VideoCollection};
pub use compressor::Compressor;
pub use context::Toolkit;
pub use naming::{derive_output_path, is_same_location};
pub use partition::{merge_short_tail, partition, Partition};
pub use pool::WorkerPool;
pub use report::{BatchReport, PresetOutcome};
pub use solver::solve_target_video_bitrate;
