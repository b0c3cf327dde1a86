//! Unified error type for vcompress.
//!
//! All crates funnel their failures into [`Error`]. Tool execution failures
//! carry the full command line, the exit status and an excerpt of the
//! diagnostic stream so an artifact failure can be reproduced by hand.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum number of trailing stderr lines kept in a [`Error::ToolExecution`].
const STDERR_EXCERPT_LINES: usize = 12;

/// Unified error type covering all failure modes in vcompress.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external binary could not be resolved.
    #[error("Missing tool: {tool} not found; is it installed and in PATH?")]
    MissingTool {
        /// Name of the binary (e.g. "ffmpeg").
        tool: String,
    },

    /// The source media is corrupt or does not exist.
    #[error("Invalid input {}: {reason}", path.display())]
    InvalidInput {
        /// Path of the rejected input.
        path: PathBuf,
        /// Marker or reason reported by the integrity probe.
        reason: String,
    },

    /// Probe output could not be parsed into the expected shape.
    #[error("Probe parse error [{query}]: unexpected output {output:?}")]
    ProbeParse {
        /// Which query produced the output (e.g. "duration").
        query: String,
        /// The raw output that failed to parse.
        output: String,
    },

    /// The target-size solver produced a non-positive video bitrate.
    #[error(
        "Infeasible target: {target_bits} bits over {duration_secs:.3}s leaves no room \
         for video next to {audio_bitrate_bps} bps of audio"
    )]
    InfeasibleTarget {
        /// Requested output size in bits.
        target_bits: u64,
        /// Measured source duration in seconds.
        duration_secs: f64,
        /// Measured audio bitrate in bits per second.
        audio_bitrate_bps: u64,
    },

    /// An external tool exited unsuccessfully.
    #[error("Tool error [{tool}]: exited with {status}: {stderr}\n  command: {command}")]
    ToolExecution {
        /// Name of the tool that failed.
        tool: String,
        /// Full command line, suitable for re-running by hand.
        command: String,
        /// Exit status description.
        status: String,
        /// Trailing excerpt of the diagnostic stream.
        stderr: String,
    },

    /// An external tool did not finish within its timeout and was killed.
    #[error("Tool error [{tool}]: timed out after {after:?}")]
    Timeout {
        /// Name of the tool that was killed.
        tool: String,
        /// The timeout that expired.
        after: Duration,
    },

    /// The invocation was aborted through its cancellation token.
    #[error("Cancelled: {tool} was aborted")]
    Cancelled {
        /// Name of the tool that was killed.
        tool: String,
    },

    /// A transform or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::MissingTool`].
    pub fn missing_tool(tool: impl Into<String>) -> Self {
        Error::MissingTool { tool: tool.into() }
    }

    /// Convenience constructor for [`Error::InvalidInput`].
    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`Error::ProbeParse`].
    pub fn probe_parse(query: impl Into<String>, output: impl Into<String>) -> Self {
        Error::ProbeParse {
            query: query.into(),
            output: output.into(),
        }
    }

    /// Convenience constructor for [`Error::ToolExecution`].
    ///
    /// Only the last few lines of `stderr` are kept.
    pub fn tool_execution(
        tool: impl Into<String>,
        command: impl Into<String>,
        status: impl Into<String>,
        stderr: &str,
    ) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            command: command.into(),
            status: status.into(),
            stderr: stderr_excerpt(stderr),
        }
    }

    /// Whether a batch run may carry on with sibling artifacts after this
    /// error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ToolExecution { .. }
                | Error::Timeout { .. }
                | Error::InfeasibleTarget { .. }
                | Error::Validation(_)
                | Error::Io { .. }
        )
    }
}

/// Keep the trailing lines of a diagnostic stream.
fn stderr_excerpt(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_EXCERPT_LINES);
    lines[start..].join("\n")
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
