//! External tool invocations: the [`ToolCommand`] value, the [`MediaTool`]
//! execution seam and the process-backed [`ProcessTool`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use vc_core::{Error, Result};

/// Default command timeout: 1 hour.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// ToolOutput
// ---------------------------------------------------------------------------

/// Output captured from a tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Human-readable exit status.
    pub fn status_description(&self) -> String {
        match self.status {
            Some(code) => format!("exit status: {code}"),
            None => "terminated by signal".to_string(),
        }
    }

    /// Turn a non-zero exit into [`Error::ToolExecution`].
    pub fn check(self, cmd: &ToolCommand) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::tool_execution(
                cmd.tool_name(),
                cmd.command_line(),
                self.status_description(),
                &self.stderr,
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// ToolCommand
// ---------------------------------------------------------------------------

/// A fully built external tool invocation: program, argv and timeout.
///
/// Commands are plain values. Building one never touches the filesystem and
/// the same inputs always produce the same argv.
///
/// # Example
///
/// ```
/// use vc_av::ToolCommand;
/// use std::path::PathBuf;
///
/// let mut cmd = ToolCommand::new(PathBuf::from("/usr/bin/ffprobe"));
/// cmd.args(["-v", "error", "-show_format"]).arg("in.mp4");
/// assert_eq!(cmd.command_line(), "/usr/bin/ffprobe -v error -show_format in.mp4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(&mut self, path: &Path) -> &mut Self {
        self.arg(path.to_string_lossy().as_ref())
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The argument vector, without the program.
    pub fn argv(&self) -> &[String] {
        &self.args
    }

    pub fn time_limit(&self) -> Duration {
        self.timeout
    }

    /// Short tool name (the program's file name).
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Full command line with shell-style quoting, for logs and errors.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .map(|a| shell_quote(&a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ---------------------------------------------------------------------------
// MediaTool
// ---------------------------------------------------------------------------

/// Capability to run a [`ToolCommand`].
///
/// A non-zero exit is not an error at this layer: callers inspect
/// [`ToolOutput::status`] and the diagnostic stream themselves (or use
/// [`ToolOutput::check`]). Implementations must honour `cancel` and the
/// command's timeout.
#[async_trait]
pub trait MediaTool: Send + Sync {
    async fn run(&self, cmd: &ToolCommand, cancel: &CancellationToken) -> Result<ToolOutput>;
}

/// Run `cmd` and fail with [`Error::ToolExecution`] on a non-zero exit.
pub async fn run_checked(
    tool: &dyn MediaTool,
    cmd: &ToolCommand,
    cancel: &CancellationToken,
) -> Result<ToolOutput> {
    tool.run(cmd, cancel).await?.check(cmd)
}

/// [`MediaTool`] that spawns real child processes through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTool;

#[async_trait]
impl MediaTool for ProcessTool {
    async fn run(&self, cmd: &ToolCommand, cancel: &CancellationToken) -> Result<ToolOutput> {
        let tool = cmd.tool_name();
        if cancel.is_cancelled() {
            return Err(Error::Cancelled { tool });
        }

        tracing::debug!(command = %cmd.command_line(), "running {tool}");

        let child = Command::new(cmd.program())
            .args(cmd.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::missing_tool(&tool),
                _ => Error::tool_execution(
                    &tool,
                    cmd.command_line(),
                    "failed to spawn",
                    &e.to_string(),
                ),
            })?;

        // Dropping the wait future drops the child, which kills it.
        let wait = tokio::time::timeout(cmd.time_limit(), child.wait_with_output());
        let output = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("{tool} cancelled");
                return Err(Error::Cancelled { tool });
            }
            res = wait => match res {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => return Err(Error::from(e)),
                Err(_elapsed) => {
                    tracing::warn!("{tool} timed out after {:?}", cmd.time_limit());
                    return Err(Error::Timeout { tool, after: cmd.time_limit() });
                }
            },
        };

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
