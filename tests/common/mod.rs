//! Shared helpers for integration tests.
//!
//! Provides [`ScriptedTool`], a [`MediaTool`] answering from a rule table,
//! plus helpers for the end-to-end tests that need a real ffmpeg.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vcompress::{Config, Error, MediaTool, Result, ToolCommand, ToolOutput, ToolRegistry, Toolkit};

// ---------------------------------------------------------------------------
// ScriptedTool
// ---------------------------------------------------------------------------

/// One canned answer: used when every needle occurs in the command line.
pub struct Rule {
    needles: Vec<String>,
    output: ToolOutput,
}

/// A [`MediaTool`] that answers from a rule table and records every call.
///
/// The first matching rule wins. Commands no rule matches succeed with
/// empty output. Producing commands (ffmpeg writing a file, mp4fragment)
/// create their last argument on disk before answering.
#[derive(Default)]
pub struct ScriptedTool {
    rules: Vec<Rule>,
    calls: Mutex<Vec<ToolCommand>>,
    delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing every needle with `stdout`.
    pub fn on(mut self, needles: &[&str], stdout: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            output: ToolOutput {
                status: Some(0),
                stdout: stdout.into(),
                stderr: String::new(),
            },
        });
        self
    }

    /// Fail commands containing every needle with `stderr`.
    pub fn fail(mut self, needles: &[&str], status: i32, stderr: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            output: ToolOutput {
                status: Some(status),
                stdout: String::new(),
                stderr: stderr.into(),
            },
        });
        self
    }

    /// Answer commands containing every needle with `stderr` and success.
    pub fn diag(mut self, needles: &[&str], stderr: &str) -> Self {
        self.rules.push(Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            output: ToolOutput {
                status: Some(0),
                stdout: String::new(),
                stderr: stderr.into(),
            },
        });
        self
    }

    /// Sleep this long in every producing command.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(ToolCommand::command_line)
            .collect()
    }

    /// Highest number of producing commands seen running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn produces_file(cmd: &ToolCommand) -> Option<&str> {
    let last = cmd.argv().last()?;
    match cmd.tool_name().as_str() {
        "ffmpeg" if last != "-" => Some(last.as_str()),
        "mp4fragment" => Some(last.as_str()),
        _ => None,
    }
}

#[async_trait]
impl MediaTool for ScriptedTool {
    async fn run(&self, cmd: &ToolCommand, cancel: &CancellationToken) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(cmd.clone());
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                tool: cmd.tool_name(),
            });
        }

        if let Some(target) = produces_file(cmd) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::fs::write(target, b"video")?;
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
        }

        let line = cmd.command_line();
        let answer = self
            .rules
            .iter()
            .find(|r| r.needles.iter().all(|n| line.contains(n.as_str())))
            .map(|r| r.output.clone())
            .unwrap_or(ToolOutput {
                status: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            });
        Ok(answer)
    }
}

/// A toolkit over `tool` with fake ffmpeg/ffprobe/mp4fragment/mp4info paths.
pub fn fake_toolkit(tool: Arc<ScriptedTool>, config: Config) -> Arc<Toolkit> {
    let registry = ToolRegistry::default()
        .with_tool("ffmpeg", "/fake/bin/ffmpeg")
        .with_tool("ffprobe", "/fake/bin/ffprobe")
        .with_tool("mp4fragment", "/fake/bin/mp4fragment")
        .with_tool("mp4info", "/fake/bin/mp4info");
    Toolkit::with_tool(config, registry, tool).expect("fake toolkit")
}

/// Probe answers describing the reference sample: 960x540, 30 fps, with
/// audio, 4.871533 s.
pub fn sample_metrics(tool: ScriptedTool) -> ScriptedTool {
    tool.on(&["stream=width,height"], "960x540\n")
        .on(&["v:0", "stream=bit_rate"], "2200634\n")
        .on(&["a:0", "stream=bit_rate"], "133274\n")
        .on(&["sample.mp4", "format=duration"], "4.871533\n")
        .on(&["r_frame_rate"], "30/1\n")
        .diag(&["volumedetect"], "[Parsed_volumedetect_0 @ 0x1] mean_volume: -20.6 dB\n")
        .on(&["mp4info"], r#"{"movie": {"fragments": false}}"#)
}

/// Write a placeholder input file named `name` into `dir`.
pub fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"source").unwrap();
    path
}

// ---------------------------------------------------------------------------
// Real ffmpeg
// ---------------------------------------------------------------------------

/// Whether ffmpeg and ffprobe are installed.
pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok() && which::which("ffprobe").is_ok()
}

/// Generate a 960x540, 30 fps, ~5 s test pattern with a sine tone.
pub fn generate_sample(dir: &Path) -> PathBuf {
    let path = dir.join("sample.mp4");
    let status = std::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-v", "error", "-y"])
        .args(["-f", "lavfi", "-i", "testsrc=size=960x540:rate=30:duration=5"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=5"])
        .args(["-pix_fmt", "yuv420p", "-shortest"])
        .arg(&path)
        .status()
        .expect("failed to run ffmpeg");
    assert!(status.success(), "sample generation failed");
    path
}
