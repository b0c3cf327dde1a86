//! Pure construction of every tool invocation vcompress issues.
//!
//! [`CommandBuilder`] holds the resolved tool paths and timeouts and turns
//! inputs plus a [`TransformSpec`] into [`ToolCommand`] values. Nothing here
//! spawns a process or touches the filesystem, and the same arguments always
//! produce the same argv.

use std::path::{Path, PathBuf};
use std::time::Duration;

use vc_core::config::{ExecutionConfig, ToolsConfig};
use vc_core::{CodecPreset, Error, Result, StreamKind, TransformSpec};

use crate::command::ToolCommand;
use crate::tools::{ToolRegistry, FFMPEG, FFPROBE, MP4FRAGMENT, MP4INFO};

/// Builds [`ToolCommand`]s against a fixed set of tool paths.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    mp4fragment: Option<PathBuf>,
    mp4info: Option<PathBuf>,
    tool_timeout: Duration,
    probe_timeout: Duration,
    fragment_duration_ms: Option<u32>,
}

impl CommandBuilder {
    /// Create a builder from discovered tools.
    ///
    /// ffmpeg and ffprobe are required; the fragmentation tools are looked up
    /// lazily when a fragment or mp4info command is requested.
    pub fn new(
        registry: &ToolRegistry,
        tools: &ToolsConfig,
        execution: &ExecutionConfig,
    ) -> Result<Self> {
        Ok(Self {
            ffmpeg: registry.require(FFMPEG)?.path.clone(),
            ffprobe: registry.require(FFPROBE)?.path.clone(),
            mp4fragment: registry.path(MP4FRAGMENT).map(Path::to_path_buf),
            mp4info: registry.path(MP4INFO).map(Path::to_path_buf),
            tool_timeout: execution.tool_timeout(),
            probe_timeout: execution.probe_timeout(),
            fragment_duration_ms: tools.fragment_duration_ms.filter(|d| *d > 0),
        })
    }

    /// Whether mp4info metadata queries can be issued.
    pub fn can_inspect_fragments(&self) -> bool {
        self.mp4info.is_some()
    }

    fn ffmpeg(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.timeout(self.tool_timeout);
        cmd.arg("-hide_banner");
        cmd
    }

    fn ffprobe(&self, input: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffprobe.clone());
        cmd.timeout(self.probe_timeout);
        cmd.args(["-v", "error"]);
        cmd.path_arg(input);
        cmd
    }

    // -- ffmpeg ----------------------------------------------------------------

    /// Decode the first second of `input`, discarding the result.
    pub fn integrity_command(&self, input: &Path) -> ToolCommand {
        let mut cmd = self.ffmpeg();
        cmd.timeout(self.probe_timeout);
        cmd.args(["-v", "error", "-i"]);
        cmd.path_arg(input);
        cmd.args(["-t", "1", "-f", "null", "-"]);
        cmd
    }

    /// Run the volumedetect filter over the whole input.
    pub fn volume_probe_command(&self, input: &Path) -> ToolCommand {
        let mut cmd = self.ffmpeg();
        cmd.arg("-i");
        cmd.path_arg(input);
        cmd.args(["-af", "volumedetect", "-f", "null", "-"]);
        cmd
    }

    /// Full-length transform of `input` into `output`.
    pub fn export_command(
        &self,
        input: &Path,
        output: &Path,
        spec: &TransformSpec,
    ) -> Result<ToolCommand> {
        spec.validate()?;
        let mut cmd = self.ffmpeg();
        cmd.args(["-v", "error", "-y", "-i"]);
        cmd.path_arg(input);
        push_transform_args(&mut cmd, spec);
        cmd.path_arg(output);
        Ok(cmd)
    }

    /// Transform the `[start_ms, start_ms + duration_ms)` window of `input`.
    ///
    /// The seek goes before `-i` and the window is re-encoded, which makes
    /// the cut frame-accurate.
    pub fn slice_command(
        &self,
        input: &Path,
        output: &Path,
        spec: &TransformSpec,
        start_ms: u64,
        duration_ms: u64,
    ) -> Result<ToolCommand> {
        spec.validate()?;
        if duration_ms == 0 {
            return Err(Error::Validation("slice duration must be positive".into()));
        }
        let mut cmd = self.ffmpeg();
        cmd.args(["-v", "error", "-y", "-ss"]);
        cmd.arg(format_seconds(start_ms));
        cmd.arg("-i");
        cmd.path_arg(input);
        cmd.arg("-t");
        cmd.arg(format_seconds(duration_ms));
        push_transform_args(&mut cmd, spec);
        cmd.path_arg(output);
        Ok(cmd)
    }

    // -- Bento4 ----------------------------------------------------------------

    /// Rewrite `input` as a fragmented MP4.
    pub fn fragment_command(&self, input: &Path, output: &Path) -> Result<ToolCommand> {
        let program = self
            .mp4fragment
            .clone()
            .ok_or_else(|| Error::missing_tool(MP4FRAGMENT))?;
        let mut cmd = ToolCommand::new(program);
        cmd.timeout(self.tool_timeout);
        if let Some(ms) = self.fragment_duration_ms {
            cmd.arg("--fragment-duration");
            cmd.arg(ms.to_string());
        }
        cmd.path_arg(input);
        cmd.path_arg(output);
        Ok(cmd)
    }

    /// Container description as JSON.
    pub fn mp4info_command(&self, input: &Path) -> Result<ToolCommand> {
        let program = self
            .mp4info
            .clone()
            .ok_or_else(|| Error::missing_tool(MP4INFO))?;
        let mut cmd = ToolCommand::new(program);
        cmd.timeout(self.probe_timeout);
        cmd.args(["--format", "json"]);
        cmd.path_arg(input);
        Ok(cmd)
    }

    // -- ffprobe ---------------------------------------------------------------

    /// First video stream's size as `WIDTHxHEIGHT`.
    pub fn resolution_command(&self, input: &Path) -> ToolCommand {
        let mut cmd = self.ffprobe(input);
        cmd.args([
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ]);
        cmd
    }

    /// Bit rate of the first stream of `kind`, in bits per second.
    pub fn stream_bitrate_command(&self, input: &Path, kind: StreamKind) -> ToolCommand {
        let mut cmd = self.ffprobe(input);
        cmd.args(["-select_streams", kind.first_stream_specifier()]);
        cmd.args(["-show_entries", "stream=bit_rate"]);
        cmd.args(["-of", "default=noprint_wrappers=1:nokey=1"]);
        cmd
    }

    /// Container duration in seconds.
    pub fn duration_command(&self, input: &Path) -> ToolCommand {
        let mut cmd = self.ffprobe(input);
        cmd.args(["-show_entries", "format=duration"]);
        cmd.args(["-of", "default=noprint_wrappers=1:nokey=1"]);
        cmd
    }

    /// First video stream's `r_frame_rate` as `num/den`.
    pub fn frame_rate_command(&self, input: &Path) -> ToolCommand {
        let mut cmd = self.ffprobe(input);
        cmd.args(["-select_streams", "v:0"]);
        cmd.args(["-show_entries", "stream=r_frame_rate"]);
        cmd.args(["-of", "default=noprint_wrappers=1:nokey=1"]);
        cmd
    }
}

/// Filters, encoder, rate control and audio handling, in that order.
fn push_transform_args(cmd: &mut ToolCommand, spec: &TransformSpec) {
    if let Some(chain) = spec.filter_chain() {
        cmd.arg("-vf");
        cmd.arg(chain);
    }

    if spec.codec_preset() == CodecPreset::H264WebVbr {
        cmd.args(["-c:v", "libx264", "-crf"]);
        cmd.arg(spec.quality().crf().to_string());
        cmd.args([
            "-preset",
            "medium",
            "-profile:v",
            "main",
            "-level:v",
            "3.1",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
    }

    if let Some(bitrate) = spec.bitrate() {
        cmd.arg("-b:v");
        cmd.arg(bitrate.to_string());
        cmd.arg("-maxrate");
        cmd.arg(bitrate.to_string());
        cmd.arg("-bufsize");
        cmd.arg(bitrate.buffer_size());
    }

    if spec.mute() {
        cmd.arg("-an");
    }
}

/// Milliseconds as seconds with millisecond precision (`1500` -> `"1.500"`).
fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}
