//! Metadata queries against source and output media.
//!
//! [`ProbeFacade`] is the only place that interprets tool diagnostics. It
//! runs the probe commands from [`CommandBuilder`] through a [`MediaTool`]
//! and turns their text output into typed values. Metrics are computed on
//! demand and never cached, so they always describe the file as it is now.

pub mod ffprobe;
pub mod mp4info;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use vc_core::{Error, Resolution, Result, StreamKind};

use crate::builder::CommandBuilder;
use crate::command::{run_checked, MediaTool};

/// Measured properties of one media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub resolution: Resolution,
    /// 0 when the container does not report a video bit rate.
    pub video_bitrate_bps: u64,
    /// 0 when there is no audio stream or no reported bit rate.
    pub audio_bitrate_bps: u64,
    pub duration_us: u64,
    pub size_bytes: u64,
    pub fps: u32,
    pub has_audio: bool,
    /// `None` when mp4info is not installed or could not read the file.
    pub fragmented: Option<bool>,
}

impl VideoMetrics {
    pub fn duration_secs(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }
}

/// Typed metadata queries over a [`MediaTool`].
#[derive(Clone)]
pub struct ProbeFacade {
    tool: Arc<dyn MediaTool>,
    commands: Arc<CommandBuilder>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ProbeFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeFacade")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl ProbeFacade {
    pub fn new(
        tool: Arc<dyn MediaTool>,
        commands: Arc<CommandBuilder>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tool,
            commands,
            cancel,
        }
    }

    /// Decode the start of `input` and reject it if it cannot be read.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] when ffmpeg reports a missing file or a
    ///   container/codec it cannot open.
    /// - [`Error::ToolExecution`] for any other non-zero exit.
    pub async fn check_integrity(&self, input: &Path) -> Result<()> {
        let cmd = self.commands.integrity_command(input);
        let output = self.tool.run(&cmd, &self.cancel).await?;

        if let Some(marker) = ffprobe::invalid_input_marker(&output.stderr) {
            tracing::info!("Rejected {}: {marker}", input.display());
            return Err(Error::invalid_input(input, marker));
        }
        output.check(&cmd)?;
        Ok(())
    }

    /// Whether `input` carries an audio stream with samples.
    pub async fn has_audio(&self, input: &Path) -> Result<bool> {
        let cmd = self.commands.volume_probe_command(input);
        let output = self.tool.run(&cmd, &self.cancel).await?;
        if !output.success() {
            // ffmpeg exits non-zero when the audio filter has no stream to
            // attach to; the marker check below still decides.
            tracing::debug!("volume probe {}", output.status_description());
        }
        Ok(ffprobe::reports_audio(&output.stderr))
    }

    pub async fn resolution(&self, input: &Path) -> Result<Resolution> {
        let cmd = self.commands.resolution_command(input);
        let output = run_checked(self.tool.as_ref(), &cmd, &self.cancel).await?;
        ffprobe::parse_resolution(&output.stdout)
    }

    async fn stream_bitrate(&self, input: &Path, kind: StreamKind) -> Result<u64> {
        let cmd = self.commands.stream_bitrate_command(input, kind);
        let output = run_checked(self.tool.as_ref(), &cmd, &self.cancel).await?;
        ffprobe::parse_bitrate(&format!("{kind}_bitrate"), &output.stdout)
    }

    pub async fn video_bitrate_bps(&self, input: &Path) -> Result<u64> {
        self.stream_bitrate(input, StreamKind::Video).await
    }

    pub async fn audio_bitrate_bps(&self, input: &Path) -> Result<u64> {
        self.stream_bitrate(input, StreamKind::Audio).await
    }

    pub async fn duration_us(&self, input: &Path) -> Result<u64> {
        let cmd = self.commands.duration_command(input);
        let output = run_checked(self.tool.as_ref(), &cmd, &self.cancel).await?;
        ffprobe::parse_duration_us(&output.stdout)
    }

    pub async fn size_bytes(&self, input: &Path) -> Result<u64> {
        Ok(tokio::fs::metadata(input).await?.len())
    }

    pub async fn fps(&self, input: &Path) -> Result<u32> {
        let cmd = self.commands.frame_rate_command(input);
        let output = run_checked(self.tool.as_ref(), &cmd, &self.cancel).await?;
        ffprobe::parse_fps(&output.stdout)
    }

    /// Whether `input` is a fragmented MP4; `None` without mp4info.
    pub async fn fragmented(&self, input: &Path) -> Result<Option<bool>> {
        if !self.commands.can_inspect_fragments() {
            return Ok(None);
        }
        let cmd = self.commands.mp4info_command(input)?;
        let output = run_checked(self.tool.as_ref(), &cmd, &self.cancel).await?;
        mp4info::parse_fragmented(&output.stdout).map(Some)
    }

    /// All metrics of `input`, queried concurrently.
    ///
    /// A failing fragmentation query degrades to `fragmented: None` since
    /// non-MP4 containers cannot be inspected; every other failure is
    /// returned.
    pub async fn metrics(&self, input: &Path) -> Result<VideoMetrics> {
        let fragmented = async {
            match self.fragmented(input).await {
                Err(Error::Cancelled { tool }) => Err(Error::Cancelled { tool }),
                Err(e) => {
                    tracing::debug!("Fragmentation query failed for {}: {e}", input.display());
                    Ok(None)
                }
                ok => ok,
            }
        };

        let (
            resolution,
            video_bitrate_bps,
            audio_bitrate_bps,
            duration_us,
            size_bytes,
            fps,
            has_audio,
            fragmented,
        ) = tokio::try_join!(
            self.resolution(input),
            self.video_bitrate_bps(input),
            self.audio_bitrate_bps(input),
            self.duration_us(input),
            self.size_bytes(input),
            self.fps(input),
            self.has_audio(input),
            fragmented,
        )?;

        Ok(VideoMetrics {
            resolution,
            video_bitrate_bps,
            audio_bitrate_bps,
            duration_us,
            size_bytes,
            fps,
            has_audio,
            fragmented,
        })
    }
}
