//! The [`Compressor`]: an immutable driver binding one input file to a
//! [`TransformSpec`] and the shared [`Toolkit`].
//!
//! Transitions (`mute`, `scale`, ...) return a new compressor and never
//! change the receiver. Terminal operations (`export`, `slice`, ...) build
//! commands through the toolkit's [`CommandBuilder`](vc_av::CommandBuilder)
//! and run them through its worker pool. A failed or cancelled invocation
//! never leaves a partial output file behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vc_av::{run_checked, ToolCommand, VideoMetrics};
use vc_core::{Bitrate, CodecPreset, Error, PresetOverlay, Quality, Result, TransformSpec};

use crate::collection::VideoCollection;
use crate::context::Toolkit;
use crate::naming::{derive_output_path, is_same_location};
use crate::partition::{merge_short_tail, partition};
use crate::report::{BatchReport, PresetOutcome};
use crate::solver::solve_target_video_bitrate;

/// Drives exports of one input file.
#[derive(Debug, Clone)]
pub struct Compressor {
    toolkit: Arc<Toolkit>,
    input: PathBuf,
    spec: TransformSpec,
}

impl Compressor {
    /// Bind `input` to `toolkit` after checking that it can be decoded.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if the file is missing or unreadable.
    pub async fn open(toolkit: Arc<Toolkit>, input: impl Into<PathBuf>) -> Result<Self> {
        let input = input.into();
        toolkit.probe().check_integrity(&input).await?;
        tracing::debug!("Opened {}", input.display());
        Ok(Self {
            toolkit,
            input,
            spec: TransformSpec::new(),
        })
    }

    fn derive(&self, spec: TransformSpec) -> Self {
        Self {
            toolkit: self.toolkit.clone(),
            input: self.input.clone(),
            spec,
        }
    }

    // -- transitions -----------------------------------------------------------

    pub fn mute(&self, mute: bool) -> Self {
        self.derive(self.spec.with_mute(mute))
    }

    /// Scale to `width`x`height`; either may be `-1` to keep the aspect ratio.
    pub fn scale(&self, width: i32, height: i32) -> Self {
        self.derive(self.spec.with_scale(width, height))
    }

    pub fn crop(&self, origin: (u32, u32), size: (u32, u32)) -> Self {
        self.derive(self.spec.with_crop(origin, size))
    }

    pub fn bitrate(&self, bitrate: impl Into<Bitrate>) -> Self {
        self.derive(self.spec.with_bitrate(bitrate))
    }

    pub fn fps(&self, fps: f64) -> Self {
        self.derive(self.spec.with_fps(fps))
    }

    pub fn codec_preset(&self, preset: CodecPreset) -> Self {
        self.derive(self.spec.with_codec_preset(preset))
    }

    pub fn quality(&self, quality: Quality) -> Self {
        self.derive(self.spec.with_quality(quality))
    }

    pub fn suffix(&self, suffix: impl Into<String>) -> Self {
        self.derive(self.spec.with_suffix(suffix))
    }

    /// Replace the whole transform.
    pub fn with_spec(&self, spec: TransformSpec) -> Self {
        self.derive(spec)
    }

    // -- accessors -------------------------------------------------------------

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    pub fn toolkit(&self) -> &Arc<Toolkit> {
        &self.toolkit
    }

    /// Where [`export`](Self::export) writes for a requested `output`.
    pub fn output_path(&self, output: &Path) -> PathBuf {
        derive_output_path(output, self.spec.suffix(), None)
    }

    /// The command [`export`](Self::export) would run.
    pub fn export_command(&self, output: &Path) -> Result<ToolCommand> {
        let target = self.output_path(output);
        self.ensure_not_input(&target)?;
        self.toolkit
            .commands()
            .export_command(&self.input, &target, &self.spec)
    }

    /// Measured metrics of the input.
    pub async fn info(&self) -> Result<VideoMetrics> {
        self.toolkit.probe().metrics(&self.input).await
    }

    // -- terminal operations ---------------------------------------------------

    /// Export the whole input with the current transform.
    ///
    /// Returns the written path, which carries the suffix between stem and
    /// extension.
    pub async fn export(&self, output: &Path) -> Result<PathBuf> {
        let _permit = self.toolkit.pool().acquire().await?;
        self.export_unpooled(output).await
    }

    async fn export_unpooled(&self, output: &Path) -> Result<PathBuf> {
        let cmd = self.export_command(output)?;
        let target = self.output_path(output);
        tracing::info!("Exporting {} -> {}", self.input.display(), target.display());
        run_to_output(&self.toolkit, &cmd, &target).await?;
        Ok(target)
    }

    /// Cut the input into consecutive slices of `step_ms` milliseconds.
    ///
    /// Slice `i` is written to `{stem}{suffix}-{i}{ext}`. A remainder shorter
    /// than one source frame is appended to the previous slice instead of
    /// becoming a slice of its own. Slices are exported in parallel; the
    /// collection lists them in timeline order. If any slice fails, the
    /// slices already written are removed and the first error is returned.
    pub async fn slice(&self, output: &Path, step_ms: u64) -> Result<VideoCollection> {
        if step_ms == 0 {
            return Err(Error::Validation("slice step must be positive".into()));
        }
        self.spec.validate()?;

        let probe = self.toolkit.probe();
        let (duration_us, fps) =
            tokio::try_join!(probe.duration_us(&self.input), probe.fps(&self.input))?;
        let duration_ms = duration_us.div_ceil(1000);
        let frame_ms = 1000u64.div_ceil(u64::from(fps.max(1)));
        let windows = merge_short_tail(partition(0, duration_ms, step_ms), frame_ms);

        let mut planned = Vec::new();
        for (index, (offset, length)) in windows.into_iter().enumerate() {
            let path = derive_output_path(output, self.spec.suffix(), Some(index));
            self.ensure_not_input(&path)?;
            let cmd = self.toolkit.commands().slice_command(
                &self.input,
                &path,
                &self.spec,
                offset,
                length,
            )?;
            planned.push((path, cmd));
        }

        tracing::info!(
            "Slicing {} ({duration_ms} ms) into {} parts of {step_ms} ms",
            self.input.display(),
            planned.len()
        );

        let jobs = planned.into_iter().map(|(path, cmd)| {
            let toolkit = self.toolkit.clone();
            async move {
                run_to_output(&toolkit, &cmd, &path).await?;
                Ok(path)
            }
        });
        let results = self.toolkit.pool().run_all(jobs).await;

        let mut produced = Vec::new();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(path) => produced.push(path),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            tracing::warn!("Slicing {} failed: {e}", self.input.display());
            for path in &produced {
                remove_partial(path).await;
            }
            return Err(e);
        }

        let mut collection = VideoCollection::new(self.toolkit.probe().clone());
        for path in produced {
            collection.push(path);
        }
        Ok(collection)
    }

    /// Export with a video bitrate chosen to land near `target_size_bits`.
    ///
    /// A muted export budgets no audio.
    pub async fn compress_to_target_size(
        &self,
        target_size_bits: u64,
        output: &Path,
    ) -> Result<PathBuf> {
        let probe = self.toolkit.probe();
        let audio = async {
            if self.spec.mute() {
                Ok(0)
            } else {
                probe.audio_bitrate_bps(&self.input).await
            }
        };
        let (duration_us, audio_bitrate_bps) =
            tokio::try_join!(probe.duration_us(&self.input), audio)?;

        let duration_secs = duration_us as f64 / 1_000_000.0;
        let video_bps =
            solve_target_video_bitrate(target_size_bits, duration_secs, audio_bitrate_bps)?;
        tracing::info!(
            "Target {target_size_bits} bits over {duration_secs:.3}s: video bitrate {video_bps} bps"
        );

        self.bitrate(Bitrate::Bps(video_bps)).export(output).await
    }

    /// Export one variant per preset, in parallel.
    ///
    /// Each preset is applied on top of the current transform. A preset
    /// without a suffix writes to `{stem}{suffix}-{name}{ext}`. A preset whose
    /// output path is already taken by an earlier preset fails with
    /// [`Error::Validation`] without running. A failing preset is recorded in
    /// the report and never touches its siblings' outputs.
    pub async fn export_collection(&self, output: &Path, presets: &[PresetOverlay]) -> BatchReport {
        let names: Vec<String> = presets.iter().map(|p| p.name.clone()).collect();
        let mut claimed = HashSet::new();
        let jobs: Vec<_> = presets
            .iter()
            .map(|preset| {
                let variant = self.derive(self.preset_spec(preset));
                let target = variant.output_path(output);
                let collision = !claimed.insert(target.clone());
                let output = output.to_path_buf();
                let name = preset.name.clone();
                async move {
                    if collision {
                        return Err(Error::Validation(format!(
                            "preset {name} would overwrite {}, written by another preset",
                            target.display()
                        )));
                    }
                    variant.export_unpooled(&output).await
                }
            })
            .collect();
        let results = self.toolkit.pool().run_all(jobs).await;

        let outcomes = names
            .into_iter()
            .zip(results)
            .map(|(preset, result)| {
                if let Err(e) = &result {
                    tracing::warn!("Preset {preset} failed: {e}");
                }
                PresetOutcome { preset, result }
            })
            .collect();

        let report = BatchReport::new(outcomes);
        tracing::info!(
            "Batch export of {}: {} succeeded, {} failed",
            self.input.display(),
            report.succeeded(),
            report.failed()
        );
        report
    }

    fn preset_spec(&self, preset: &PresetOverlay) -> TransformSpec {
        let spec = preset.apply(&self.spec);
        if preset.suffix.is_some() {
            return spec;
        }
        spec.with_suffix(format!("{}-{}", self.spec.suffix(), preset.name))
    }

    /// Rewrite the input as a fragmented MP4 at exactly `output`.
    ///
    /// The transform is not applied.
    pub async fn fragment(&self, output: &Path) -> Result<PathBuf> {
        self.ensure_not_input(output)?;
        let cmd = self
            .toolkit
            .commands()
            .fragment_command(&self.input, output)?;
        let _permit = self.toolkit.pool().acquire().await?;
        tracing::info!("Fragmenting {} -> {}", self.input.display(), output.display());
        run_to_output(&self.toolkit, &cmd, output).await?;
        Ok(output.to_path_buf())
    }

    fn ensure_not_input(&self, output: &Path) -> Result<()> {
        if is_same_location(output, &self.input) {
            return Err(Error::Validation(format!(
                "output {} would overwrite the input",
                output.display()
            )));
        }
        Ok(())
    }
}

/// Run `cmd`, removing `output` if it fails or is cancelled.
async fn run_to_output(toolkit: &Toolkit, cmd: &ToolCommand, output: &Path) -> Result<()> {
    match run_checked(toolkit.tool(), cmd, toolkit.cancellation()).await {
        Ok(_) => Ok(()),
        Err(e) => {
            remove_partial(output).await;
            Err(e)
        }
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {e}", path.display()),
    }
}
