//! Pipeline integration tests
//!
//! Drives the public API end to end over a scripted tool, plus a shell
//! script standing in for ffmpeg to exercise real process handling.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{fake_toolkit, sample_metrics, touch, ScriptedTool};
use vcompress::{Compressor, Config, Error, Resolution, Toolkit};

fn config_with_workers(workers: usize) -> Config {
    let mut config = Config::default();
    config.execution.max_concurrency = workers;
    config
}

// ===== Opening and probing =====

#[tokio::test]
async fn test_open_rejects_undecodable_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "notes.mp4");
    let tool = Arc::new(ScriptedTool::new().fail(
        &["-t 1 -f null"],
        1,
        "notes.mp4: Invalid data found when processing input\n",
    ));

    let err = Compressor::open(fake_toolkit(tool, Config::default()), &input)
        .await
        .unwrap_err();
    assert_matches!(err, Error::InvalidInput { ref path, .. } if path == &input);
}

#[tokio::test]
async fn test_open_rejects_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.mp4");
    let tool = Arc::new(ScriptedTool::new().fail(
        &["-t 1 -f null"],
        1,
        "missing.mp4: No such file or directory\n",
    ));

    let result = Compressor::open(fake_toolkit(tool, Config::default()), &input).await;
    assert_matches!(result, Err(Error::InvalidInput { .. }));
}

#[tokio::test]
async fn test_info_reports_sample_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "sample.mp4");
    let tool = Arc::new(sample_metrics(ScriptedTool::new()));

    let video = Compressor::open(fake_toolkit(tool, Config::default()), &input)
        .await
        .unwrap();
    let info = video.info().await.unwrap();

    assert_eq!(info.resolution, Resolution::new(960, 540));
    assert_eq!(info.video_bitrate_bps, 2_200_634);
    assert_eq!(info.audio_bitrate_bps, 133_274);
    assert_eq!(info.duration_us, 4_871_533);
    assert_eq!(info.size_bytes, 6);
    assert_eq!(info.fps, 30);
    assert!(info.has_audio);
    assert_eq!(info.fragmented, Some(false));
}

#[tokio::test]
async fn test_info_without_audio_stream() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "silent.mp4");
    let tool = Arc::new(
        ScriptedTool::new()
            .on(&["stream=width,height"], "960x540\n")
            .on(&["v:0", "stream=bit_rate"], "2200634\n")
            .on(&["format=duration"], "4.871533\n")
            .on(&["r_frame_rate"], "30000/1001\n")
            .fail(
                &["volumedetect"],
                1,
                "Output file does not contain any stream\n",
            ),
    );

    let video = Compressor::open(fake_toolkit(tool, Config::default()), &input)
        .await
        .unwrap();
    let info = video.info().await.unwrap();

    assert!(!info.has_audio);
    assert_eq!(info.audio_bitrate_bps, 0);
    assert_eq!(info.fps, 30);
}

// ===== Tool discovery =====

#[test]
fn test_missing_ffmpeg_is_reported() {
    let mut config = Config::default();
    config.tools.ffmpeg_path = Some("/nonexistent/bin/ffmpeg".into());

    let err = Toolkit::new(config).unwrap_err();
    assert_matches!(err, Error::MissingTool { ref tool } if tool == "ffmpeg");
}

#[test]
fn test_toolkit_from_config_file_with_bad_tool_path() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("vcompress.json");
    std::fs::write(
        &config_path,
        r#"{"tools": {"ffmpeg_path": "/nonexistent/bin/ffmpeg"}}"#,
    )
    .unwrap();

    let result = vcompress::toolkit(Some(&config_path));
    assert_matches!(result, Err(Error::MissingTool { .. }));
}

#[test]
fn test_check_tools_lists_every_known_tool() {
    let mut config = Config::default();
    config.tools.mp4info_path = Some("/nonexistent/bin/mp4info".into());

    let infos = vcompress::check_tools(&config);
    let names: Vec<&str> = infos.iter().map(|t| t.name.as_str()).collect();
    for tool in ["ffmpeg", "ffprobe", "mp4fragment", "mp4info"] {
        assert!(names.contains(&tool), "{tool} missing from {names:?}");
    }
    let mp4info = infos.iter().find(|t| t.name == "mp4info").unwrap();
    assert!(!mp4info.available);
}

// ===== Slicing =====

#[tokio::test]
async fn test_slice_durations_cover_source() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "sample.mp4");
    let tool = Arc::new(
        sample_metrics(ScriptedTool::new())
            .on(&["part-0.mp4", "format=duration"], "2.000000\n")
            .on(&["part-1.mp4", "format=duration"], "2.000000\n")
            .on(&["part-2.mp4", "format=duration"], "0.872000\n"),
    );
    let toolkit = fake_toolkit(tool.clone(), config_with_workers(2));
    let video = Compressor::open(toolkit, &input).await.unwrap();

    let slices = video.slice(&dir.path().join("part.mp4"), 2000).await.unwrap();
    assert_eq!(slices.len(), 3);
    for path in slices.paths() {
        assert!(path.exists(), "{} not written", path.display());
    }

    let source = video.toolkit().probe().duration_us(&input).await.unwrap();
    let total = slices.total_duration_us().await.unwrap();
    assert!(source.abs_diff(total) < 1_000, "source {source} vs slices {total}");
}

#[tokio::test]
async fn test_slice_applies_transform_to_every_part() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "sample.mp4");
    let tool = Arc::new(sample_metrics(ScriptedTool::new()));
    let toolkit = fake_toolkit(tool.clone(), Config::default());
    let video = Compressor::open(toolkit, &input).await.unwrap();

    video
        .scale(96, 54)
        .mute(true)
        .slice(&dir.path().join("clip.mp4"), 2500)
        .await
        .unwrap();

    let exports: Vec<String> = tool
        .lines()
        .into_iter()
        .filter(|l| l.contains("-ss "))
        .collect();
    assert_eq!(exports.len(), 2);
    for line in &exports {
        assert!(line.contains("scale=96:54"), "got {line}");
        assert!(line.contains(" -an "), "got {line}");
    }
}

// ===== Batch export =====

#[tokio::test]
async fn test_export_collection_with_configured_presets() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "sample.mp4");
    let config = Config::from_json(
        r#"{
            "execution": {"max_concurrency": 2},
            "presets": [
                {"name": "thumb", "scale": {"width": 96, "height": -1}, "suffix": "-thumb"},
                {"name": "low", "bitrate": "400k", "fps": 15, "suffix": "-low"}
            ]
        }"#,
    )
    .unwrap();
    let presets = config.preset_ladder();
    let tool = Arc::new(sample_metrics(ScriptedTool::new()));
    let video = Compressor::open(fake_toolkit(tool.clone(), config), &input)
        .await
        .unwrap();

    let report = video
        .export_collection(&dir.path().join("out.mp4"), &presets)
        .await;
    assert!(report.all_succeeded());
    assert_eq!(
        report.outputs(),
        [
            dir.path().join("out-thumb.mp4").as_path(),
            dir.path().join("out-low.mp4").as_path()
        ]
    );

    let lines = tool.lines();
    let thumb = lines.iter().find(|l| l.ends_with("out-thumb.mp4")).unwrap();
    assert!(thumb.contains("scale=96:trunc(ow/a/2)*2"), "got {thumb}");
    let low = lines.iter().find(|l| l.ends_with("out-low.mp4")).unwrap();
    assert!(low.contains("fps=15"), "got {low}");
    assert!(low.contains("-b:v 400k -maxrate 400k -bufsize 800k"), "got {low}");
}

#[tokio::test]
async fn test_unsuffixed_preset_failure_keeps_sibling_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "sample.mp4");
    let config = Config::from_json(
        r#"{
            "presets": [
                {"name": "thumb", "scale": {"width": 96, "height": -1}},
                {"name": "low", "fps": 15}
            ]
        }"#,
    )
    .unwrap();
    let presets = config.preset_ladder();
    let tool = Arc::new(
        sample_metrics(ScriptedTool::new()).fail(&["fps=15"], 1, "Conversion failed!\n"),
    );
    let video = Compressor::open(fake_toolkit(tool.clone(), config), &input)
        .await
        .unwrap();

    let report = video
        .export_collection(&dir.path().join("out.mp4"), &presets)
        .await;

    let thumb = report.outcome("thumb").unwrap().output().unwrap();
    assert_eq!(thumb, dir.path().join("out-thumb.mp4"));
    assert!(thumb.exists(), "successful preset output was removed");
    assert!(report.outcome("low").unwrap().error().is_some());
    assert!(!dir.path().join("out-low.mp4").exists());

    let plain_targets = tool
        .lines()
        .iter()
        .filter(|l| l.ends_with("/out.mp4"))
        .count();
    assert_eq!(plain_targets, 0);
}

#[tokio::test]
async fn test_concurrency_is_bounded_by_config() {
    let dir = tempfile::tempdir().unwrap();
    let input = touch(dir.path(), "sample.mp4");
    let tool = Arc::new(sample_metrics(ScriptedTool::new()).with_delay(Duration::from_millis(50)));
    let video = Compressor::open(fake_toolkit(tool.clone(), config_with_workers(2)), &input)
        .await
        .unwrap();

    let report = video
        .export_collection(&dir.path().join("out.mp4"), &vcompress::web_ladder())
        .await;
    assert!(report.all_succeeded());

    let slices = video.slice(&dir.path().join("part.mp4"), 500).await.unwrap();
    assert_eq!(slices.len(), 10);

    let peak = tool.peak_concurrency();
    assert!((1..=2).contains(&peak), "peak concurrency {peak}");
}

// ===== Process handling =====

#[cfg(unix)]
mod process {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use vcompress::{ToolRegistry, ToolsConfig};

    /// Stand-in ffmpeg: passes the integrity check, then writes a partial
    /// output and hangs.
    const HANGING_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
case "$*" in
  *"-f null"*) exit 0 ;;
esac
echo partial > "$last"
sleep 30
"#;

    fn install_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn script_toolkit(dir: &Path, timeout_secs: u64) -> Arc<Toolkit> {
        let ffmpeg = install_script(dir, "ffmpeg", HANGING_FFMPEG);
        let ffprobe = install_script(dir, "ffprobe", "#!/bin/sh\necho 5.0\n");

        let mut config = Config::default();
        config.tools = ToolsConfig {
            ffmpeg_path: Some(ffmpeg),
            ffprobe_path: Some(ffprobe),
            ..ToolsConfig::default()
        };
        config.execution.tool_timeout_secs = timeout_secs;

        let registry = ToolRegistry::discover(&config.tools);
        assert!(registry.is_available("ffmpeg"));
        Toolkit::new(config).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn test_cancel_kills_export_and_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "sample.mp4");
        let toolkit = script_toolkit(dir.path(), 60);
        let video = Compressor::open(toolkit.clone(), &input).await.unwrap();
        let output = dir.path().join("out.mp4");

        let export = {
            let output = output.clone();
            tokio::spawn(async move { video.export(&output).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        toolkit.cancel();

        let result = tokio::time::timeout(Duration::from_secs(10), export)
            .await
            .expect("export did not stop after cancel")
            .unwrap();
        assert_matches!(result, Err(Error::Cancelled { ref tool }) if tool == "ffmpeg");
        assert!(!output.exists());
    }

    #[tokio::test]
    #[serial]
    async fn test_timeout_kills_export_and_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = touch(dir.path(), "sample.mp4");
        let video = Compressor::open(script_toolkit(dir.path(), 1), &input)
            .await
            .unwrap();
        let output = dir.path().join("out.mp4");

        let result = tokio::time::timeout(Duration::from_secs(10), video.export(&output))
            .await
            .expect("export outlived its timeout");
        assert_matches!(result, Err(Error::Timeout { .. }));
        assert!(!output.exists());
    }
}
