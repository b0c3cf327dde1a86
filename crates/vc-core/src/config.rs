//! Configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool paths, execution limits and an optional custom preset ladder. Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::preset::{web_ladder, PresetOverlay};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub execution: ExecutionConfig,
    /// Custom preset ladder for batch export; the web ladder when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presets: Option<Vec<PresetOverlay>>,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// The preset ladder batch export should use.
    pub fn preset_ladder(&self) -> Vec<PresetOverlay> {
        self.presets.clone().unwrap_or_else(web_ladder)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.execution.max_concurrency == 0 {
            warnings.push("execution.max_concurrency is 0; 1 worker will be used".into());
        }

        if self.execution.tool_timeout_secs == 0 {
            warnings.push("execution.tool_timeout_secs is 0; every tool call will time out".into());
        }

        if let Some(d) = self.tools.fragment_duration_ms {
            if d == 0 {
                warnings.push("tools.fragment_duration_ms is 0; mp4fragment defaults apply".into());
            }
        }

        for (name, path) in self.tools.overrides() {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!(
                        "tools.{name}_path {} does not exist; {name} will be reported missing",
                        p.display()
                    ));
                }
            }
        }

        if let Some(presets) = &self.presets {
            if presets.is_empty() {
                warnings.push("presets is empty; batch export will produce nothing".into());
            }
            let mut seen = std::collections::HashSet::new();
            for (i, preset) in presets.iter().enumerate() {
                if !seen.insert(preset.name.as_str()) {
                    warnings.push(format!("presets[{i}].name {:?} is duplicated", preset.name));
                }
                if preset.suffix.as_deref() == Some("") {
                    warnings.push(format!(
                        "presets[{i}] ({}) has an empty suffix; it will collide with other \
                         presets writing the plain output name",
                        preset.name
                    ));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Paths to external CLI tools. Unset paths are looked up on `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub mp4fragment_path: Option<PathBuf>,
    pub mp4info_path: Option<PathBuf>,
    /// Fragment duration passed to mp4fragment, in milliseconds.
    pub fragment_duration_ms: Option<u32>,
}

impl ToolsConfig {
    /// Configured override for a tool name, if any.
    pub fn override_for(&self, name: &str) -> Option<&Path> {
        match name {
            "ffmpeg" => self.ffmpeg_path.as_deref(),
            "ffprobe" => self.ffprobe_path.as_deref(),
            "mp4fragment" => self.mp4fragment_path.as_deref(),
            "mp4info" => self.mp4info_path.as_deref(),
            _ => None,
        }
    }

    fn overrides(&self) -> [(&'static str, Option<&PathBuf>); 4] {
        [
            ("ffmpeg", self.ffmpeg_path.as_ref()),
            ("ffprobe", self.ffprobe_path.as_ref()),
            ("mp4fragment", self.mp4fragment_path.as_ref()),
            ("mp4info", self.mp4info_path.as_ref()),
        ]
    }
}

/// Limits for external tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Maximum number of concurrent tool invocations.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-invocation timeout, in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// Timeout for metadata queries (ffprobe, mp4info), in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_max_concurrency() -> usize {
    num_cpus::get().max(1)
}
fn default_tool_timeout_secs() -> u64 {
    3600
}
fn default_probe_timeout_secs() -> u64 {
    120
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            tool_timeout_secs: default_tool_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl ExecutionConfig {
    /// Worker count, never below one.
    pub fn workers(&self) -> usize {
        self.max_concurrency.max(1)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Bitrate;
    use assert_matches::assert_matches;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.execution.max_concurrency >= 1);
        assert_eq!(cfg.execution.tool_timeout_secs, 3600);
        assert_eq!(cfg.execution.probe_timeout_secs, 120);
        assert!(cfg.tools.ffmpeg_path.is_none());
        assert_eq!(cfg.preset_ladder().len(), 4);
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.execution.tool_timeout(), Duration::from_secs(3600));
        assert!(cfg.presets.is_none());
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{
            "tools": {"ffmpeg_path": "/opt/ffmpeg/bin/ffmpeg", "fragment_duration_ms": 2000},
            "execution": {"max_concurrency": 2},
            "presets": [{"name": "tiny", "bitrate": "200k", "suffix": "-tiny"}]
        }"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(
            cfg.tools.override_for("ffmpeg"),
            Some(Path::new("/opt/ffmpeg/bin/ffmpeg"))
        );
        assert_eq!(cfg.tools.fragment_duration_ms, Some(2000));
        assert_eq!(cfg.execution.workers(), 2);
        assert_eq!(cfg.execution.tool_timeout_secs, 3600);
        let ladder = cfg.preset_ladder();
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0].bitrate, Some(Bitrate::from("200k")));
    }

    #[test]
    fn invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert_matches!(err, Error::Validation(_));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert!(cfg.presets.is_none());
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/vcompress.json")));
        assert_eq!(cfg.execution.tool_timeout_secs, 3600);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vcompress.json");
        std::fs::write(&path, r#"{"execution": {"tool_timeout_secs": 10}}"#).unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.execution.tool_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn zero_limits_warn() {
        let mut cfg = Config::default();
        cfg.execution.max_concurrency = 0;
        cfg.execution.tool_timeout_secs = 0;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("max_concurrency")));
        assert!(warnings.iter().any(|w| w.contains("tool_timeout_secs")));
        assert_eq!(cfg.execution.workers(), 1);
    }

    #[test]
    fn missing_tool_override_warns() {
        let mut cfg = Config::default();
        cfg.tools.ffprobe_path = Some(PathBuf::from("/nonexistent/ffprobe"));
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("ffprobe_path")));
    }

    #[test]
    fn preset_problems_warn() {
        let mut cfg = Config::default();
        let mut ladder = web_ladder();
        ladder.push(ladder[0].clone());
        ladder[1].suffix = Some(String::new());
        ladder[2].suffix = None;
        cfg.presets = Some(ladder);
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("duplicated")));
        assert!(warnings.iter().any(|w| w.contains("presets[1] (md) has an empty suffix")));
        assert!(!warnings.iter().any(|w| w.contains("presets[2]")));
    }
}
