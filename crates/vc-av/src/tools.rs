//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools (ffmpeg, ffprobe, mp4fragment, mp4info) and provides lookup
//! methods for the rest of the crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vc_core::config::ToolsConfig;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";
pub const MP4FRAGMENT: &str = "mp4fragment";
pub const MP4INFO: &str = "mp4info";

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &[FFMPEG, FFPROBE, MP4FRAGMENT, MP4INFO];

/// A resolved external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of the version output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools using overrides from config, then `PATH`.
    ///
    /// For each known tool, a path configured in [`ToolsConfig`] is used as
    /// long as it exists. A configured path that does not exist leaves the
    /// tool unregistered, so a typo surfaces as a missing tool instead of
    /// silently picking up another binary. Tools without an override are
    /// located with [`which::which`]; tools that are not found are omitted.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let resolved = match tools_config.override_for(name) {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!("Configured {name} path {} does not exist", p.display());
                    None
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tracing::debug!("Resolved {name} at {}", path.display());
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Register `name` at `path` without checking that it exists.
    pub fn with_tool(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(
            name.to_string(),
            ToolConfig {
                name: name.to_string(),
                path: path.into(),
            },
        );
        self
    }

    /// Return a reference to the [`ToolConfig`] for the given tool, or
    /// [`vc_core::Error::MissingTool`] if it was not found during discovery.
    pub fn require(&self, name: &str) -> vc_core::Result<&ToolConfig> {
        self.tools
            .get(name)
            .ok_or_else(|| vc_core::Error::missing_tool(name))
    }

    /// Resolved path for `name`, if registered.
    pub fn path(&self, name: &str) -> Option<&Path> {
        self.tools.get(name).map(|t| t.path.as_path())
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, &cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }

    /// Iterate over all registered tool configs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolConfig)> {
        self.tools.iter()
    }
}

/// Run the tool's version query and return the first non-empty output line.
///
/// ffmpeg and ffprobe answer `-version` on stdout; the Bento4 tools print
/// their banner (including the version) as usage text when run without
/// arguments and exit non-zero, so their output is read regardless of status.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let mut cmd = std::process::Command::new(path);
    if matches!(name, FFMPEG | FFPROBE) {
        cmd.arg("-version");
    }

    let output = cmd.output().ok()?;
    if matches!(name, FFMPEG | FFPROBE) && !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|s| s.to_string())
}
