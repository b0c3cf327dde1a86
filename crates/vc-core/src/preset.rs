//! Named preset overlays applied on top of a base [`TransformSpec`].
//!
//! A preset only carries the fields it overrides; everything else is taken
//! from the base spec. [`web_ladder`] is the standard small / medium / large /
//! extra-large ladder used by batch export.

use serde::{Deserialize, Serialize};

use crate::media::Bitrate;
use crate::transform::{Scale, TransformSpec};

/// A partial [`TransformSpec`] overlay with a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetOverlay {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<Bitrate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Output name suffix; batch export uses `-{name}` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl PresetOverlay {
    /// Derive a new spec from `base` with this preset's fields replaced.
    pub fn apply(&self, base: &TransformSpec) -> TransformSpec {
        let mut spec = base.clone();
        if let Some(scale) = self.scale {
            spec = spec.with_scale(scale.width, scale.height);
        }
        if let Some(bitrate) = &self.bitrate {
            spec = spec.with_bitrate(bitrate.clone());
        }
        if let Some(fps) = self.fps {
            spec = spec.with_fps(fps);
        }
        if let Some(suffix) = &self.suffix {
            spec = spec.with_suffix(suffix.clone());
        }
        spec
    }
}

fn ladder_step(name: &str, width: i32, bitrate_bps: u64, fps: f64) -> PresetOverlay {
    PresetOverlay {
        name: name.to_string(),
        scale: Some(Scale::new(width, -1)),
        bitrate: Some(Bitrate::Bps(bitrate_bps)),
        fps: Some(fps),
        suffix: Some(format!("-{name}")),
    }
}

/// The standard web resolution ladder.
pub fn web_ladder() -> Vec<PresetOverlay> {
    vec![
        ladder_step("sm", 640, 800_000, 24.0),
        ladder_step("md", 960, 1_500_000, 30.0),
        ladder_step("lg", 1280, 3_000_000, 30.0),
        ladder_step("xl", 1920, 6_000_000, 30.0),
    ]
}
