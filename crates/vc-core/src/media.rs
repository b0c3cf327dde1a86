//! Media-domain value types: resolutions, codec presets, quality levels and
//! bitrate caps.
//!
//! Enums serialize in snake_case and implement `Display` manually for a
//! consistent string representation in logs and command lines.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// A frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height; `None` for a zero height.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.height == 0 {
            None
        } else {
            Some(f64::from(self.width) / f64::from(self.height))
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// StreamKind
// ---------------------------------------------------------------------------

/// Elementary stream kind, used to select the first stream of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    /// ffprobe stream specifier for the first stream of this kind.
    pub fn first_stream_specifier(&self) -> &'static str {
        match self {
            Self::Video => "v:0",
            Self::Audio => "a:0",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

// ---------------------------------------------------------------------------
// CodecPreset
// ---------------------------------------------------------------------------

/// Encoder preset applied on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecPreset {
    /// No encoder is forced; container/codec defaults apply.
    #[default]
    None,
    /// H.264 (libx264) with CRF rate control and a main@3.1 profile/level
    /// for broad web playback compatibility.
    H264WebVbr,
}

impl fmt::Display for CodecPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::H264WebVbr => write!(f, "h264_web_vbr"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quality
// ---------------------------------------------------------------------------

/// Encoder quality level, mapped to a constant rate factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    Default,
    Low,
    Max,
}

impl Quality {
    /// Constant rate factor for this level; lower is higher quality.
    pub fn crf(&self) -> u32 {
        match self {
            Self::Default => 24,
            Self::Low => 35,
            Self::Max => 0,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Low => write!(f, "low"),
            Self::Max => write!(f, "max"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bitrate
// ---------------------------------------------------------------------------

/// A video bitrate cap, either in bits per second or in ffmpeg notation
/// (`"800k"`, `"1.5M"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bitrate {
    Bps(u64),
    Raw(String),
}

impl Bitrate {
    /// Check that the value is positive and, for raw values, that it is a
    /// decimal number with an optional k/M/G multiplier.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Bps(0) => Err(Error::Validation("bitrate must be positive".into())),
            Self::Bps(_) => Ok(()),
            Self::Raw(raw) => {
                let digits = raw.strip_suffix(['k', 'K', 'm', 'M', 'g', 'G']).unwrap_or(raw);
                let valid = !digits.is_empty()
                    && !digits.starts_with('.')
                    && !digits.ends_with('.')
                    && digits.chars().filter(|c| *c == '.').count() <= 1
                    && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
                    && digits.chars().any(|c| c.is_ascii_digit() && c != '0');
                if valid {
                    Ok(())
                } else {
                    Err(Error::Validation(format!("invalid bitrate {raw:?}")))
                }
            }
        }
    }

    /// Rate-control buffer size paired with this cap: twice the cap, kept in
    /// the same notation (`800k` buffers `1600k`).
    pub fn buffer_size(&self) -> String {
        match self {
            Self::Bps(bps) => bps.saturating_mul(2).to_string(),
            Self::Raw(raw) => {
                let (digits, unit) = match raw.char_indices().last() {
                    Some((at, c)) if c.is_ascii_alphabetic() => raw.split_at(at),
                    _ => (raw.as_str(), ""),
                };
                match digits.parse::<f64>() {
                    Ok(value) => format!("{}{unit}", value * 2.0),
                    Err(_) => raw.clone(),
                }
            }
        }
    }
}

impl From<u64> for Bitrate {
    fn from(bps: u64) -> Self {
        Self::Bps(bps)
    }
}

impl From<&str> for Bitrate {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bps(bps) => write!(f, "{bps}"),
            Self::Raw(raw) => write!(f, "{raw}"),
        }
    }
}
