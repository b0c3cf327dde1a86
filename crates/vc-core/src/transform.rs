//! The immutable [`TransformSpec`] describing one export pipeline.
//!
//! A spec is a plain value: every `with_*` method returns a new spec with one
//! field replaced and leaves the receiver untouched, so several pipelines can
//! branch from a common base without interfering with each other.
//!
//! Video filters are always rendered in the order crop → fps → scale. Unset
//! edits are omitted entirely; a spec without filters renders no filter chain
//! at all.

use serde::{Deserialize, Serialize};

use crate::media::{Bitrate, CodecPreset, Quality, Resolution};
use crate::{Error, Result};

/// Sentinel dimension meaning "derive from the other dimension".
pub const AUTO_DIMENSION: i32 = -1;

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

/// Target output size. Either dimension may be [`AUTO_DIMENSION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    pub width: i32,
    pub height: i32,
}

impl Scale {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.width, self.height);
        if w == AUTO_DIMENSION && h == AUTO_DIMENSION {
            return Err(Error::Validation(
                "scale needs at least one explicit dimension".into(),
            ));
        }
        for (name, value) in [("width", w), ("height", h)] {
            if value == AUTO_DIMENSION {
                continue;
            }
            if value <= 0 {
                return Err(Error::Validation(format!(
                    "scale {name} must be positive or -1, got {value}"
                )));
            }
            if value % 2 != 0 {
                return Err(Error::Validation(format!(
                    "scale {name} must be even, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// The ffmpeg `scale` filter for this size.
    ///
    /// An automatic dimension becomes an expression over the filter's input
    /// aspect ratio, truncated to a multiple of two.
    pub fn filter(&self) -> String {
        let width = if self.width == AUTO_DIMENSION {
            "trunc(oh*a/2)*2".to_string()
        } else {
            self.width.to_string()
        };
        let height = if self.height == AUTO_DIMENSION {
            "trunc(ow/a/2)*2".to_string()
        } else {
            self.height.to_string()
        };
        format!("scale={width}:{height}")
    }

    /// Compute the output size for a given source size, using the same
    /// rounding as [`Scale::filter`].
    pub fn resolve(&self, source: Resolution) -> Result<Resolution> {
        self.validate()?;
        if source.width == 0 || source.height == 0 {
            return Err(Error::Validation(format!(
                "cannot derive a dimension from source size {source}"
            )));
        }
        let src_w = f64::from(source.width);
        let src_h = f64::from(source.height);

        let resolved = if self.width == AUTO_DIMENSION {
            let height = self.height as u32;
            Resolution::new(even_floor(f64::from(height) * src_w / src_h), height)
        } else if self.height == AUTO_DIMENSION {
            let width = self.width as u32;
            Resolution::new(width, even_floor(f64::from(width) * src_h / src_w))
        } else {
            Resolution::new(self.width as u32, self.height as u32)
        };
        Ok(resolved)
    }
}

fn even_floor(value: f64) -> u32 {
    ((value / 2.0).trunc() * 2.0) as u32
}

// ---------------------------------------------------------------------------
// Crop
// ---------------------------------------------------------------------------

/// A crop rectangle: top-left origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Crop {
    pub fn filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// TransformSpec
// ---------------------------------------------------------------------------

/// Immutable description of one export pipeline's edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    mute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<Scale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_origin: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bitrate: Option<Bitrate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    codec_preset: Option<CodecPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<Quality>,
    #[serde(skip_serializing_if = "String::is_empty")]
    suffix: String,
}

impl TransformSpec {
    pub fn new() -> Self {
        Self::default()
    }

    // -- transitions ---------------------------------------------------------

    pub fn with_mute(&self, mute: bool) -> Self {
        Self {
            mute: Some(mute),
            ..self.clone()
        }
    }

    pub fn with_scale(&self, width: i32, height: i32) -> Self {
        Self {
            scale: Some(Scale::new(width, height)),
            ..self.clone()
        }
    }

    /// Crop origin and size are always set together.
    pub fn with_crop(&self, origin: (u32, u32), size: (u32, u32)) -> Self {
        Self {
            crop_origin: Some(origin),
            crop_size: Some(size),
            ..self.clone()
        }
    }

    pub fn with_bitrate(&self, bitrate: impl Into<Bitrate>) -> Self {
        Self {
            bitrate: Some(bitrate.into()),
            ..self.clone()
        }
    }

    pub fn with_fps(&self, fps: f64) -> Self {
        Self {
            fps: Some(fps),
            ..self.clone()
        }
    }

    pub fn with_codec_preset(&self, preset: CodecPreset) -> Self {
        Self {
            codec_preset: Some(preset),
            ..self.clone()
        }
    }

    pub fn with_quality(&self, quality: Quality) -> Self {
        Self {
            quality: Some(quality),
            ..self.clone()
        }
    }

    pub fn with_suffix(&self, suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..self.clone()
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn mute(&self) -> bool {
        self.mute.unwrap_or(false)
    }

    pub fn scale(&self) -> Option<Scale> {
        self.scale
    }

    /// The crop rectangle, if both origin and size are set.
    pub fn crop(&self) -> Option<Crop> {
        match (self.crop_origin, self.crop_size) {
            (Some((x, y)), Some((width, height))) => Some(Crop {
                x,
                y,
                width,
                height,
            }),
            _ => None,
        }
    }

    pub fn bitrate(&self) -> Option<&Bitrate> {
        self.bitrate.as_ref()
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps
    }

    pub fn codec_preset(&self) -> CodecPreset {
        self.codec_preset.unwrap_or_default()
    }

    /// Quality level; `Default` when unset.
    pub fn quality(&self) -> Quality {
        self.quality.unwrap_or_default()
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    // -- validation and rendering -------------------------------------------

    /// Reject combinations that would render a malformed command line.
    pub fn validate(&self) -> Result<()> {
        match (self.crop_origin, self.crop_size) {
            (Some(_), None) => {
                return Err(Error::Validation("crop origin set without crop size".into()))
            }
            (None, Some(_)) => {
                return Err(Error::Validation("crop size set without crop origin".into()))
            }
            (Some(_), Some((w, h))) if w == 0 || h == 0 => {
                return Err(Error::Validation(format!("crop size must be positive, got {w}x{h}")))
            }
            _ => {}
        }

        if let Some(scale) = &self.scale {
            scale.validate()?;
        }

        if let Some(bitrate) = &self.bitrate {
            bitrate.validate()?;
        }

        if let Some(fps) = self.fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(Error::Validation(format!("fps must be positive, got {fps}")));
            }
        }

        if self.quality.is_some() && self.codec_preset() == CodecPreset::None {
            tracing::debug!("quality is set without a codec preset and will be ignored");
        }

        if self.suffix.contains(['/', '\\']) {
            return Err(Error::Validation(format!(
                "suffix must not contain path separators: {:?}",
                self.suffix
            )));
        }

        Ok(())
    }

    /// Individual video filters in application order (crop, fps, scale).
    pub fn video_filters(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(crop) = self.crop() {
            filters.push(crop.filter());
        }
        if let Some(fps) = self.fps {
            filters.push(format!("fps={}", format_number(fps)));
        }
        if let Some(scale) = &self.scale {
            filters.push(scale.filter());
        }
        filters
    }

    /// The joined `-vf` expression, or `None` when no filter is configured.
    pub fn filter_chain(&self) -> Option<String> {
        let filters = self.video_filters();
        if filters.is_empty() {
            None
        } else {
            Some(filters.join(","))
        }
    }
}

/// Render a float without a trailing `.0` for whole numbers.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
