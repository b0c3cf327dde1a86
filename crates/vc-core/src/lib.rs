//! vc-core: shared errors, configuration, media value types, and the
//! immutable [`TransformSpec`] describing one export pipeline.
//!
//! This crate is the foundational dependency for the other vc-* crates. It
//! never spawns processes or touches media files; it only describes what the
//! other crates should ask the external tools to do.

pub mod config;
pub mod error;
pub mod media;
pub mod preset;
pub mod transform;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::*;
pub use preset::{web_ladder, PresetOverlay};
pub use transform::{Crop, Scale, TransformSpec};
