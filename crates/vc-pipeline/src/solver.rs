//! First-order bitrate estimate for a target output size.
//!
//! The total bitrate is spread over the duration plus one second of slack
//! for container overhead, and the audio bitrate is taken off the top. This
//! is a linear estimate, not a rate-distortion search; the encoder may land
//! somewhat above or below the target.

use vc_core::{Error, Result};

/// Video bitrate (bits per second) that should yield `target_size_bits`.
///
/// # Errors
///
/// - [`Error::Validation`] for a negative or non-finite duration.
/// - [`Error::InfeasibleTarget`] when audio alone consumes the budget.
pub fn solve_target_video_bitrate(
    target_size_bits: u64,
    duration_seconds: f64,
    audio_bitrate_bps: u64,
) -> Result<u64> {
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(Error::Validation(format!(
            "duration must be non-negative, got {duration_seconds}"
        )));
    }

    let total = target_size_bits as f64 / (duration_seconds + 1.0);
    let video = (total - audio_bitrate_bps as f64).floor();

    if video < 1.0 {
        return Err(Error::InfeasibleTarget {
            target_bits: target_size_bits,
            duration_secs: duration_seconds,
            audio_bitrate_bps,
        });
    }

    tracing::debug!(
        "target {target_size_bits} bits over {duration_seconds:.3}s: total {total:.0} bps, video {video:.0} bps"
    );
    Ok(video as u64)
}
