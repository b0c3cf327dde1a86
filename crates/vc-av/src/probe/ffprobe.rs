//! Parsers for the plain-text ffprobe and ffmpeg output vcompress queries.
//!
//! Each function takes the raw captured stream and returns a typed value or
//! [`vc_core::Error::ProbeParse`] naming the query that failed.

use vc_core::{Error, Resolution, Result};

/// Substring ffmpeg prints when the volumedetect filter saw audio samples.
pub const VOLUMEDETECT_MARKER: &str = "Parsed_volumedetect";

/// Diagnostic substrings that identify an unreadable or missing input.
pub const INVALID_INPUT_MARKERS: &[&str] = &[
    "No such file or directory",
    "Invalid data found when processing input",
    "moov atom not found",
    "could not find codec parameters",
    "Error opening input",
];

/// The first marker from [`INVALID_INPUT_MARKERS`] found in `stderr`.
pub fn invalid_input_marker(stderr: &str) -> Option<&'static str> {
    INVALID_INPUT_MARKERS
        .iter()
        .copied()
        .find(|m| stderr.contains(m))
}

/// First non-empty line of `output`, trimmed.
fn first_value(output: &str) -> &str {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}

/// Parse `WIDTHxHEIGHT` from a csv `s=x` listing.
pub fn parse_resolution(output: &str) -> Result<Resolution> {
    let line = first_value(output);
    let mut parts = line.split('x').filter(|p| !p.is_empty());
    let dims = (
        parts.next().and_then(|w| w.parse::<u32>().ok()),
        parts.next().and_then(|h| h.parse::<u32>().ok()),
    );
    match dims {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Ok(Resolution::new(width, height))
        }
        _ => Err(Error::probe_parse("resolution", output.trim())),
    }
}

/// Parse a stream bit rate; empty output or `N/A` means unknown and yields 0.
pub fn parse_bitrate(query: &str, output: &str) -> Result<u64> {
    match first_value(output) {
        "" | "N/A" => Ok(0),
        value => value
            .parse::<u64>()
            .map_err(|_| Error::probe_parse(query, output.trim())),
    }
}

/// Parse a duration in seconds into whole microseconds.
pub fn parse_duration_us(output: &str) -> Result<u64> {
    let value = first_value(output);
    match value.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok((secs * 1_000_000.0).round() as u64),
        _ => Err(Error::probe_parse("duration", output.trim())),
    }
}

/// Parse `num/den` (or a bare number) into a frame rate.
pub fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let rate_str = rate_str.trim();
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}

/// Frame rate rounded to the nearest whole frame.
pub fn parse_fps(output: &str) -> Result<u32> {
    match parse_frame_rate(first_value(output)) {
        Some(rate) if rate.is_finite() && rate >= 0.0 => Ok(rate.round() as u32),
        _ => Err(Error::probe_parse("fps", output.trim())),
    }
}

/// Whether the volumedetect filter reported on an audio stream.
pub fn reports_audio(stderr: &str) -> bool {
    stderr.contains(VOLUMEDETECT_MARKER)
}
