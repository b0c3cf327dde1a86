//! Bento4 `mp4info --format json` output.

use serde::Deserialize;
use vc_core::{Error, Result};

#[derive(Debug, Deserialize)]
struct Mp4InfoOutput {
    movie: Mp4InfoMovie,
}

#[derive(Debug, Deserialize)]
struct Mp4InfoMovie {
    fragments: bool,
}

/// Whether the movie box declares fragments.
pub fn parse_fragmented(output: &str) -> Result<bool> {
    let info: Mp4InfoOutput = serde_json::from_str(output).map_err(|e| {
        tracing::debug!("mp4info JSON parse error: {e}");
        Error::probe_parse("fragmented", output.trim())
    })?;
    Ok(info.movie.fragments)
}
