//! Logging setup.

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or `default_filter`
/// when it is unset.
///
/// Fails if a global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let env_filter = EnvFilter::try_new(&env_filter)
        .map_err(|e| Error::Validation(format!("invalid log filter {env_filter:?}: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| Error::Internal(format!("failed to install subscriber: {e}")))
}

/// Default filter: debug for the vcompress crates, warnings elsewhere.
pub const DEFAULT_FILTER: &str = "warn,vcompress=debug,vc_core=debug,vc_av=debug,vc_pipeline=debug";
