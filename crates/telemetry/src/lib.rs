//! Global `tracing` subscriber setup (§4.9): a JSON-formatted, env-filtered
//! subscriber installed once at process start. `tracing-subscriber`'s
//! default `tracing-log` feature already bridges the legacy `log` facade
//! into `tracing`, so any dependency still using `log::*` is captured too
//! without a separate bridge call.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Honors `RUST_LOG` first, then
/// `GRIDNODE_LOG`, defaulting to `info` if neither is set. Call once, as
/// early as possible in `main`.
pub fn init_tracing() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("GRIDNODE_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(true)
        .try_init()
        .map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}
