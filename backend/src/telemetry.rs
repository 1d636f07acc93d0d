//! Tracing subscriber setup.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a JSON fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place and log a warning through it.
pub fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}
