//! Tracing setup shared by the Lambda binaries.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a JSON subscriber filtered by `RUST_LOG`.
///
/// Timestamps are omitted because CloudWatch stamps ingestion time, and
/// targets are omitted to keep lines short. A second call, or a subscriber
/// installed elsewhere, is reported rather than treated as fatal.
pub fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_target(false)
        .without_time()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}
