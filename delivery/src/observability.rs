//! Tracing subscriber initialization for binaries embedding the pipeline.

use tracing_subscriber::EnvFilter;

/// Initialize a JSON `tracing` subscriber with env-filter support.
///
/// Falls back to `courier_delivery=debug` when `RUST_LOG` is unset. Safe to
/// call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "courier_delivery=debug".into()),
        )
        .json()
        .try_init();
}
