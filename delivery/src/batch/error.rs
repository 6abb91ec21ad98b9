//! Batcher error types.

use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced to the caller of a batched request.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The request's operation exceeded its allotted time. The underlying
    /// call is not aborted; it keeps running in the background.
    #[error("batched request timed out after {0:?}")]
    Timeout(Duration),
    /// The queue was cleared before this request was drained.
    #[error("batched request cancelled: queue cleared")]
    Cancelled,
    /// The transport call itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BatchError {
    /// Whether this is the cancellation signal from a queue teardown.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
