//! Request batching for the outbound call path.

pub mod batcher;
pub mod error;
pub mod types;

pub use batcher::RequestBatcher;
pub use error::BatchError;
pub use types::{BatchOutcome, BatcherConfig};
