//! Notification delivery with bounded retries, chunking, and pacing.

pub mod dispatcher;
pub mod types;

pub use dispatcher::NotificationDispatcher;
pub use types::{NotificationTarget, NotifyConfig};
