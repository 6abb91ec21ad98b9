//! Typed event bus decoupling pipeline producers from audit and monitoring
//! consumers.

pub mod bus;
pub mod types;

pub use bus::{EventBus, SubscriptionId};
pub use types::{Event, EventKind};
