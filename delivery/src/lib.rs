//! Courier Delivery
//!
//! Outbound delivery pipeline for multi-platform chat bots: many
//! uncoordinated "send a message" intents become rate-limited, batched,
//! retried calls against a remote messaging endpoint.
//!
//! Four cooperating parts:
//! - [`events`] — typed publish/subscribe hub decoupling producers from
//!   audit/monitoring consumers.
//! - [`ratelimit`] — per-key fixed-window admission control over an external
//!   counter store.
//! - [`batch`] — per-session queue coalescing small API calls into time- or
//!   size-bounded batches.
//! - [`notify`] — single and bulk notification delivery with bounded retries
//!   and inter-chunk pacing.
//!
//! Platform connectors implement [`transport::Transport`] and are injected at
//! construction; nothing in this crate talks to a specific messaging API.

pub mod batch;
pub mod events;
pub mod notify;
pub mod observability;
pub mod ratelimit;
pub mod transport;
