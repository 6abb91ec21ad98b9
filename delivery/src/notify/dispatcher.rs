//! Retrying notification dispatcher.
//!
//! Single sends retry transient failures up to a bound and stop immediately
//! on permanent ones; bulk sends are chunked and paced so broadcasts stay
//! inside downstream throughput ceilings. Delivery is best-effort: failures
//! are logged for operators, never surfaced to recipients.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::events::{EventBus, EventKind};
use crate::notify::{NotificationTarget, NotifyConfig};
use crate::transport::Transport;

/// Delivers notifications through the transport with bounded retries.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn Transport>,
    bus: Arc<EventBus>,
    config: NotifyConfig,
}

impl NotificationDispatcher {
    /// Create a dispatcher over `transport`.
    pub fn new(transport: Arc<dyn Transport>, bus: Arc<EventBus>, config: NotifyConfig) -> Self {
        Self {
            transport,
            bus,
            config,
        }
    }

    /// Returns the configuration for this dispatcher.
    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    /// Send one notification with bounded retries.
    ///
    /// Returns `true` on the first successful attempt. A failure matching a
    /// permanent signature aborts immediately; transient failures are retried
    /// up to `max_retries` total attempts.
    #[tracing::instrument(skip(self, message))]
    pub async fn send_notification(&self, user_id: &str, message: &str) -> bool {
        for attempt in 1..=self.config.max_retries {
            match self.transport.send_message(user_id, message, None).await {
                Ok(_) => {
                    if attempt > 1 {
                        debug!(user_id, attempt, "notification delivered after retry");
                    }
                    return true;
                }
                Err(e) if e.is_permanent() => {
                    warn!(
                        user_id,
                        attempt,
                        error = %e,
                        "recipient permanently unreachable, not retrying"
                    );
                    self.emit_failure(user_id, &e.message, "permanent", attempt);
                    return false;
                }
                Err(e) => {
                    warn!(
                        user_id,
                        attempt,
                        max_attempts = self.config.max_retries,
                        error = %e,
                        "notification attempt failed"
                    );
                    if attempt == self.config.max_retries {
                        self.emit_failure(user_id, &e.message, "transient", attempt);
                    }
                }
            }
        }
        warn!(
            user_id,
            attempts = self.config.max_retries,
            "notification failed after exhausting retries"
        );
        false
    }

    /// Send to many recipients in paced chunks.
    ///
    /// Recipients within a chunk are dispatched concurrently, each with the
    /// single-send retry logic; individual failures are logged, never raised.
    /// A pause separates consecutive chunks but never follows the last one.
    /// Empty input returns immediately without touching the transport.
    pub async fn send_batch_notifications(&self, targets: &[NotificationTarget]) {
        if targets.is_empty() {
            return;
        }

        let chunk_count = targets.len().div_ceil(self.config.chunk_size);
        let mut delivered = 0usize;
        let mut failed = 0usize;

        for (index, chunk) in targets.chunks(self.config.chunk_size).enumerate() {
            let results = join_all(
                chunk
                    .iter()
                    .map(|target| self.send_notification(&target.user_id, &target.message)),
            )
            .await;

            let chunk_delivered = results.iter().filter(|ok| **ok).count();
            delivered += chunk_delivered;
            failed += chunk.len() - chunk_delivered;
            debug!(
                chunk = index + 1,
                chunks = chunk_count,
                delivered = chunk_delivered,
                failed = chunk.len() - chunk_delivered,
                "notification chunk dispatched"
            );

            if index + 1 < chunk_count {
                tokio::time::sleep(self.config.chunk_pause).await;
            }
        }

        info!(
            total = targets.len(),
            delivered, failed, "bulk notification run finished"
        );
    }

    fn emit_failure(&self, user_id: &str, error: &str, classification: &str, attempts: u32) {
        self.bus.emit(
            EventKind::NotificationFailed,
            json!({
                "user_id": user_id,
                "error": error,
                "classification": classification,
                "attempts": attempts,
            }),
            "notify",
        );
    }
}
