//! Time/size-windowed request batcher.
//!
//! Calls issued within a short sampling window are coalesced into one
//! concurrently executed batch, reducing per-call overhead and keeping a
//! session's outbound work inside its execution-time budget. One batcher
//! instance serves one session; [`RequestBatcher::clear_queue`] is the scoped
//! teardown invoked at the end of the session's lifetime.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::batch::{BatchError, BatchOutcome, BatcherConfig};
use crate::events::{EventBus, EventKind};
use crate::transport::{ApiCall, Transport, TransportError};

/// A queued request waiting for the next drain.
struct Pending {
    call: ApiCall,
    tx: oneshot::Sender<Result<Value, BatchError>>,
    enqueued_at: Instant,
}

/// Coalesces API calls into time- or size-bounded batches.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct RequestBatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: BatcherConfig,
    transport: Arc<dyn Transport>,
    bus: Arc<EventBus>,
    queue: Mutex<VecDeque<Pending>>,
    /// Armed accumulation timer. Taken (and aborted) by immediate drains and
    /// queue teardown; taken without abort by the timer task itself.
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Single-flight guard: at most one drain per instance at a time.
    drain_lock: tokio::sync::Mutex<()>,
}

impl RequestBatcher {
    /// Create a batcher over `transport`.
    pub fn new(transport: Arc<dyn Transport>, bus: Arc<EventBus>, config: BatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                bus,
                queue: Mutex::new(VecDeque::new()),
                timer: Mutex::new(None),
                drain_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Enqueue `call` and wait for it to settle.
    ///
    /// The returned future is the sole completion signal: it resolves with
    /// the transport response once the batch containing this call has
    /// executed, or with [`BatchError::Timeout`] / [`BatchError::Cancelled`]
    /// when the call is timed out or the queue is cleared first.
    pub async fn batch_request(&self, call: ApiCall) -> Result<Value, BatchError> {
        let (tx, rx) = oneshot::channel();
        let full = {
            let mut queue = self.inner.queue.lock();
            queue.push_back(Pending {
                call,
                tx,
                enqueued_at: Instant::now(),
            });
            queue.len() >= self.inner.config.max_batch_size
        };

        if full {
            // A full batch drains immediately; the pending timer is obsolete.
            if let Some(timer) = self.inner.timer.lock().take() {
                timer.abort();
            }
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                Inner::drain(inner).await;
            });
        } else {
            Inner::arm_timer(&self.inner);
        }

        rx.await.unwrap_or(Err(BatchError::Cancelled))
    }

    /// Reject every not-yet-drained request with [`BatchError::Cancelled`]
    /// and empty the queue.
    ///
    /// Requests already extracted into a running drain are unaffected.
    pub fn clear_queue(&self) {
        if let Some(timer) = self.inner.timer.lock().take() {
            timer.abort();
        }
        let cancelled: Vec<Pending> = {
            let mut queue = self.inner.queue.lock();
            queue.drain(..).collect()
        };
        if cancelled.is_empty() {
            return;
        }
        debug!(cancelled = cancelled.len(), "batch queue cleared");
        for pending in cancelled {
            let _ = pending.tx.send(Err(BatchError::Cancelled));
        }
    }

    /// Number of requests waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }
}

impl Inner {
    /// Arm the accumulation timer unless one is already armed.
    fn arm_timer(inner: &Arc<Self>) {
        let mut timer = inner.timer.lock();
        if timer.is_some() {
            return;
        }
        let task_inner = Arc::clone(inner);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(task_inner.config.batch_interval).await;
            // Consume our own handle; aborting it here would cancel the
            // drain below.
            drop(task_inner.timer.lock().take());
            Self::drain(Arc::clone(&task_inner)).await;
        }));
    }

    /// Extract and execute batches until the queue is below a full batch,
    /// then re-arm the timer for any partial remainder.
    async fn drain(inner: Arc<Self>) {
        // Single-flight: a racing trigger is a no-op, the running drain
        // picks up whatever it enqueued.
        let Ok(_guard) = inner.drain_lock.try_lock() else {
            return;
        };

        loop {
            let batch: Vec<Pending> = {
                let mut queue = inner.queue.lock();
                let take = queue.len().min(inner.config.max_batch_size);
                queue.drain(..take).collect()
            };
            if batch.is_empty() {
                return;
            }

            let started = Instant::now();
            let size = batch.len();
            let results = futures::future::join_all(
                batch
                    .into_iter()
                    .map(|pending| Self::settle(Arc::clone(&inner), pending)),
            )
            .await;

            let succeeded = results.iter().filter(|ok| **ok).count();
            let outcome = BatchOutcome {
                size,
                duration: started.elapsed(),
                succeeded,
                failed: size - succeeded,
            };
            debug!(
                size = outcome.size,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                duration_ms = outcome.duration.as_millis() as u64,
                "batch drained"
            );
            inner.bus.emit(
                EventKind::BatchDrained,
                json!({
                    "size": outcome.size,
                    "succeeded": outcome.succeeded,
                    "failed": outcome.failed,
                    "duration_ms": outcome.duration.as_millis() as u64,
                }),
                "batcher",
            );

            let remaining = inner.queue.lock().len();
            if remaining >= inner.config.max_batch_size {
                continue;
            }
            if remaining > 0 {
                Self::arm_timer(&inner);
            }
            return;
        }
    }

    /// Execute one extracted request and settle its caller.
    ///
    /// The transport call runs in its own task so a timeout only abandons
    /// it; the call itself cannot be cancelled once started.
    async fn settle(inner: Arc<Self>, pending: Pending) -> bool {
        let method = pending.call.method();
        let queued_ms = pending.enqueued_at.elapsed().as_millis() as u64;

        let transport = Arc::clone(&inner.transport);
        let call = pending.call;
        let task = tokio::spawn(async move { execute(transport.as_ref(), call).await });

        let result = match tokio::time::timeout(inner.config.request_timeout, task).await {
            Ok(Ok(response)) => response.map_err(BatchError::Transport),
            Ok(Err(join_error)) => Err(BatchError::Transport(TransportError::transient(format!(
                "transport task failed: {join_error}"
            )))),
            Err(_) => {
                warn!(
                    method,
                    timeout_ms = inner.config.request_timeout.as_millis() as u64,
                    "batched request timed out, underlying call left running"
                );
                Err(BatchError::Timeout(inner.config.request_timeout))
            }
        };

        let ok = result.is_ok();
        if let Err(e) = &result {
            if !e.is_cancelled() {
                debug!(method, queued_ms, error = %e, "batched request failed");
            }
        }
        // The caller may have gone away; settlement is still complete.
        let _ = pending.tx.send(result);
        ok
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}

/// Map an [`ApiCall`] onto the transport surface.
async fn execute(transport: &dyn Transport, call: ApiCall) -> Result<Value, TransportError> {
    match call {
        ApiCall::SendMessage {
            target,
            text,
            options,
        } => {
            transport
                .send_message(&target, &text, options.as_ref())
                .await
        }
        ApiCall::EditMessage {
            target,
            message_id,
            text,
        } => transport.edit_message(&target, &message_id, &text).await,
        ApiCall::DeleteMessage { target, message_id } => {
            transport.delete_message(&target, &message_id).await
        }
        ApiCall::SendChatAction { target, action } => {
            transport.send_chat_action(&target, action).await
        }
    }
}
