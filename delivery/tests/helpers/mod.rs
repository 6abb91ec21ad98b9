//! Reusable test helpers for delivery pipeline integration tests.
//!
//! Provides [`MockTransport`] with scripted failures, hang simulation, and
//! call recording, plus short-window configs for fast tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_delivery::batch::BatcherConfig;
use courier_delivery::transport::{ChatAction, Transport, TransportError};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Scripted response for one send: call index and target decide the result.
pub type SendScript = dyn Fn(usize, &str) -> Result<Value, TransportError> + Send + Sync;

/// Transport double that records every call.
///
/// `send_message` consults the script; all other methods succeed. Targets in
/// the hang set never complete, simulating a stuck upstream call.
pub struct MockTransport {
    calls: Mutex<Vec<String>>,
    sends: AtomicUsize,
    script: Box<SendScript>,
    hang_targets: Mutex<HashSet<String>>,
}

impl MockTransport {
    /// Transport where every send succeeds.
    pub fn ok() -> Arc<Self> {
        Self::scripted(|_, _| Ok(json!({ "ok": true })))
    }

    /// Transport where every send fails with `message` (unclassified).
    pub fn failing_with(message: &str) -> Arc<Self> {
        let message = message.to_string();
        Self::scripted(move |_, _| Err(TransportError::api(message.clone())))
    }

    /// Transport driven by a per-call script.
    pub fn scripted<F>(script: F) -> Arc<Self>
    where
        F: Fn(usize, &str) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            sends: AtomicUsize::new(0),
            script: Box::new(script),
            hang_targets: Mutex::new(HashSet::new()),
        })
    }

    /// Make sends to `target` hang forever.
    pub fn hang_on(&self, target: &str) {
        self.hang_targets.lock().insert(target.to_string());
    }

    /// Total `send_message` calls so far.
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Recorded calls as `"method:target"` strings, in execution order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, method: &str, target: &str) {
        self.calls.lock().push(format!("{method}:{target}"));
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_message(
        &self,
        target: &str,
        _text: &str,
        _options: Option<&Value>,
    ) -> Result<Value, TransportError> {
        self.record("send_message", target);
        let index = self.sends.fetch_add(1, Ordering::SeqCst);
        if self.hang_targets.lock().contains(target) {
            futures::future::pending::<()>().await;
        }
        (self.script)(index, target)
    }

    async fn edit_message(
        &self,
        target: &str,
        _message_id: &str,
        _text: &str,
    ) -> Result<Value, TransportError> {
        self.record("edit_message", target);
        Ok(json!({ "ok": true }))
    }

    async fn delete_message(
        &self,
        target: &str,
        _message_id: &str,
    ) -> Result<Value, TransportError> {
        self.record("delete_message", target);
        Ok(json!({ "ok": true }))
    }

    async fn send_chat_action(
        &self,
        target: &str,
        _action: ChatAction,
    ) -> Result<Value, TransportError> {
        self.record("send_chat_action", target);
        Ok(json!({ "ok": true }))
    }
}

/// Batcher config with a long interval, for tests that trigger drains by
/// filling the queue or clearing it.
pub fn slow_batcher(max_batch_size: usize) -> BatcherConfig {
    BatcherConfig {
        max_batch_size,
        batch_interval: Duration::from_secs(60),
        request_timeout: Duration::from_secs(5),
    }
}

/// A send-message call for test enqueues.
pub fn send_call(target: &str) -> courier_delivery::transport::ApiCall {
    courier_delivery::transport::ApiCall::SendMessage {
        target: target.to_string(),
        text: "hello".to_string(),
        options: None,
    }
}
