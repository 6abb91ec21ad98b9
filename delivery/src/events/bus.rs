//! Process-wide typed publish/subscribe hub.
//!
//! Producers (rate limiter, batcher, dispatcher) report outcomes here so that
//! audit and monitoring collaborators can react without direct coupling.
//! Delivery is synchronous against a snapshot of the subscribers registered at
//! emit time; a failing handler is logged and never aborts delivery to the
//! remaining handlers or propagates to the emitter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::events::{Event, EventKind};

/// Handle returned by [`EventBus::on`] and [`EventBus::once`], used to
/// unsubscribe via [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// A registered handler for one event kind.
#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    once: bool,
    /// Set on first delivery for `once` registrations so racing emissions
    /// cannot fire the handler twice.
    fired: Arc<AtomicBool>,
    handler: Handler,
}

/// Typed publish/subscribe hub.
///
/// Owned state, no globals: every pipeline component receives an
/// `Arc<EventBus>` at construction.
pub struct EventBus {
    subscribers: RwLock<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a persistent handler for `kind`.
    ///
    /// Handlers for the same kind run in subscription order.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(kind, handler, false)
    }

    /// Register a handler that fires at most once, then removes itself.
    ///
    /// The returned id can be passed to [`EventBus::off`] before the handler
    /// fires to cancel it.
    pub fn once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(kind, handler, true)
    }

    /// Remove a handler by its subscription id.
    ///
    /// Returns `true` if a handler was removed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.write();
        let mut removed = false;
        for registrations in subs.values_mut() {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            removed |= registrations.len() != before;
        }
        removed
    }

    /// Deliver `payload` to every handler registered for `kind` at this
    /// moment.
    ///
    /// Handlers registered during delivery are not invoked for this emission.
    pub fn emit(&self, kind: EventKind, payload: serde_json::Value, source: &'static str) {
        let snapshot: Vec<Registration> = {
            let subs = self.subscribers.read();
            subs.get(&kind).cloned().unwrap_or_default()
        };
        if snapshot.is_empty() {
            return;
        }

        let event = Event::new(kind, payload, source);
        let mut fired_once = false;
        for registration in &snapshot {
            if registration.once && registration.fired.swap(true, Ordering::SeqCst) {
                continue;
            }
            fired_once |= registration.once;
            if let Err(e) = (registration.handler)(&event) {
                warn!(kind = %kind, source, error = %e, "event handler failed");
            }
        }

        if fired_once {
            let mut subs = self.subscribers.write();
            if let Some(registrations) = subs.get_mut(&kind) {
                registrations.retain(|r| !(r.once && r.fired.load(Ordering::SeqCst)));
            }
        }
    }

    /// Number of handlers currently registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .get(&kind)
            .map_or(0, std::vec::Vec::len)
    }

    fn register<F>(&self, kind: EventKind, handler: F, once: bool) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Registration {
            id,
            once,
            fired: Arc::new(AtomicBool::new(false)),
            handler: Arc::new(handler),
        };
        self.subscribers
            .write()
            .entry(kind)
            .or_default()
            .push(registration);
        id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter_handler(
        counter: &Arc<AtomicUsize>,
    ) -> impl Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_emit_delivers_to_all_subscribers() {
        let bus = EventBus::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        bus.on(EventKind::BatchDrained, counter_handler(&first));
        bus.on(EventKind::BatchDrained, counter_handler(&second));

        bus.emit(EventKind::BatchDrained, serde_json::json!({}), "test");

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emit_ignores_other_kinds() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.on(EventKind::RateLimitReset, counter_handler(&counter));

        bus.emit(EventKind::BatchDrained, serde_json::json!({}), "test");

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for label in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            bus.on(EventKind::BatchDrained, move |_| {
                order.lock().push(label);
                Ok(())
            });
        }

        bus.emit(EventKind::BatchDrained, serde_json::json!({}), "test");

        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.once(EventKind::NotificationFailed, counter_handler(&counter));

        bus.emit(EventKind::NotificationFailed, serde_json::json!({}), "test");
        bus.emit(EventKind::NotificationFailed, serde_json::json!({}), "test");
        bus.emit(EventKind::NotificationFailed, serde_json::json!({}), "test");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(EventKind::NotificationFailed), 0);
    }

    #[test]
    fn test_off_before_emission_prevents_delivery() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = bus.once(EventKind::RateLimitExceeded, counter_handler(&counter));

        assert!(bus.off(id));
        bus.emit(EventKind::RateLimitExceeded, serde_json::json!({}), "test");

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!bus.off(id));
    }

    #[test]
    fn test_failing_handler_does_not_stop_later_handlers() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.on(EventKind::BatchDrained, |_| {
            anyhow::bail!("handler exploded")
        });
        bus.on(EventKind::BatchDrained, counter_handler(&counter));

        bus.emit(EventKind::BatchDrained, serde_json::json!({}), "test");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_registered_during_delivery_waits_for_next_emission() {
        let bus = Arc::new(EventBus::new());
        let late = Arc::new(AtomicUsize::new(0));
        {
            let bus_ref = Arc::clone(&bus);
            let late = Arc::clone(&late);
            bus.on(EventKind::BatchDrained, move |_| {
                bus_ref.on(EventKind::BatchDrained, counter_handler(&late));
                Ok(())
            });
        }

        bus.emit(EventKind::BatchDrained, serde_json::json!({}), "test");
        assert_eq!(late.load(Ordering::SeqCst), 0);

        bus.emit(EventKind::BatchDrained, serde_json::json!({}), "test");
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_carries_payload_and_source() {
        let bus = EventBus::new();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            bus.on(EventKind::RateLimitExceeded, move |event| {
                *seen.lock() = Some((event.payload.clone(), event.source));
                Ok(())
            });
        }

        bus.emit(
            EventKind::RateLimitExceeded,
            serde_json::json!({"key": "telegram_42"}),
            "ratelimit",
        );

        let seen = seen.lock();
        let (payload, source) = seen.as_ref().unwrap();
        assert_eq!(payload["key"], "telegram_42");
        assert_eq!(*source, "ratelimit");
    }
}
