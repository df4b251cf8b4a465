//! Wiring between the event channel and the alert store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dispatch_shared::{AlertEvent, ConnectInfo, ALERT_EVENTS, EVENT_CONNECT};

use crate::coordinator::MutationCoordinator;
use crate::stores::AlertStore;
use crate::ws::{EventRegistry, Subscription};

/// Counters for what the sync has seen; useful in logs and tests.
#[derive(Debug, Default)]
pub struct SyncStats {
    applied: AtomicU64,
    malformed: AtomicU64,
    resyncs: AtomicU64,
}

impl SyncStats {
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Resynchronizations started after a reconnect.
    pub fn resyncs(&self) -> u64 {
        self.resyncs.load(Ordering::Relaxed)
    }
}

/// Keeps the store subscribed to the alert push events.
///
/// Every alert event is decoded and handed to [`AlertStore::apply`]. When a
/// coordinator is supplied, a `connect` that follows a lost connection
/// triggers a full refresh to cover whatever was missed while offline.
/// Dropping the sync unsubscribes all of its handlers.
pub struct AlertSync {
    subscriptions: Vec<Subscription>,
    stats: Arc<SyncStats>,
}

impl AlertSync {
    pub fn attach(
        registry: &EventRegistry,
        store: Arc<AlertStore>,
        coordinator: Option<MutationCoordinator>,
    ) -> Self {
        let stats = Arc::new(SyncStats::default());
        let mut subscriptions = Vec::with_capacity(ALERT_EVENTS.len() + 1);

        for event in ALERT_EVENTS {
            let store = store.clone();
            let stats = stats.clone();
            let handler = EventRegistry::handler(move |payload| {
                match AlertEvent::decode(event, payload) {
                    Ok(decoded) => {
                        tracing::debug!(event, alert_id = %decoded.id(), "applying push event");
                        store.apply(decoded);
                        stats.applied.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::warn!(event, error = %e, "dropping malformed push event");
                        stats.malformed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
            subscriptions.push(registry.on(event, &handler));
        }

        if let Some(coordinator) = coordinator {
            let stats = stats.clone();
            let handler = EventRegistry::handler(move |payload| {
                let reconnect = serde_json::from_value::<ConnectInfo>(payload.clone())
                    .map(|info| info.reconnect)
                    .unwrap_or(false);
                if !reconnect {
                    return;
                }
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    tracing::warn!("no async runtime; skipping resync after reconnect");
                    return;
                };
                stats.resyncs.fetch_add(1, Ordering::Relaxed);
                let coordinator = coordinator.clone();
                runtime.spawn(async move {
                    tracing::info!("reconnected, resynchronizing alerts");
                    if let Err(e) = coordinator.refresh().await {
                        tracing::warn!(error = %e, "resync after reconnect failed");
                    }
                });
            });
            subscriptions.push(registry.on(EVENT_CONNECT, &handler));
        }

        Self {
            subscriptions,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    pub fn is_attached(&self) -> bool {
        self.subscriptions.iter().any(Subscription::is_active)
    }

    /// Unsubscribe every handler. Safe to call more than once.
    pub fn detach(&mut self) {
        for subscription in &mut self.subscriptions {
            subscription.cancel();
        }
    }
}

impl std::fmt::Debug for AlertSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertSync")
            .field("subscriptions", &self.subscriptions.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_shared::{AlertId, AlertStatus, EVENT_ALERT_DELETED, EVENT_ALERT_NEW};
    use serde_json::json;

    fn payload(id: u64, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Structure fire",
            "location": "Tondo",
            "alert_type": "fire",
            "severity": "high",
            "status": status,
            "reported_at": "2024-05-01T09:30:00Z"
        })
    }

    #[test]
    fn test_push_events_reach_store() {
        let registry = EventRegistry::new();
        let store = Arc::new(AlertStore::new());
        let sync = AlertSync::attach(&registry, store.clone(), None);

        registry.emit(EVENT_ALERT_NEW, &payload(4, "pending"));
        registry.emit("alert:status_updated", &json!({ "id": 4, "status": "responding" }));
        assert_eq!(store.get(AlertId(4)).unwrap().status, AlertStatus::Responding);

        registry.emit(EVENT_ALERT_DELETED, &json!({ "id": "4" }));
        assert!(store.is_empty());
        assert_eq!(sync.stats().applied(), 3);
    }

    #[test]
    fn test_malformed_events_are_counted_and_dropped() {
        let registry = EventRegistry::new();
        let store = Arc::new(AlertStore::new());
        let sync = AlertSync::attach(&registry, store.clone(), None);

        registry.emit(EVENT_ALERT_NEW, &json!({ "title": "missing id" }));
        registry.emit(EVENT_ALERT_NEW, &payload(1, "on_fire"));
        registry.emit(EVENT_ALERT_DELETED, &json!({ "id": "abc" }));

        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
        assert_eq!(sync.stats().malformed(), 3);
    }

    #[test]
    fn test_detach_unsubscribes_everything() {
        let registry = EventRegistry::new();
        let store = Arc::new(AlertStore::new());
        let mut sync = AlertSync::attach(&registry, store.clone(), None);
        assert!(sync.is_attached());

        sync.detach();
        sync.detach();
        assert!(!sync.is_attached());
        for event in ALERT_EVENTS {
            assert_eq!(registry.handler_count(event), 0);
        }

        registry.emit(EVENT_ALERT_NEW, &payload(1, "pending"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = EventRegistry::new();
        let sync = AlertSync::attach(&registry, Arc::new(AlertStore::new()), None);
        assert_eq!(registry.handler_count(EVENT_ALERT_NEW), 1);
        drop(sync);
        assert_eq!(registry.handler_count(EVENT_ALERT_NEW), 0);
    }
}
