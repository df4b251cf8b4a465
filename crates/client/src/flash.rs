//! Transient "new incident" signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dispatch_shared::{Alert, AlertEvent, EVENT_ALERT_NEW};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::ws::{EventRegistry, Subscription};

pub const DEFAULT_FLASH_DURATION: Duration = Duration::from_secs(5);

/// The alert currently being flashed.
#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub alert: Alert,
    pub raised_at: Instant,
    /// Increases with every flash raised by the same notifier.
    pub sequence: u64,
}

struct Inner {
    duration: Duration,
    slot: watch::Sender<Option<Flash>>,
    sequence: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    /// Clear the slot only if it still holds flash `sequence`.
    fn expire(&self, sequence: u64) -> bool {
        self.slot.send_if_modified(|slot| match slot {
            Some(flash) if flash.sequence == sequence => {
                *slot = None;
                true
            }
            _ => false,
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}

/// Single-slot, self-clearing notifier. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct FlashNotifier {
    inner: Arc<Inner>,
}

impl FlashNotifier {
    pub fn new(duration: Duration) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                duration,
                slot,
                sequence: AtomicU64::new(0),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    /// Show `alert`, replacing whatever is showing now, and schedule it to
    /// clear after the configured duration.
    pub fn notify(&self, alert: Alert) {
        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(alert_id = %alert.id, sequence, "raising flash");
        self.inner.slot.send_replace(Some(Flash {
            alert,
            raised_at: Instant::now(),
            sequence,
        }));

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("no async runtime; flash will stay until dismissed");
                return;
            }
        };
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let duration = self.inner.duration;
        let timer = handle.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                if inner.expire(sequence) {
                    tracing::debug!(sequence, "flash expired");
                }
            }
        });
        if let Some(previous) = self.inner.timer.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Clear the current flash. A no-op when nothing is showing.
    pub fn dismiss(&self) {
        let cleared = self.inner.slot.send_if_modified(|slot| slot.take().is_some());
        if cleared {
            if let Some(timer) = self.inner.timer.lock().take() {
                timer.abort();
            }
        }
    }

    pub fn current(&self) -> Option<Flash> {
        self.inner.slot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Flash>> {
        self.inner.slot.subscribe()
    }

    /// Raise a flash for every `alert:new` delivered through `registry`.
    pub fn attach(&self, registry: &EventRegistry) -> Subscription {
        let notifier = self.clone();
        let handler = EventRegistry::handler(move |payload| {
            match AlertEvent::decode(EVENT_ALERT_NEW, payload) {
                Ok(AlertEvent::New(alert)) => notifier.notify(alert),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "not flashing malformed alert"),
            }
        });
        registry.on(EVENT_ALERT_NEW, &handler)
    }
}

impl Default for FlashNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH_DURATION)
    }
}

impl std::fmt::Debug for FlashNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashNotifier")
            .field("duration", &self.inner.duration)
            .field("current", &self.current().map(|flash| flash.alert.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dispatch_shared::{AlertId, AlertStatus, AlertType, Severity};
    use serde_json::json;

    fn alert(id: u64) -> Alert {
        Alert {
            id: AlertId(id),
            title: "Cardiac arrest".to_string(),
            description: None,
            location: "Ayala Ave".to_string(),
            latitude: None,
            longitude: None,
            alert_type: AlertType::Medical,
            severity: Severity::Critical,
            status: AlertStatus::Pending,
            reported_at: Utc::now(),
            assigned_vehicle: None,
            assigned_responder: None,
            image_url: None,
        }
    }

    fn showing(notifier: &FlashNotifier) -> Option<AlertId> {
        notifier.current().map(|f| f.alert.id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_flash_clears_after_duration() {
        let notifier = FlashNotifier::default();
        notifier.notify(alert(1));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(showing(&notifier), Some(AlertId(1)));

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(showing(&notifier), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_flash_keeps_full_duration() {
        let notifier = FlashNotifier::new(Duration::from_secs(5));
        notifier.notify(alert(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        notifier.notify(alert(2));

        // The first flash's deadline passes without touching the second.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(showing(&notifier), Some(AlertId(2)));

        tokio::time::sleep(Duration::from_millis(2001)).await;
        assert_eq!(showing(&notifier), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_is_idempotent() {
        let notifier = FlashNotifier::default();
        let mut rx = notifier.subscribe();
        notifier.notify(alert(1));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        notifier.dismiss();
        notifier.dismiss();
        assert_eq!(showing(&notifier), None);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_flashes_only_new_alerts() {
        let registry = EventRegistry::new();
        let notifier = FlashNotifier::default();
        let mut sub = notifier.attach(&registry);

        registry.emit("alert:updated", &serde_json::to_value(alert(1)).unwrap());
        assert_eq!(showing(&notifier), None);

        registry.emit(EVENT_ALERT_NEW, &json!({ "title": "no id" }));
        assert_eq!(showing(&notifier), None);

        registry.emit(EVENT_ALERT_NEW, &serde_json::to_value(alert(2)).unwrap());
        assert_eq!(showing(&notifier), Some(AlertId(2)));
        assert_eq!(notifier.current().unwrap().sequence, 1);

        sub.cancel();
        notifier.dismiss();
        registry.emit(EVENT_ALERT_NEW, &serde_json::to_value(alert(3)).unwrap());
        assert_eq!(showing(&notifier), None);
    }

    #[test]
    fn test_notify_without_runtime_stays_until_dismissed() {
        let notifier = FlashNotifier::default();
        notifier.notify(alert(1));
        assert_eq!(showing(&notifier), Some(AlertId(1)));
        notifier.dismiss();
        assert_eq!(showing(&notifier), None);
    }
}
