//! Read-only projections of the alert store.

use std::sync::Arc;

use dispatch_shared::{Alert, AlertId, AlertStatus, Severity};
use parking_lot::Mutex;
use tokio::sync::watch;

use super::alerts::AlertStore;

pub type AlertPredicate = Arc<dyn Fn(&Alert) -> bool + Send + Sync>;

/// Display order: newest `reported_at` first, ties broken by id, newest first.
pub(crate) fn sort_for_display(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| {
        b.reported_at
            .cmp(&a.reported_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Declarative filter for the common console screens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    /// Allowed statuses; `None` allows all.
    pub statuses: Option<Vec<AlertStatus>>,
    pub min_severity: Option<Severity>,
}

impl AlertFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn statuses(statuses: &[AlertStatus]) -> Self {
        Self {
            statuses: Some(statuses.to_vec()),
            min_severity: None,
        }
    }

    /// The live alerts table: pending and responding.
    pub fn active() -> Self {
        Self::statuses(&[AlertStatus::Pending, AlertStatus::Responding])
    }

    /// The history table: resolved and cancelled.
    pub fn history() -> Self {
        Self::statuses(&[AlertStatus::Resolved, AlertStatus::Cancelled])
    }

    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&alert.status));
        let severity_ok = self.min_severity.map_or(true, |min| alert.severity >= min);
        status_ok && severity_ok
    }
}

/// A live, read-only, ordered view over the records matching a predicate.
///
/// The view holds no records of its own between reads: every read is
/// checked against the store revision and recomputed when anything changed,
/// so it always reflects every mutation applied so far. Callers get clones
/// and cannot write through a view.
pub struct AlertView {
    store: Arc<AlertStore>,
    predicate: AlertPredicate,
    cache: Mutex<Option<(u64, Arc<[Alert]>)>>,
}

impl AlertView {
    pub(crate) fn new(store: Arc<AlertStore>, predicate: AlertPredicate) -> Self {
        Self {
            store,
            predicate,
            cache: Mutex::new(None),
        }
    }

    /// Current matching alerts in display order.
    pub fn alerts(&self) -> Arc<[Alert]> {
        let revision = self.store.revision();
        let mut cache = self.cache.lock();
        if let Some((cached_at, alerts)) = cache.as_ref() {
            if *cached_at == revision {
                return alerts.clone();
            }
        }

        let predicate = &self.predicate;
        let (read_at, alerts) = self.store.collect(|alert| predicate(alert));
        let alerts: Arc<[Alert]> = alerts.into();
        *cache = Some((read_at, alerts.clone()));
        alerts
    }

    pub fn len(&self) -> usize {
        self.alerts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts().is_empty()
    }

    pub fn contains(&self, id: AlertId) -> bool {
        self.alerts().iter().any(|a| a.id == id)
    }

    pub fn ids(&self) -> Vec<AlertId> {
        self.alerts().iter().map(|a| a.id).collect()
    }

    /// Wakes whenever the underlying store changes.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }
}

impl std::fmt::Debug for AlertView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertView").finish_non_exhaustive()
    }
}
