//! The canonical alert store.
//!
//! This store is the single source of truth for every alert the console
//! knows about. The bulk fetch, push events and mutation responses all write
//! through the same four entry points (`load`, `upsert`, `patch`, `remove`);
//! presentation code only ever reads, through [`AlertView`]s.
//!
//! # Ordering model
//!
//! The transport gives no ordering guarantees and the server sends no
//! sequence numbers. Writes are applied in delivery order (last write wins)
//! with one exception: a record whose status is terminal never goes back to
//! a non-terminal status. A late `alert:assigned` echo for a resolved
//! incident therefore updates the assignment but leaves it resolved.
//!
//! # Bulk loads
//!
//! A bulk fetch races with push events. [`AlertStore::mark`] is taken when
//! the fetch is issued and [`AlertStore::load_marked`] applies the snapshot
//! relative to it: ids written or removed after the mark keep their newer
//! state, and ids that were present before the mark but are missing from the
//! snapshot are pruned. Removals are remembered only while some mark is
//! still open. [`AlertStore::load`] has no mark to compare against, so it
//! merges the snapshot record by record and never prunes.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Weak};

use dispatch_shared::{Alert, AlertEvent, AlertId, AlertPatch, AlertStatus, Severity};
use parking_lot::RwLock;
use tokio::sync::watch;

use super::views::{sort_for_display, AlertFilter, AlertView};

/// A canonical alert plus the logical time it was last written.
struct Record {
    alert: Alert,
    touched: u64,
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<AlertId, Record>,
    /// Logical time of removals, so a snapshot taken before a delete cannot resurrect the record.
    /// Only kept while a mark is open.
    tombstones: HashMap<AlertId, u64>,
    /// Clock values of open marks, with how many marks were taken at each.
    open_marks: BTreeMap<u64, usize>,
    /// Advances on every write, whether or not it changed anything.
    clock: u64,
    /// Advances only when the visible contents change.
    revision: u64,
}

impl StoreInner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn upsert(&mut self, incoming: Alert) -> UpsertOutcome {
        let now = self.tick();
        match self.records.get_mut(&incoming.id) {
            None => {
                self.records.insert(
                    incoming.id,
                    Record {
                        alert: incoming,
                        touched: now,
                    },
                );
                self.revision += 1;
                UpsertOutcome::Inserted
            }
            Some(record) => {
                record.touched = now;
                let (merged, guarded) = merge_full(&record.alert, incoming);
                if merged == record.alert {
                    return UpsertOutcome::Unchanged;
                }
                record.alert = merged;
                self.revision += 1;
                if guarded {
                    UpsertOutcome::KeptTerminalStatus
                } else {
                    UpsertOutcome::Replaced
                }
            }
        }
    }

    fn remove(&mut self, id: AlertId) -> Option<Alert> {
        let now = self.tick();
        if !self.open_marks.is_empty() {
            self.tombstones.insert(id, now);
        }
        let removed = self.records.remove(&id).map(|r| r.alert);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    fn open_mark(&mut self) -> u64 {
        *self.open_marks.entry(self.clock).or_default() += 1;
        self.clock
    }

    fn close_mark(&mut self, at: u64) {
        if let Entry::Occupied(mut entry) = self.open_marks.entry(at) {
            *entry.get_mut() -= 1;
            if *entry.get() == 0 {
                entry.remove();
            }
        }
        // A tombstone matters only to marks taken before it.
        match self.open_marks.keys().next().copied() {
            Some(oldest) => self.tombstones.retain(|_, &mut t| t > oldest),
            None => self.tombstones.clear(),
        }
    }
}

/// Replace `existing` with `incoming`, keeping a terminal status against a
/// non-terminal one. Returns the merged record and whether the guard fired.
fn merge_full(existing: &Alert, mut incoming: Alert) -> (Alert, bool) {
    let guarded = existing.status.is_terminal() && !incoming.status.is_terminal();
    if guarded {
        incoming.status = existing.status;
    }
    (incoming, guarded)
}

/// Result of [`AlertStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Replaced, but the incoming non-terminal status was ignored.
    KeptTerminalStatus,
    /// The incoming record was identical to the stored one.
    Unchanged,
}

/// Result of [`AlertStore::patch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// Applied, but the patched non-terminal status was ignored.
    KeptTerminalStatus,
    Unchanged,
    /// No record with that id; the patch was discarded.
    UnknownId,
}

/// Logical time captured when a bulk fetch is issued.
///
/// The store remembers removals for as long as a mark is alive. Pass it to
/// [`AlertStore::load_marked`] when the snapshot arrives, or drop it if the
/// fetch failed.
#[derive(Debug)]
#[must_use = "a mark keeps removal history until it is loaded or dropped"]
pub struct LoadMark {
    at: u64,
    inner: Weak<RwLock<StoreInner>>,
}

impl LoadMark {
    fn consume(mut self) -> u64 {
        self.inner = Weak::new();
        self.at
    }
}

impl Drop for LoadMark {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.write().close_mark(self.at);
        }
    }
}

/// What a bulk load did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Snapshot records merged through `upsert`.
    pub merged: usize,
    /// Snapshot records skipped because the store saw newer state after the mark.
    pub skipped_newer: usize,
    /// Snapshot records skipped because they were deleted after the mark.
    pub skipped_removed: usize,
    /// Stored records dropped because the snapshot no longer contains them.
    pub pruned: usize,
}

/// Dashboard counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertSummary {
    pub total: usize,
    pub active: usize,
    pub by_status: HashMap<AlertStatus, usize>,
    pub by_severity: HashMap<Severity, usize>,
    /// Critical alerts that are still pending or responding.
    pub critical_active: usize,
}

impl AlertSummary {
    pub fn status_count(&self, status: AlertStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    pub fn severity_count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// The canonical, deduplicated collection of alerts.
pub struct AlertStore {
    inner: Arc<RwLock<StoreInner>>,
    changes: watch::Sender<u64>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            changes,
        }
    }

    /// Receiver of the store revision; it changes after every mutation that
    /// altered the contents.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    fn publish(&self, before: u64, after: u64) {
        if after != before {
            self.changes.send_replace(after);
        }
    }

    /// Capture the current logical time before issuing a bulk fetch.
    pub fn mark(&self) -> LoadMark {
        LoadMark {
            at: self.inner.write().open_mark(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Merge a snapshot record by record through [`upsert`](Self::upsert).
    ///
    /// Without a mark there is no telling which stored records are older
    /// than the fetch, so nothing is pruned. Use [`load_marked`](Self::load_marked)
    /// for a full resynchronization.
    pub fn load(&self, snapshot: Vec<Alert>) -> LoadReport {
        let mut report = LoadReport::default();
        let (before, after) = {
            let mut inner = self.inner.write();
            let before = inner.revision;
            let mut seen = HashSet::with_capacity(snapshot.len());
            for alert in snapshot {
                if !seen.insert(alert.id) {
                    tracing::warn!(alert_id = %alert.id, "ignoring duplicate id in snapshot");
                    continue;
                }
                inner.upsert(alert);
                report.merged += 1;
            }
            (before, inner.revision)
        };
        self.publish(before, after);

        tracing::debug!(merged = report.merged, "snapshot merged");
        report
    }

    /// Apply a snapshot whose fetch was issued at `mark`.
    pub fn load_marked(&self, mark: LoadMark, snapshot: Vec<Alert>) -> LoadReport {
        let mark = mark.consume();
        let mut report = LoadReport::default();
        let (before, after) = {
            let mut inner = self.inner.write();
            let before = inner.revision;
            let mut seen = HashSet::with_capacity(snapshot.len());

            for alert in snapshot {
                let id = alert.id;
                if !seen.insert(id) {
                    tracing::warn!(alert_id = %id, "ignoring duplicate id in snapshot");
                    continue;
                }
                if inner.tombstones.get(&id).is_some_and(|&t| t > mark) {
                    report.skipped_removed += 1;
                    continue;
                }
                if inner.records.get(&id).is_some_and(|r| r.touched > mark) {
                    report.skipped_newer += 1;
                    continue;
                }
                inner.upsert(alert);
                report.merged += 1;
            }

            let stale: Vec<AlertId> = inner
                .records
                .iter()
                .filter(|(id, record)| record.touched <= mark && !seen.contains(*id))
                .map(|(id, _)| *id)
                .collect();
            for id in stale {
                inner.remove(id);
                report.pruned += 1;
            }

            inner.close_mark(mark);

            (before, inner.revision)
        };
        self.publish(before, after);

        tracing::debug!(
            merged = report.merged,
            skipped_newer = report.skipped_newer,
            skipped_removed = report.skipped_removed,
            pruned = report.pruned,
            "snapshot loaded"
        );
        report
    }

    /// Reconcile a full record into the store.
    pub fn upsert(&self, alert: Alert) -> UpsertOutcome {
        let id = alert.id;
        let (outcome, before, after) = {
            let mut inner = self.inner.write();
            let before = inner.revision;
            let outcome = inner.upsert(alert);
            (outcome, before, inner.revision)
        };
        self.publish(before, after);

        if outcome == UpsertOutcome::KeptTerminalStatus {
            tracing::info!(alert_id = %id, "ignored stale non-terminal status for closed alert");
        }
        outcome
    }

    /// Shallow-merge the present fields of `patch` into an existing record.
    pub fn patch(&self, id: AlertId, patch: &AlertPatch) -> PatchOutcome {
        let (outcome, before, after) = {
            let mut inner = self.inner.write();
            let before = inner.revision;
            let now = inner.tick();

            let outcome = match inner.records.get_mut(&id) {
                None => PatchOutcome::UnknownId,
                Some(record) => {
                    record.touched = now;
                    let mut updated = record.alert.clone();
                    patch.apply_to(&mut updated);

                    let guarded = record.alert.status.is_terminal() && !updated.status.is_terminal();
                    if guarded {
                        updated.status = record.alert.status;
                    }

                    if updated == record.alert {
                        PatchOutcome::Unchanged
                    } else {
                        record.alert = updated;
                        if guarded {
                            PatchOutcome::KeptTerminalStatus
                        } else {
                            PatchOutcome::Applied
                        }
                    }
                }
            };
            if matches!(outcome, PatchOutcome::Applied | PatchOutcome::KeptTerminalStatus) {
                inner.revision += 1;
            }
            (outcome, before, inner.revision)
        };
        self.publish(before, after);

        match outcome {
            PatchOutcome::UnknownId => {
                tracing::debug!(alert_id = %id, "discarding patch for unknown alert")
            }
            PatchOutcome::KeptTerminalStatus => {
                tracing::info!(alert_id = %id, "ignored stale non-terminal status for closed alert")
            }
            _ => {}
        }
        outcome
    }

    /// Remove a record. Removing an unknown id is a no-op.
    pub fn remove(&self, id: AlertId) -> Option<Alert> {
        let (removed, before, after) = {
            let mut inner = self.inner.write();
            let before = inner.revision;
            let removed = inner.remove(id);
            (removed, before, inner.revision)
        };
        self.publish(before, after);
        removed
    }

    /// Route a decoded push event to its entry point.
    pub fn apply(&self, event: AlertEvent) {
        match event {
            AlertEvent::New(alert) | AlertEvent::Updated(alert) | AlertEvent::Assigned(alert) => {
                self.upsert(alert);
            }
            AlertEvent::StatusUpdated { id, patch } => {
                self.patch(id, &patch);
            }
            AlertEvent::Deleted(id) => {
                self.remove(id);
            }
        }
    }

    pub fn get(&self, id: AlertId) -> Option<Alert> {
        self.inner.read().records.get(&id).map(|r| r.alert.clone())
    }

    pub fn contains(&self, id: AlertId) -> bool {
        self.inner.read().records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Every alert, newest first.
    pub fn all(&self) -> Vec<Alert> {
        self.collect(|_| true).1
    }

    /// Matching alerts in display order, with the revision they were read at.
    pub(crate) fn collect(&self, predicate: impl Fn(&Alert) -> bool) -> (u64, Vec<Alert>) {
        let inner = self.inner.read();
        let mut alerts: Vec<Alert> = inner
            .records
            .values()
            .map(|r| &r.alert)
            .filter(|&a| predicate(a))
            .cloned()
            .collect();
        sort_for_display(&mut alerts);
        (inner.revision, alerts)
    }

    /// A live, read-only view of the alerts matching `predicate`.
    pub fn select(
        self: &Arc<Self>,
        predicate: impl Fn(&Alert) -> bool + Send + Sync + 'static,
    ) -> AlertView {
        AlertView::new(self.clone(), Arc::new(predicate))
    }

    pub fn select_filter(self: &Arc<Self>, filter: AlertFilter) -> AlertView {
        self.select(move |alert| filter.matches(alert))
    }

    pub fn summary(&self) -> AlertSummary {
        let inner = self.inner.read();
        let mut summary = AlertSummary {
            total: inner.records.len(),
            ..AlertSummary::default()
        };
        for alert in inner.records.values().map(|r| &r.alert) {
            *summary.by_status.entry(alert.status).or_default() += 1;
            *summary.by_severity.entry(alert.severity).or_default() += 1;
            if alert.is_active() {
                summary.active += 1;
                if alert.severity == Severity::Critical {
                    summary.critical_active += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dispatch_shared::{AlertType, ResponderRef, VehicleRef};

    fn alert(id: u64, status: AlertStatus) -> Alert {
        Alert {
            id: AlertId(id),
            title: format!("Incident {id}"),
            description: None,
            location: "Quezon Ave".to_string(),
            latitude: Some(14.6),
            longitude: Some(121.0),
            alert_type: AlertType::Accident,
            severity: Severity::High,
            status,
            reported_at: Utc.with_ymd_and_hms(2024, 1, 14, 14, id as u32 % 60, 0).unwrap(),
            assigned_vehicle: None,
            assigned_responder: None,
            image_url: None,
        }
    }

    fn assigned(mut a: Alert) -> Alert {
        a.assigned_vehicle = Some(VehicleRef {
            id: 4,
            plate_number: Some("AMB-104".to_string()),
            vehicle_type: Some("ambulance".to_string()),
        });
        a.assigned_responder = Some(ResponderRef {
            id: 11,
            name: Some("Ana Reyes".to_string()),
            phone: None,
        });
        a
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = AlertStore::new();
        assert_eq!(store.upsert(alert(1, AlertStatus::Pending)), UpsertOutcome::Inserted);
        let revision = store.revision();

        assert_eq!(store.upsert(alert(1, AlertStatus::Pending)), UpsertOutcome::Unchanged);
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), revision);
        assert_eq!(store.get(AlertId(1)), Some(alert(1, AlertStatus::Pending)));
    }

    #[test]
    fn test_upsert_replaces_wholesale() {
        let store = AlertStore::new();
        store.upsert(assigned(alert(1, AlertStatus::Pending)));

        let mut update = alert(1, AlertStatus::Responding);
        update.title = "Multi-vehicle collision".to_string();
        assert_eq!(store.upsert(update.clone()), UpsertOutcome::Replaced);
        assert_eq!(store.get(AlertId(1)), Some(update));
    }

    #[test]
    fn test_terminal_status_guard_on_upsert() {
        let store = AlertStore::new();
        store.upsert(alert(1, AlertStatus::Resolved));

        let late_echo = assigned(alert(1, AlertStatus::Pending));
        assert_eq!(store.upsert(late_echo), UpsertOutcome::KeptTerminalStatus);

        let stored = store.get(AlertId(1)).unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert_eq!(stored.assigned_vehicle.map(|v| v.id), Some(4));
        assert_eq!(stored.assigned_responder.map(|r| r.id), Some(11));
    }

    #[test]
    fn test_terminal_to_terminal_is_last_write_wins() {
        let store = AlertStore::new();
        store.upsert(alert(1, AlertStatus::Resolved));
        store.upsert(alert(1, AlertStatus::Cancelled));
        assert_eq!(store.get(AlertId(1)).unwrap().status, AlertStatus::Cancelled);
    }

    #[test]
    fn test_patch_keeps_assignment() {
        let store = AlertStore::new();
        store.upsert(assigned(alert(1, AlertStatus::Pending)));

        let outcome = store.patch(AlertId(1), &AlertPatch::status(AlertStatus::Responding));
        assert_eq!(outcome, PatchOutcome::Applied);

        let stored = store.get(AlertId(1)).unwrap();
        assert_eq!(stored.status, AlertStatus::Responding);
        assert!(stored.assigned_vehicle.is_some());
        assert!(stored.assigned_responder.is_some());
        assert_eq!(stored.severity, Severity::High);
    }

    #[test]
    fn test_patch_guard_on_closed_alert() {
        let store = AlertStore::new();
        store.upsert(alert(1, AlertStatus::Cancelled));
        let patch = AlertPatch {
            status: Some(AlertStatus::Responding),
            severity: Some(Severity::Critical),
            ..AlertPatch::default()
        };
        assert_eq!(store.patch(AlertId(1), &patch), PatchOutcome::KeptTerminalStatus);

        let stored = store.get(AlertId(1)).unwrap();
        assert_eq!(stored.status, AlertStatus::Cancelled);
        assert_eq!(stored.severity, Severity::Critical);
    }

    #[test]
    fn test_unknown_id_operations_are_noops() {
        let store = AlertStore::new();
        store.upsert(alert(1, AlertStatus::Pending));
        let revision = store.revision();

        assert_eq!(
            store.patch(AlertId(99), &AlertPatch::status(AlertStatus::Resolved)),
            PatchOutcome::UnknownId
        );
        assert_eq!(store.remove(AlertId(99)), None);
        assert_eq!(store.len(), 1);
        assert!(!store.contains(AlertId(99)));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_terminal_status_does_not_remove() {
        let store = AlertStore::new();
        store.upsert(alert(1, AlertStatus::Pending));
        store.patch(AlertId(1), &AlertPatch::status(AlertStatus::Resolved));
        assert!(store.contains(AlertId(1)));
    }

    #[test]
    fn test_load_merges_without_pruning() {
        let store = AlertStore::new();
        store.load(vec![alert(1, AlertStatus::Pending), alert(2, AlertStatus::Pending)]);
        assert_eq!(store.len(), 2);

        let report = store.load(vec![alert(2, AlertStatus::Responding), alert(3, AlertStatus::Pending)]);
        assert_eq!(report.merged, 2);
        assert_eq!(report.pruned, 0);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(AlertId(2)).unwrap().status, AlertStatus::Responding);
    }

    #[test]
    fn test_load_keeps_records_missing_from_snapshot() {
        let store = AlertStore::new();
        store.upsert(alert(1, AlertStatus::Pending));

        store.load(vec![]);
        assert!(store.contains(AlertId(1)));
    }

    #[test]
    fn test_marked_load_replaces_older_records() {
        let store = AlertStore::new();
        store.load(vec![alert(1, AlertStatus::Pending), alert(2, AlertStatus::Pending)]);

        let mark = store.mark();
        let report = store.load_marked(
            mark,
            vec![alert(2, AlertStatus::Responding), alert(3, AlertStatus::Pending)],
        );
        assert_eq!(report.merged, 2);
        assert_eq!(report.pruned, 1);
        assert!(!store.contains(AlertId(1)));
        assert_eq!(store.get(AlertId(2)).unwrap().status, AlertStatus::Responding);
    }

    fn tombstones(store: &AlertStore) -> usize {
        store.inner.read().tombstones.len()
    }

    #[test]
    fn test_removals_are_remembered_only_while_a_mark_is_open() {
        let store = AlertStore::new();
        for id in 0..100 {
            store.remove(AlertId(id));
        }
        assert_eq!(tombstones(&store), 0);

        let mark = store.mark();
        store.remove(AlertId(7));
        assert_eq!(tombstones(&store), 1);

        // A fetch that failed drops its mark.
        drop(mark);
        assert_eq!(tombstones(&store), 0);
    }

    #[test]
    fn test_overlapping_marks_keep_removals_for_the_older_fetch() {
        let store = AlertStore::new();
        store.load(vec![alert(1, AlertStatus::Pending)]);

        let older = store.mark();
        store.remove(AlertId(1));
        let newer = store.mark();

        store.load_marked(newer, vec![]);
        assert_eq!(tombstones(&store), 1);

        // The older snapshot still lists the deleted alert.
        let report = store.load_marked(older, vec![alert(1, AlertStatus::Pending)]);
        assert_eq!(report.skipped_removed, 1);
        assert!(store.is_empty());
        assert_eq!(tombstones(&store), 0);
    }

    #[test]
    fn test_marked_load_keeps_newer_event_state() {
        let store = AlertStore::new();
        let mark = store.mark();

        // Push event lands while the fetch is in flight.
        store.upsert(assigned(alert(1, AlertStatus::Responding)));
        store.upsert(alert(2, AlertStatus::Pending));

        let report = store.load_marked(
            mark,
            vec![alert(1, AlertStatus::Pending), alert(3, AlertStatus::Pending)],
        );

        assert_eq!(report.skipped_newer, 1);
        assert_eq!(report.merged, 1);
        assert_eq!(report.pruned, 0);
        let first = store.get(AlertId(1)).unwrap();
        assert_eq!(first.status, AlertStatus::Responding);
        assert!(first.assigned_vehicle.is_some());
        // Arrived after the mark, so its absence from the snapshot means nothing.
        assert!(store.contains(AlertId(2)));
        assert!(store.contains(AlertId(3)));
    }

    #[test]
    fn test_marked_load_does_not_resurrect_deleted() {
        let store = AlertStore::new();
        let mark = store.mark();

        store.remove(AlertId(5));

        let report = store.load_marked(mark, vec![alert(5, AlertStatus::Pending)]);
        assert_eq!(report.skipped_removed, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_apply_routes_events() {
        let store = AlertStore::new();
        store.apply(AlertEvent::New(alert(1, AlertStatus::Pending)));
        store.apply(AlertEvent::StatusUpdated {
            id: AlertId(1),
            patch: AlertPatch::status(AlertStatus::Responding),
        });
        assert_eq!(store.get(AlertId(1)).unwrap().status, AlertStatus::Responding);

        store.apply(AlertEvent::Deleted(AlertId(1)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_change_notification() {
        let store = AlertStore::new();
        let mut changes = store.subscribe();
        assert!(!changes.has_changed().unwrap());

        store.upsert(alert(1, AlertStatus::Pending));
        assert!(changes.has_changed().unwrap());
        changes.borrow_and_update();

        store.upsert(alert(1, AlertStatus::Pending));
        assert!(!changes.has_changed().unwrap());
    }

    #[test]
    fn test_summary_counts() {
        let store = AlertStore::new();
        let mut critical = alert(1, AlertStatus::Pending);
        critical.severity = Severity::Critical;
        store.upsert(critical);
        store.upsert(alert(2, AlertStatus::Responding));
        store.upsert(alert(3, AlertStatus::Resolved));

        let summary = store.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.critical_active, 1);
        assert_eq!(summary.status_count(AlertStatus::Resolved), 1);
        assert_eq!(summary.status_count(AlertStatus::Cancelled), 0);
        assert_eq!(summary.severity_count(Severity::High), 2);
    }
}
