//! User-initiated writes as API round trips.
//!
//! Every mutation waits for the server's answer and feeds that answer into
//! the store through the same merge path push events use. Nothing is applied
//! optimistically; when a call fails the store is left exactly as it was and
//! the caller gets the [`ApiError`].

use std::sync::Arc;

use dispatch_shared::{Alert, AlertId, AlertPatch, AlertStatus, ApiError, AssignRequest, NewAlert};

use crate::api_client::{AlertApi, AlertQuery};
use crate::stores::{AlertStore, LoadReport};

#[derive(Clone)]
pub struct MutationCoordinator {
    api: Arc<dyn AlertApi>,
    store: Arc<AlertStore>,
}

impl MutationCoordinator {
    pub fn new(api: Arc<dyn AlertApi>, store: Arc<AlertStore>) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    pub async fn create(&self, alert: &NewAlert) -> Result<Alert, ApiError> {
        let created = self.api.create_alert(alert).await.inspect_err(|e| {
            tracing::warn!(error = %e, "create alert failed");
        })?;
        tracing::info!(alert_id = %created.id, "alert created");
        self.store.upsert(created.clone());
        Ok(created)
    }

    pub async fn update(&self, id: AlertId, update: &AlertPatch) -> Result<Alert, ApiError> {
        let updated = self.api.update_alert(id, update).await.inspect_err(|e| {
            tracing::warn!(alert_id = %id, error = %e, "update alert failed");
        })?;
        self.store.upsert(updated.clone());
        Ok(updated)
    }

    /// Request a status change.
    ///
    /// Transitions the status graph does not allow are still sent; the
    /// server has the final word.
    pub async fn update_status(&self, id: AlertId, status: AlertStatus) -> Result<Alert, ApiError> {
        if let Some(current) = self.store.get(id) {
            if !current.status.can_transition_to(status) {
                tracing::warn!(
                    alert_id = %id,
                    from = %current.status,
                    to = %status,
                    "requesting a status transition outside the usual flow"
                );
            }
        }

        let updated = self.api.update_status(id, status).await.inspect_err(|e| {
            tracing::warn!(alert_id = %id, %status, error = %e, "status update failed");
        })?;
        tracing::info!(alert_id = %id, status = %updated.status, "alert status updated");
        self.store.upsert(updated.clone());
        Ok(updated)
    }

    pub async fn assign(&self, id: AlertId, request: &AssignRequest) -> Result<Alert, ApiError> {
        let updated = self.api.assign(id, request).await.inspect_err(|e| {
            tracing::warn!(alert_id = %id, error = %e, "assign failed");
        })?;
        tracing::info!(
            alert_id = %id,
            vehicle_id = ?request.vehicle_id,
            responder_id = ?request.responder_id,
            "alert assigned"
        );
        self.store.upsert(updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, id: AlertId) -> Result<(), ApiError> {
        self.api.delete_alert(id).await.inspect_err(|e| {
            tracing::warn!(alert_id = %id, error = %e, "delete alert failed");
        })?;
        tracing::info!(alert_id = %id, "alert deleted");
        self.store.remove(id);
        Ok(())
    }

    /// Re-read the full list and reconcile it with whatever arrived while
    /// the request was in flight.
    pub async fn refresh(&self) -> Result<LoadReport, ApiError> {
        let mark = self.store.mark();
        let snapshot = self
            .api
            .list_alerts(&AlertQuery::default())
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "alert list fetch failed"))?;
        let report = self.store.load_marked(mark, snapshot);
        tracing::info!(
            merged = report.merged,
            pruned = report.pruned,
            total = self.store.len(),
            "alerts refreshed"
        );
        Ok(report)
    }

    /// Fetch one alert. A 404 means the alert is gone, so it is dropped
    /// locally and `None` is returned.
    pub async fn fetch(&self, id: AlertId) -> Result<Option<Alert>, ApiError> {
        match self.api.get_alert(id).await {
            Ok(alert) => {
                self.store.upsert(alert.clone());
                Ok(Some(alert))
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(alert_id = %id, "alert no longer exists");
                self.store.remove(id);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(alert_id = %id, error = %e, "alert fetch failed");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("alerts", &self.store.len())
            .finish_non_exhaustive()
    }
}
