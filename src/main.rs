//! Dispatch Console - headless live alert monitor
//!
//! Connects to the dispatch server, keeps the alert store in sync, and logs
//! every new-incident flash and a summary line whenever the store changes.

use std::sync::Arc;

use anyhow::Context;
use dispatch_client::{
    AlertFilter, AlertStore, AlertSync, ApiClient, ConsoleConfig, EventRegistry, FlashNotifier,
    MutationCoordinator, WsConnection,
};
use dispatch_shared::{AlertStatus, Severity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatch_console=info,dispatch_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ConsoleConfig::from_env().context("invalid console configuration")?;
    tracing::info!(
        socket_url = %config.socket_url,
        api_url = %config.api_url,
        authenticated = config.api_token.is_some(),
        "starting dispatch console"
    );

    let store = Arc::new(AlertStore::new());
    let registry = EventRegistry::new();
    let api = ApiClient::new()
        .with_base_url(config.api_url.as_str())
        .with_token(config.api_token.clone());
    let coordinator = MutationCoordinator::new(Arc::new(api), store.clone());

    let flash = FlashNotifier::new(config.flash_duration);
    let _flash_subscription = flash.attach(&registry);
    let sync = AlertSync::attach(&registry, store.clone(), Some(coordinator.clone()));

    let connection = WsConnection::new(
        config.socket_url.as_str(),
        registry.clone(),
        config.reconnect.clone(),
    );
    connection.connect();

    {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if let Err(e) = coordinator.refresh().await {
                tracing::error!(error = %e, "initial alert load failed: {}", e.user_message());
            }
        });
    }

    let active = store.select_filter(AlertFilter::active());
    let mut store_changes = store.subscribe();
    let mut flashes = flash.subscribe();
    let mut states = connection.watch_state();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                }
                break;
            }
            changed = store_changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let summary = store.summary();
                tracing::info!(
                    total = summary.total,
                    active = active.len(),
                    pending = summary.status_count(AlertStatus::Pending),
                    responding = summary.status_count(AlertStatus::Responding),
                    critical = summary.severity_count(Severity::Critical),
                    critical_active = summary.critical_active,
                    "alerts changed"
                );
            }
            changed = flashes.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = flashes.borrow_and_update().clone();
                if let Some(flash) = current {
                    tracing::warn!(
                        alert_id = %flash.alert.id,
                        severity = %flash.alert.severity,
                        location = %flash.alert.location,
                        "NEW INCIDENT: {}",
                        flash.alert.title
                    );
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                tracing::info!(?state, "event channel state changed");
            }
        }
    }

    tracing::info!(
        applied = sync.stats().applied(),
        malformed = sync.stats().malformed(),
        resyncs = sync.stats().resyncs(),
        "shutting down"
    );
    connection.disconnect();
    Ok(())
}
