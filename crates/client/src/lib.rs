//! Dispatch Client - real-time alert synchronization
//!
//! This crate keeps an emergency-dispatch console's view of live alerts
//! consistent with the server: it owns the event channel, the canonical
//! alert store, the REST round trips for operator actions, and the
//! new-incident flash.

pub mod api_client;
pub mod config;
pub mod coordinator;
pub mod flash;
pub mod stores;
pub mod sync;
pub mod ws;

pub use api_client::{AlertApi, AlertQuery, ApiClient};
pub use config::{ConfigError, ConsoleConfig};
pub use coordinator::MutationCoordinator;
pub use flash::{Flash, FlashNotifier, DEFAULT_FLASH_DURATION};
pub use stores::{AlertFilter, AlertStore, AlertView};
pub use sync::{AlertSync, SyncStats};
pub use ws::{ConnectionState, EventRegistry, ReconnectConfig, Subscription, WsConnection};
