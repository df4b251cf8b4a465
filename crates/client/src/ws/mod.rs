//! Event channel to the dispatch server.
//!
//! ```text
//!   WsConnection ──frames──▶ EventRegistry ──▶ handlers
//!        │                        ▲
//!        └── connect/disconnect ──┘
//! ```
//!
//! The connection owns the socket and reconnect loop; the registry owns the
//! handler table so subscriptions outlive any single socket.

mod connection;
mod registry;

pub use connection::{ConnectionState, ReconnectConfig, TransportError, WsConnection, WsHandle};
pub use registry::{EventRegistry, Handler, Subscription};
