//! Shared types for the dispatch console: alert models, the event channel
//! protocol and error types.

pub mod models;
pub mod protocol;
pub mod error;

pub use models::*;
pub use protocol::*;
pub use error::*;
