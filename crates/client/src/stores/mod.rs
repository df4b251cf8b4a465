//! Client-side state stores.

pub mod alerts;
pub mod views;

pub use alerts::{AlertStore, AlertSummary, LoadMark, LoadReport, PatchOutcome, UpsertOutcome};
pub use views::{AlertFilter, AlertPredicate, AlertView};
