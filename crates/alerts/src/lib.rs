//! `larder-alerts` — stock alert model and threshold evaluation.
//!
//! The engine decides transitions; it never touches storage. Applying a
//! transition (and enforcing the one-unresolved-alert-per-key guard) is the
//! alert store's job.

pub mod alert;
pub mod engine;

pub use alert::{AlertSeverity, AlertType, StockAlert};
pub use engine::{
    AlertEvent, AlertRaised, AlertResolved, AlertTransition, evaluate, evaluate_batches,
    evaluate_material,
};
