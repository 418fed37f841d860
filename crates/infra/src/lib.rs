//! `larder-infra` — stores, workflows, task queue, and transports.
//!
//! Everything that coordinates the pure domain crates with the outside
//! world: transactional in-memory stores with exclusive per-entity scopes,
//! the order-fulfillment workflow, the monitoring coordinator, the
//! background job system, and the optional Redis broadcast transport.

pub mod alerting;
pub mod event_bus;
pub mod events;
pub mod fulfillment;
pub mod jobs;
pub mod monitoring;
pub mod repricing;
pub mod store;
pub mod workers;

#[cfg(test)]
mod integration_tests;

pub use events::CoreEvent;
pub use fulfillment::{FulfillmentReport, FulfillmentService, Shortfall, ShortfallPolicy};
pub use monitoring::{MonitoringCoordinator, RunSummary, ScheduledTask};
pub use repricing::RepricingService;
