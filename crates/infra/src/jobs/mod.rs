//! Background job system with retry, backoff, and dead-letter handling.
//!
//! This is the task-queue collaborator the core depends on: consumption and
//! monitoring work is dispatched here after the triggering transaction
//! commits. Delivery is at least once, so every registered handler is
//! idempotent.
//!
//! ## Components
//!
//! - `Job`: Core job abstraction with payload and metadata
//! - `JobStore`: Persistence for jobs (in-memory or durable)
//! - `JobExecutor`: Runs jobs with retry logic
//! - `DeadLetterEntry`: Failed jobs kept for inspection/replay

pub mod executor;
pub mod store;
pub mod types;

pub use executor::{JobExecutor, JobExecutorConfig, JobExecutorHandle};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use types::{
    BackoffStrategy, DeadLetterEntry, Job, JobId, JobKind, JobResult, JobStatus, RetryPolicy,
};
