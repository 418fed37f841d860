//! Job executor with retry and backoff logic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::store::{JobStore, JobStoreError};
use super::types::{Job, JobKind, JobResult, JobStatus};

/// Job handler function type.
pub type JobHandler = Box<dyn Fn(&Job) -> JobResult + Send + Sync>;

/// Job executor configuration.
#[derive(Debug, Clone)]
pub struct JobExecutorConfig {
    /// How often to poll for new jobs
    pub poll_interval: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            name: "job-executor".to_string(),
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Handle to control a running executor.
#[derive(Debug)]
pub struct JobExecutorHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
}

impl JobExecutorHandle {
    /// Request graceful shutdown.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Get current executor statistics.
    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_dead_lettered: u64,
    pub uptime_secs: u64,
}

/// Background job executor.
///
/// Polls a job store for pending jobs, executes them with registered
/// handlers, and handles retries and dead-lettering. Handlers must be
/// idempotent: the queue delivers at least once.
pub struct JobExecutor<S: JobStore> {
    store: S,
    handlers: HashMap<String, JobHandler>,
}

impl<S: JobStore + 'static> JobExecutor<S> {
    /// Create a new executor with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a job kind.
    ///
    /// Patterns: exact (`"monitoring.expiry_check"`), category
    /// (`"monitoring.*"`), or wildcard (`"*"`).
    pub fn register_handler<F>(&mut self, kind_pattern: impl Into<String>, handler: F)
    where
        F: Fn(&Job) -> JobResult + Send + Sync + 'static,
    {
        self.handlers.insert(kind_pattern.into(), Box::new(handler));
    }

    /// Get the handler for a job kind.
    fn get_handler(&self, kind: &JobKind) -> Option<&JobHandler> {
        // Exact match first.
        let type_name = kind.type_name();
        if let Some(h) = self.handlers.get(type_name) {
            return Some(h);
        }

        // Category match (e.g. "monitoring.*" matches "monitoring.expiry_check").
        for (pattern, handler) in &self.handlers {
            if let Some(prefix) = pattern.strip_suffix(".*")
                && type_name.starts_with(prefix)
            {
                return Some(handler);
            }
        }

        self.handlers.get("*")
    }

    /// Spawn the executor in a background thread.
    pub fn spawn(self, config: JobExecutorConfig) -> JobExecutorHandle
    where
        S: Send,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));
        let stats_clone = stats.clone();

        let name = config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                executor_loop(self, config, shutdown_rx, stats_clone);
            })
            .expect("failed to spawn job executor thread");

        JobExecutorHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }

    /// Execute a single job (for testing or synchronous use).
    pub fn execute_one(&self, job: &mut Job) -> Result<(), String> {
        execute_job(self, job)
    }
}

fn executor_loop<S: JobStore + 'static>(
    executor: JobExecutor<S>,
    config: JobExecutorConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<ExecutorStats>>,
) {
    info!(executor = %config.name, "job executor started");
    let start_time = Instant::now();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        {
            let mut s = stats.lock().unwrap();
            s.uptime_secs = start_time.elapsed().as_secs();
        }

        match executor.store.claim_next() {
            Ok(Some(mut job)) => {
                debug!(
                    executor = %config.name,
                    job_id = %job.id,
                    kind = ?job.kind,
                    "claimed job"
                );

                let result = execute_job(&executor, &mut job);

                {
                    let mut s = stats.lock().unwrap();
                    s.jobs_processed += 1;
                    match &result {
                        Ok(()) => s.jobs_succeeded += 1,
                        Err(_) => {
                            s.jobs_failed += 1;
                            if matches!(job.status, JobStatus::DeadLettered { .. }) {
                                s.jobs_dead_lettered += 1;
                            }
                        }
                    }
                }

                if let Err(e) = result {
                    debug!(
                        executor = %config.name,
                        job_id = %job.id,
                        error = %e,
                        status = ?job.status,
                        "job execution failed"
                    );
                }
            }
            Ok(None) => {
                // No jobs available, sleep.
                thread::sleep(config.poll_interval);
            }
            Err(e) => {
                error!(executor = %config.name, error = ?e, "failed to claim job");
                thread::sleep(config.poll_interval);
            }
        }
    }

    info!(executor = %config.name, "job executor stopped");
}

fn execute_job<S: JobStore + 'static>(executor: &JobExecutor<S>, job: &mut Job) -> Result<(), String> {
    let handler = match executor.get_handler(&job.kind) {
        Some(h) => h,
        None => {
            let error = format!("no handler for job kind: {:?}", job.kind);
            warn!(job_id = %job.id, error = %error, "no handler for job");
            job.mark_failed(error.clone());
            executor.store.update(job).ok();
            return Err(error);
        }
    };

    match handler(job) {
        JobResult::Success => {
            job.mark_completed();
            executor
                .store
                .update(job)
                .map_err(|e: JobStoreError| e.to_string())?;
            debug!(job_id = %job.id, "job completed successfully");
            Ok(())
        }
        JobResult::Failure(error) => {
            job.mark_failed(error.clone());
            executor.store.update(job).map_err(|e| e.to_string())?;

            if matches!(job.status, JobStatus::DeadLettered { .. }) {
                warn!(job_id = %job.id, error = %error, "job dead-lettered");
                executor.store.dead_letter(job.clone(), error.clone()).ok();
            }

            Err(error)
        }
        JobResult::RetryAfter(delay) => {
            job.mark_failed("retry after delay".to_string());
            job.scheduled_at =
                Some(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default());
            executor.store.update(job).map_err(|e| e.to_string())?;
            Err("retry after delay".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::store::InMemoryJobStore;
    use crate::jobs::types::RetryPolicy;

    #[test]
    fn execute_successful_job() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut executor = JobExecutor::new(store.clone());

        executor.register_handler("test", |_job| JobResult::Success);

        let job = Job::new(JobKind::custom("test"), serde_json::json!({}));
        store.enqueue(job).unwrap();

        let mut claimed = store.claim_next().unwrap().unwrap();
        let result = executor.execute_one(&mut claimed);

        assert!(result.is_ok());
        assert!(matches!(claimed.status, JobStatus::Completed));
    }

    #[test]
    fn execute_failing_job_with_retry() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut executor = JobExecutor::new(store.clone());

        executor.register_handler("test", |_job| JobResult::Failure("test error".to_string()));

        let job = Job::new(JobKind::custom("test"), serde_json::json!({})).with_retry_policy(
            RetryPolicy {
                max_attempts: 2,
                ..Default::default()
            },
        );
        store.enqueue(job).unwrap();

        // First attempt fails and schedules a retry.
        let mut claimed = store.claim_next().unwrap().unwrap();
        let result = executor.execute_one(&mut claimed);
        assert!(result.is_err());
        assert!(matches!(claimed.status, JobStatus::Failed { .. }));

        // Second attempt (after backoff would expire) dead-letters.
        claimed.scheduled_at = None;
        store.update(&claimed).unwrap();

        let mut claimed = store.claim_next().unwrap().unwrap();
        let result = executor.execute_one(&mut claimed);
        assert!(result.is_err());
        assert!(matches!(claimed.status, JobStatus::DeadLettered { .. }));
    }

    #[test]
    fn category_handler_matches_prefixed_kinds() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut executor = JobExecutor::new(store.clone());

        executor.register_handler("monitoring.*", |_job| JobResult::Success);

        let job = Job::new(JobKind::ExpiryCheck, serde_json::json!({}));
        store.enqueue(job).unwrap();

        let mut claimed = store.claim_next().unwrap().unwrap();
        assert!(executor.execute_one(&mut claimed).is_ok());
    }

    #[test]
    fn missing_handler_fails_the_job() {
        let store = Arc::new(InMemoryJobStore::new());
        let executor: JobExecutor<Arc<InMemoryJobStore>> = JobExecutor::new(store.clone());

        let job = Job::new(JobKind::custom("unrouted"), serde_json::json!({}));
        store.enqueue(job).unwrap();

        let mut claimed = store.claim_next().unwrap().unwrap();
        assert!(executor.execute_one(&mut claimed).is_err());
    }
}
