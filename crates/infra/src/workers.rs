//! Handler wiring between the job queue and the core services.
//!
//! The external scheduler enqueues jobs on its cadences; these handlers map
//! each kind onto the matching idempotent entry point. A job that fires
//! twice re-runs an evaluation that changes nothing.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;

use larder_broadcast::ChannelMessage;
use larder_core::OrderId;
use larder_events::EventBus;

use crate::fulfillment::{FulfillmentService, ShortfallPolicy};
use crate::jobs::{JobExecutor, JobKind, JobResult, JobStore};
use crate::monitoring::{DEFAULT_EXPIRY_WINDOW_DAYS, MonitoringCoordinator, ScheduledTask};
use crate::store::{AlertStore, CatalogStore, HistoryStore, InventoryStore, OrderStore};

/// Route the monitoring job kinds to the coordinator.
pub fn register_monitoring_handlers<S, I, A, H, B>(
    executor: &mut JobExecutor<S>,
    coordinator: Arc<MonitoringCoordinator<I, A, H, B>>,
) where
    S: JobStore + 'static,
    I: InventoryStore + 'static,
    A: AlertStore + 'static,
    H: HistoryStore + 'static,
    B: EventBus<ChannelMessage> + 'static,
{
    executor.register_handler("monitoring.*", move |job| {
        let task = match &job.kind {
            JobKind::StockLevelCheck => ScheduledTask::StockLevelCheck,
            JobKind::ExpiryCheck => ScheduledTask::ExpiryCheck {
                window_days: job
                    .payload
                    .get("window_days")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(DEFAULT_EXPIRY_WINDOW_DAYS),
            },
            JobKind::DashboardRefresh => ScheduledTask::DashboardRefresh,
            JobKind::MonthlyRollover => ScheduledTask::MonthlyRollover,
            other => {
                return JobResult::Failure(format!("not a monitoring job: {other:?}"));
            }
        };

        // Unit-level failures live inside the RunSummary; only a sweep that
        // cannot run at all fails the job.
        match coordinator.run(task, Utc::now()) {
            Ok(_summary) => JobResult::Success,
            Err(e) => JobResult::Failure(e.to_string()),
        }
    });
}

/// Route order-consumption jobs to the fulfillment service.
pub fn register_fulfillment_handler<S, I, A, C, O>(
    executor: &mut JobExecutor<S>,
    fulfillment: Arc<FulfillmentService<I, A, C, O>>,
    policy: ShortfallPolicy,
) where
    S: JobStore + 'static,
    I: InventoryStore + 'static,
    A: AlertStore + 'static,
    C: CatalogStore + 'static,
    O: OrderStore + 'static,
{
    executor.register_handler("inventory.process_order", move |job| {
        let Some(order_id) = job
            .payload
            .get("order_id")
            .and_then(|v| v.as_str())
            .and_then(|s| OrderId::from_str(s).ok())
        else {
            return JobResult::Failure("payload is missing a valid order_id".to_string());
        };

        match fulfillment.process_order(order_id, policy, Utc::now()) {
            Ok(_report) => JobResult::Success,
            Err(e) => JobResult::Failure(e.to_string()),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_broadcast::BroadcastDispatcher;
    use larder_core::{BatchId, Entity, MaterialId};
    use larder_events::{EventDispatcher, InMemoryEventBus};
    use larder_inventory::{Material, StockBatch};
    use rust_decimal_macros::dec;

    use crate::jobs::{InMemoryJobStore, Job};
    use crate::store::{InMemoryAlertStore, InMemoryHistoryStore, InMemoryInventoryStore};

    #[test]
    fn expiry_check_job_runs_the_sweep() {
        let inventory = Arc::new(InMemoryInventoryStore::new());
        let alerts = Arc::new(InMemoryAlertStore::new());

        let material = Material::new(MaterialId::new(), "Cream", "l", "ml", dec!(1000))
            .with_quantity(dec!(5));
        let id = *material.id();
        let today = Utc::now().date_naive();
        let batch = StockBatch::new(BatchId::new(), id, today, dec!(5), dec!(1))
            .with_expiry(today + chrono::Duration::days(1));
        inventory.put_material(material, vec![batch]).unwrap();

        let coordinator = Arc::new(MonitoringCoordinator::new(
            inventory,
            alerts.clone(),
            Arc::new(InMemoryHistoryStore::new()),
            Arc::new(BroadcastDispatcher::new(Arc::new(InMemoryEventBus::new()))),
            Arc::new(EventDispatcher::new()),
        ));

        let store = InMemoryJobStore::arc();
        let mut executor = JobExecutor::new(store.clone());
        register_monitoring_handlers(&mut executor, coordinator);

        store
            .enqueue(Job::new(JobKind::ExpiryCheck, serde_json::json!({})))
            .unwrap();
        let mut claimed = store.claim_next().unwrap().unwrap();
        executor.execute_one(&mut claimed).unwrap();

        assert_eq!(alerts.unresolved_for(id).unwrap().len(), 1);

        // At-least-once delivery: a duplicate job is a no-op.
        store
            .enqueue(Job::new(JobKind::ExpiryCheck, serde_json::json!({})))
            .unwrap();
        let mut claimed = store.claim_next().unwrap().unwrap();
        executor.execute_one(&mut claimed).unwrap();
        assert_eq!(alerts.unresolved_for(id).unwrap().len(), 1);
    }

    #[test]
    fn fulfillment_job_requires_an_order_id() {
        let fulfillment = Arc::new(FulfillmentService::new(
            Arc::new(InMemoryInventoryStore::new()),
            Arc::new(InMemoryAlertStore::new()),
            Arc::new(crate::store::InMemoryCatalogStore::new()),
            Arc::new(crate::store::InMemoryOrderStore::new()),
            Arc::new(EventDispatcher::new()),
        ));

        let store = InMemoryJobStore::arc();
        let mut executor = JobExecutor::new(store.clone());
        register_fulfillment_handler(&mut executor, fulfillment, ShortfallPolicy::Abort);

        store
            .enqueue(Job::new(
                JobKind::ProcessOrderInventory,
                serde_json::json!({ "order_id": "not-a-uuid" }),
            ))
            .unwrap();
        let mut claimed = store.claim_next().unwrap().unwrap();
        let err = executor.execute_one(&mut claimed).unwrap_err();
        assert!(err.contains("order_id"));
    }
}
