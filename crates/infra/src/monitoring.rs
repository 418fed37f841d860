//! Scheduled monitoring sweeps over the whole inventory.
//!
//! An external scheduler owns the timing and calls these entry points (daily
//! expiry check, periodic stock check and dashboard refresh, monthly
//! rollover). Every entry point is idempotent; every material is an
//! independent unit of work whose failure is counted, never fatal to the
//! sweep.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use larder_broadcast::{BroadcastDispatcher, BroadcastEvent, ChannelMessage};
use larder_core::{DomainResult, MaterialId};
use larder_events::{EventBus, EventDispatcher, Outbox};

use crate::alerting;
use crate::events::CoreEvent;
use crate::store::{AlertStore, HistoryStore, InventoryStore, StockHistoryEntry};

/// Expiry window the daily check looks ahead, in days.
pub const DEFAULT_EXPIRY_WINDOW_DAYS: u64 = 7;

/// The scheduler-facing task vocabulary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ScheduledTask {
    StockLevelCheck,
    ExpiryCheck { window_days: u64 },
    DashboardRefresh,
    MonthlyRollover,
}

/// Observable outcome of one sweep.
///
/// `updated + skipped + errors == processed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl RunSummary {
    fn count(&mut self, outcome: anyhow::Result<bool>, material_id: MaterialId) {
        self.processed += 1;
        match outcome {
            Ok(true) => self.updated += 1,
            Ok(false) => self.skipped += 1,
            Err(err) => {
                error!(%material_id, error = ?err, "monitoring unit of work failed");
                self.errors += 1;
            }
        }
    }
}

/// Runs the periodic inventory checks.
pub struct MonitoringCoordinator<I, A, H, B> {
    inventory: I,
    alerts: A,
    history: H,
    broadcaster: Arc<BroadcastDispatcher<B>>,
    events: Arc<EventDispatcher<CoreEvent>>,
}

impl<I, A, H, B> MonitoringCoordinator<I, A, H, B>
where
    I: InventoryStore,
    A: AlertStore,
    H: HistoryStore,
    B: EventBus<ChannelMessage>,
{
    pub fn new(
        inventory: I,
        alerts: A,
        history: H,
        broadcaster: Arc<BroadcastDispatcher<B>>,
        events: Arc<EventDispatcher<CoreEvent>>,
    ) -> Self {
        Self {
            inventory,
            alerts,
            history,
            broadcaster,
            events,
        }
    }

    /// Dispatch a scheduler task to its entry point.
    pub fn run(&self, task: ScheduledTask, now: DateTime<Utc>) -> DomainResult<RunSummary> {
        match task {
            ScheduledTask::StockLevelCheck => self.run_stock_level_check(now),
            ScheduledTask::ExpiryCheck { window_days } => self.run_expiry_check(now, window_days),
            ScheduledTask::DashboardRefresh => self.run_dashboard_refresh(now),
            ScheduledTask::MonthlyRollover => self.run_monthly_rollover(now),
        }
    }

    /// Evaluate material-level thresholds across all materials.
    pub fn run_stock_level_check(&self, now: DateTime<Utc>) -> DomainResult<RunSummary> {
        let mut summary = RunSummary::default();
        let mut outbox: Outbox<CoreEvent> = Outbox::new();

        for material_id in self.inventory.material_ids()? {
            let outcome = (|| -> anyhow::Result<bool> {
                let (material, _batches) = self
                    .inventory
                    .snapshot(material_id)
                    .context("loading material")?;
                let unresolved = self
                    .alerts
                    .unresolved_types(material_id)
                    .context("loading unresolved alerts")?;
                let transitions = larder_alerts::evaluate_material(&material, &unresolved, now);
                let applied = alerting::apply_transitions(&self.alerts, transitions, now, &mut outbox)
                    .context("applying alert transitions")?;
                Ok(applied > 0)
            })();
            summary.count(outcome, material_id);
        }

        let dispatched = outbox.flush_into(&self.events);
        info!(?summary, dispatched, "stock level check finished");
        Ok(summary)
    }

    /// Evaluate batch expiry across all materials and warn subscribers about
    /// batches expiring within the window.
    pub fn run_expiry_check(
        &self,
        now: DateTime<Utc>,
        window_days: u64,
    ) -> DomainResult<RunSummary> {
        let today = now.date_naive();
        let mut summary = RunSummary::default();
        let mut outbox: Outbox<CoreEvent> = Outbox::new();

        for material_id in self.inventory.material_ids()? {
            let outcome = (|| -> anyhow::Result<bool> {
                let (material, batches) = self
                    .inventory
                    .snapshot(material_id)
                    .context("loading material")?;
                if batches.iter().all(|b| b.expiry_date().is_none()) {
                    return Ok(false);
                }

                let unresolved = self
                    .alerts
                    .unresolved_types(material_id)
                    .context("loading unresolved alerts")?;
                let transitions =
                    larder_alerts::evaluate_batches(&material, &batches, &unresolved, now);
                let applied = alerting::apply_transitions(&self.alerts, transitions, now, &mut outbox)
                    .context("applying alert transitions")?;

                let expiring = larder_inventory::classify_expiring(&batches, today, window_days);
                for batch in &expiring {
                    self.broadcaster.publish(&BroadcastEvent::BatchExpiryWarning {
                        material_id,
                        batch_id: batch.id(),
                        days_until_expiry: batch.days_until_expiry(today).unwrap_or_default(),
                        occurred_at: now,
                    });
                }

                Ok(applied > 0 || !expiring.is_empty())
            })();
            summary.count(outcome, material_id);
        }

        let dispatched = outbox.flush_into(&self.events);
        info!(?summary, dispatched, window_days, "expiry check finished");
        Ok(summary)
    }

    /// Nudge dashboard subscribers to refresh.
    pub fn run_dashboard_refresh(&self, now: DateTime<Utc>) -> DomainResult<RunSummary> {
        self.broadcaster
            .publish(&BroadcastEvent::DashboardChanged { occurred_at: now });
        Ok(RunSummary {
            processed: 1,
            updated: 1,
            skipped: 0,
            errors: 0,
        })
    }

    /// Snapshot every material's closing quantity for the current month.
    ///
    /// Re-running within the same month replaces the snapshots, so the
    /// rollover can be retried freely.
    pub fn run_monthly_rollover(&self, now: DateTime<Utc>) -> DomainResult<RunSummary> {
        let mut summary = RunSummary::default();
        let date = now.date_naive();

        for material_id in self.inventory.material_ids()? {
            let outcome = (|| -> anyhow::Result<bool> {
                let (material, _batches) = self
                    .inventory
                    .snapshot(material_id)
                    .context("loading material")?;
                self.history
                    .record(StockHistoryEntry {
                        material_id,
                        year: date.year(),
                        month: date.month(),
                        closing_quantity: material.quantity(),
                        recorded_at: now,
                    })
                    .context("recording history entry")?;
                Ok(true)
            })();
            summary.count(outcome, material_id);
        }

        info!(?summary, "monthly stock rollover finished");
        Ok(summary)
    }
}
