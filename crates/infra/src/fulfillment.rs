//! Order fulfillment: consume materials per recipe when an order completes.
//!
//! Triggered by the task queue with at-least-once delivery, so the whole
//! workflow is idempotent: an order that was already inventory-processed is
//! skipped outright. Facts collected during the units of work are dispatched
//! only after everything has committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use larder_core::{DomainError, DomainResult, MaterialId, OrderId};
use larder_events::{EventDispatcher, Outbox};
use larder_inventory::BatchAllocation;
use larder_orders::{OrderEvent, OrderInventoryProcessed};

use crate::alerting;
use crate::events::CoreEvent;
use crate::store::{AlertStore, CatalogStore, InventoryStore, OrderStore};

/// What to do when a material cannot cover its requirement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShortfallPolicy {
    /// Undo every consumption made for this order and fail the call.
    Abort,
    /// Skip the affected material, record the shortfall, and continue.
    RecordAndContinue,
}

/// A requirement one material could not cover (both values in stock units).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortfall {
    pub material_id: MaterialId,
    pub requested: Decimal,
    pub available: Decimal,
}

/// What an order's fulfillment actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentReport {
    pub order_id: OrderId,
    /// Per-material allocations, in processing order.
    pub consumed: Vec<(MaterialId, Vec<BatchAllocation>)>,
    /// Shortfalls recorded under [`ShortfallPolicy::RecordAndContinue`].
    pub shortfalls: Vec<Shortfall>,
    /// Per-material failures other than shortfalls, recorded instead of
    /// aborting the remaining materials.
    pub errors: Vec<(MaterialId, String)>,
    /// True when the order had already been processed and nothing ran.
    pub skipped: bool,
}

/// Consumes materials for completed orders.
pub struct FulfillmentService<I, A, C, O> {
    inventory: I,
    alerts: A,
    catalog: C,
    orders: O,
    events: Arc<EventDispatcher<CoreEvent>>,
}

impl<I, A, C, O> FulfillmentService<I, A, C, O>
where
    I: InventoryStore,
    A: AlertStore,
    C: CatalogStore,
    O: OrderStore,
{
    pub fn new(
        inventory: I,
        alerts: A,
        catalog: C,
        orders: O,
        events: Arc<EventDispatcher<CoreEvent>>,
    ) -> Self {
        Self {
            inventory,
            alerts,
            catalog,
            orders,
            events,
        }
    }

    /// Run inventory consumption for one completed order.
    ///
    /// Under [`ShortfallPolicy::Abort`] the first shortfall (or any other
    /// per-material failure) undoes everything already consumed for this
    /// order and surfaces the error. Under
    /// [`ShortfallPolicy::RecordAndContinue`] each material is an
    /// independent unit of work; failures land in the report and the order
    /// is still marked processed.
    pub fn process_order(
        &self,
        order_id: OrderId,
        policy: ShortfallPolicy,
        now: DateTime<Utc>,
    ) -> DomainResult<FulfillmentReport> {
        let (order, items) = self.orders.snapshot(order_id)?;

        if order.is_inventory_processed() {
            debug!(%order_id, "order already inventory-processed, skipping");
            return Ok(FulfillmentReport {
                order_id,
                consumed: Vec::new(),
                shortfalls: Vec::new(),
                errors: Vec::new(),
                skipped: true,
            });
        }
        if !order.status.triggers_fulfillment() {
            return Err(DomainError::validation(
                "inventory consumption requires a completed or paid order",
            ));
        }

        // Total requirement per material, in recipe units, across all items.
        let mut requirements: Vec<(MaterialId, Decimal)> = Vec::new();
        for item in &items {
            let Some(recipe) = self.catalog.recipe_for_product(item.product_id)? else {
                debug!(product_id = %item.product_id, "product has no recipe, nothing to consume");
                continue;
            };
            for (material_id, quantity) in recipe.requirements(Decimal::from(item.quantity)) {
                match requirements.iter_mut().find(|(id, _)| *id == material_id) {
                    Some((_, total)) => *total += quantity,
                    None => requirements.push((material_id, quantity)),
                }
            }
        }

        let mut outbox: Outbox<CoreEvent> = Outbox::new();
        let mut consumed: Vec<(MaterialId, Vec<BatchAllocation>)> = Vec::new();
        let mut shortfalls = Vec::new();
        let mut errors = Vec::new();

        for (material_id, recipe_quantity) in requirements {
            let result = self.inventory.with_material(material_id, |material, batches| {
                let needed = material.to_stock_units(recipe_quantity);
                larder_inventory::consume(material, batches, needed, now)
            });

            match result {
                Ok(consumption) => {
                    outbox.record_all(consumption.events.iter().cloned().map(CoreEvent::from));
                    consumed.push((material_id, consumption.allocations));
                    alerting::evaluate_and_apply(
                        &self.inventory,
                        &self.alerts,
                        material_id,
                        now,
                        &mut outbox,
                    )?;
                }
                Err(err) => match (policy, &err) {
                    (ShortfallPolicy::Abort, _) => {
                        self.undo(&consumed);
                        return Err(err);
                    }
                    (
                        ShortfallPolicy::RecordAndContinue,
                        DomainError::InsufficientStock {
                            requested,
                            available,
                        },
                    ) => {
                        warn!(
                            %material_id,
                            %requested,
                            %available,
                            "insufficient stock, recording shortfall and continuing"
                        );
                        shortfalls.push(Shortfall {
                            material_id,
                            requested: *requested,
                            available: *available,
                        });
                    }
                    (ShortfallPolicy::RecordAndContinue, _) => {
                        warn!(%material_id, error = %err, "material unit of work failed, continuing");
                        errors.push((material_id, err.to_string()));
                    }
                },
            }
        }

        self.orders.with_order(order_id, |order, _items| {
            order.mark_inventory_processed();
            Ok(())
        })?;
        outbox.record(CoreEvent::Order(OrderEvent::OrderInventoryProcessed(
            OrderInventoryProcessed {
                order_id,
                occurred_at: now,
            },
        )));

        // Everything is committed; fan the facts out.
        let dispatched = outbox.flush_into(&self.events);
        info!(
            %order_id,
            materials = consumed.len(),
            shortfalls = shortfalls.len(),
            dispatched,
            "order inventory processed"
        );

        Ok(FulfillmentReport {
            order_id,
            consumed,
            shortfalls,
            errors,
            skipped: false,
        })
    }

    /// Compensate committed consumptions after a mid-order failure.
    fn undo(&self, consumed: &[(MaterialId, Vec<BatchAllocation>)]) {
        for (material_id, allocations) in consumed {
            let result = self.inventory.with_material(*material_id, |material, batches| {
                larder_inventory::restore(material, batches, allocations);
                Ok(())
            });
            if let Err(err) = result {
                warn!(%material_id, error = %err, "failed to restore consumption during abort");
            }
        }
    }
}
