//! Batch ledger: FEFO/FIFO consumption and expiry classification.
//!
//! All functions here are deterministic over their inputs; the caller owns
//! the exclusive per-material scope and decides when the mutation commits.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{BatchId, DomainError, DomainResult, Entity, MaterialId};
use larder_events::Event;

use crate::batch::StockBatch;
use crate::material::Material;

/// One batch's share of a consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAllocation {
    pub batch_id: BatchId,
    pub quantity_taken: Decimal,
    pub unit_cost: Decimal,
}

/// Outcome of a successful consumption: which batches were drawn down, and
/// the facts describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    pub material_id: MaterialId,
    pub allocations: Vec<BatchAllocation>,
    pub events: Vec<InventoryEvent>,
}

impl Consumption {
    pub fn total_taken(&self) -> Decimal {
        self.allocations.iter().map(|a| a.quantity_taken).sum()
    }
}

/// Event: BatchConsumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConsumed {
    pub material_id: MaterialId,
    pub batch_id: BatchId,
    pub quantity_taken: Decimal,
    pub batch_remaining: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub material_id: MaterialId,
    pub batch_id: BatchId,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    BatchConsumed(BatchConsumed),
    StockReceived(StockReceived),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::BatchConsumed(_) => "inventory.batch_consumed",
            InventoryEvent::StockReceived(_) => "inventory.stock_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::BatchConsumed(e) => e.occurred_at,
            InventoryEvent::StockReceived(e) => e.occurred_at,
        }
    }
}

/// Consume `quantity_needed` (in stock units) from the material's batches.
///
/// Batches are drawn down earliest-expiry-first, with no-expiry batches last
/// and ties broken by earliest received date. If the total available
/// remaining is short of `quantity_needed`, nothing is mutated and the call
/// fails with [`DomainError::InsufficientStock`].
pub fn consume(
    material: &mut Material,
    batches: &mut [StockBatch],
    quantity_needed: Decimal,
    now: DateTime<Utc>,
) -> DomainResult<Consumption> {
    if quantity_needed <= Decimal::ZERO {
        return Err(DomainError::validation(
            "consumption quantity must be positive",
        ));
    }
    ensure_owned(material, batches)?;

    let available: Decimal = batches
        .iter()
        .filter(|b| b.is_available())
        .map(|b| b.remaining_quantity())
        .sum();
    if available < quantity_needed {
        return Err(DomainError::insufficient_stock(quantity_needed, available));
    }

    // Allocation order: expiry ascending with no-expiry last, then received
    // date ascending.
    let mut order: Vec<usize> = (0..batches.len())
        .filter(|&i| batches[i].is_available())
        .collect();
    order.sort_by_key(|&i| fefo_key(&batches[i]));

    let mut still_needed = quantity_needed;
    let mut allocations = Vec::new();
    let mut events = Vec::new();

    for i in order {
        if still_needed <= Decimal::ZERO {
            break;
        }
        let batch = &mut batches[i];
        let taken = batch.take(still_needed);
        if taken.is_zero() {
            continue;
        }
        still_needed -= taken;

        allocations.push(BatchAllocation {
            batch_id: batch.id(),
            quantity_taken: taken,
            unit_cost: batch.unit_cost(),
        });
        events.push(InventoryEvent::BatchConsumed(BatchConsumed {
            material_id: material.id().to_owned(),
            batch_id: batch.id(),
            quantity_taken: taken,
            batch_remaining: batch.remaining_quantity(),
            occurred_at: now,
        }));
    }

    material.apply_consumption(quantity_needed);

    Ok(Consumption {
        material_id: material.id().to_owned(),
        allocations,
        events,
    })
}

/// Undo a previously committed consumption (compensation path).
///
/// Restores each allocation to its batch and the total back onto the
/// material. Allocations for unknown batches are ignored.
pub fn restore(material: &mut Material, batches: &mut [StockBatch], allocations: &[BatchAllocation]) {
    let mut restored = Decimal::ZERO;
    for allocation in allocations {
        if let Some(batch) = batches.iter_mut().find(|b| b.id() == allocation.batch_id) {
            batch.put_back(allocation.quantity_taken);
            restored += allocation.quantity_taken;
        }
    }
    material.apply_receipt(restored);
}

/// Register a received batch against its material.
///
/// The batch itself is stored by the caller; this validates ownership and
/// keeps the material's on-hand total in step.
pub fn receive(
    material: &mut Material,
    batch: &StockBatch,
    now: DateTime<Utc>,
) -> DomainResult<InventoryEvent> {
    if batch.material_id() != *material.id() {
        return Err(DomainError::validation(
            "batch does not belong to this material",
        ));
    }
    if batch.quantity() <= Decimal::ZERO {
        return Err(DomainError::validation("batch quantity must be positive"));
    }
    if batch.remaining_quantity() != batch.quantity() {
        return Err(DomainError::validation(
            "received batch must be untouched (remaining == quantity)",
        ));
    }

    material.apply_receipt(batch.quantity());

    Ok(InventoryEvent::StockReceived(StockReceived {
        material_id: material.id().to_owned(),
        batch_id: batch.id(),
        quantity: batch.quantity(),
        occurred_at: now,
    }))
}

/// Batches with remaining stock expiring within `[today, today + window_days]`.
pub fn classify_expiring(
    batches: &[StockBatch],
    today: NaiveDate,
    window_days: u64,
) -> Vec<&StockBatch> {
    let horizon = today
        .checked_add_days(Days::new(window_days))
        .unwrap_or(NaiveDate::MAX);
    batches
        .iter()
        .filter(|b| b.is_available())
        .filter(|b| {
            b.expiry_date()
                .is_some_and(|d| d >= today && d <= horizon)
        })
        .collect()
}

/// Batches that still hold stock past their expiry date.
pub fn classify_expired(batches: &[StockBatch], today: NaiveDate) -> Vec<&StockBatch> {
    batches
        .iter()
        .filter(|b| b.is_available() && b.is_expired(today))
        .collect()
}

fn fefo_key(batch: &StockBatch) -> (bool, NaiveDate, NaiveDate) {
    (
        batch.expiry_date().is_none(),
        batch.expiry_date().unwrap_or(NaiveDate::MAX),
        batch.received_date(),
    )
}

fn ensure_owned(material: &Material, batches: &[StockBatch]) -> DomainResult<()> {
    if batches.iter().any(|b| b.material_id() != *material.id()) {
        return Err(DomainError::validation(
            "batch does not belong to this material",
        ));
    }
    Ok(())
}
