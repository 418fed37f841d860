//! Received stock batches.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{BatchId, MaterialId};

/// A discrete received batch of one material.
///
/// Invariant: `0 <= remaining_quantity <= quantity`. Batches are mutated only
/// through the ledger (`consume`), never directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBatch {
    id: BatchId,
    material_id: MaterialId,
    received_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    quantity: Decimal,
    remaining_quantity: Decimal,
    /// Cost per stock unit at receipt.
    unit_cost: Decimal,
}

impl StockBatch {
    pub fn new(
        id: BatchId,
        material_id: MaterialId,
        received_date: NaiveDate,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            id,
            material_id,
            received_date,
            expiry_date: None,
            quantity,
            remaining_quantity: quantity,
            unit_cost,
        }
    }

    pub fn with_expiry(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn received_date(&self) -> NaiveDate {
        self.received_date
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn remaining_quantity(&self) -> Decimal {
        self.remaining_quantity
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    /// Whether any stock remains in this batch.
    pub fn is_available(&self) -> bool {
        self.remaining_quantity > Decimal::ZERO
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|d| d < today)
    }

    /// Days until expiry, negative once expired. `None` for non-perishable
    /// batches without an expiry date.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|d| (d - today).num_days())
    }

    /// Take up to `wanted` from this batch, returning what was actually taken.
    pub(crate) fn take(&mut self, wanted: Decimal) -> Decimal {
        let taken = wanted.min(self.remaining_quantity);
        self.remaining_quantity -= taken;
        taken
    }

    /// Restore previously taken stock (compensation path).
    pub(crate) fn put_back(&mut self, quantity: Decimal) {
        self.remaining_quantity = (self.remaining_quantity + quantity).min(self.quantity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn take_is_capped_at_remaining() {
        let mut batch = StockBatch::new(
            BatchId::new(),
            MaterialId::new(),
            date(2026, 1, 10),
            dec!(5),
            dec!(2.50),
        );

        assert_eq!(batch.take(dec!(3)), dec!(3));
        assert_eq!(batch.remaining_quantity(), dec!(2));
        assert_eq!(batch.take(dec!(10)), dec!(2));
        assert_eq!(batch.remaining_quantity(), dec!(0));
        assert!(!batch.is_available());
    }

    #[test]
    fn put_back_never_exceeds_original_quantity() {
        let mut batch = StockBatch::new(
            BatchId::new(),
            MaterialId::new(),
            date(2026, 1, 10),
            dec!(5),
            dec!(1),
        );
        batch.take(dec!(4));
        batch.put_back(dec!(10));
        assert_eq!(batch.remaining_quantity(), dec!(5));
    }

    #[test]
    fn expiry_accounting_relative_to_today() {
        let batch = StockBatch::new(
            BatchId::new(),
            MaterialId::new(),
            date(2026, 1, 1),
            dec!(1),
            dec!(1),
        )
        .with_expiry(date(2026, 1, 10));

        assert_eq!(batch.days_until_expiry(date(2026, 1, 8)), Some(2));
        assert!(!batch.is_expired(date(2026, 1, 10)));
        assert!(batch.is_expired(date(2026, 1, 11)));
        assert_eq!(batch.days_until_expiry(date(2026, 1, 12)), Some(-2));
    }
}
