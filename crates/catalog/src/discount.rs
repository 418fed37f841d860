//! Discount configuration shared by products, order items, and orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::DiscountId;

/// A discount as configured on a product, an order item, or an order.
///
/// How each variant turns into a currency amount is the pricing engine's
/// concern; this type only records what was configured.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// No discount configured.
    #[default]
    None,
    /// Flat amount subtracted from the sub-total.
    Cash(Decimal),
    /// Percentage of the sub-total (0–100).
    Percentage(Decimal),
    /// Reference to a reusable saved discount.
    Saved(DiscountId),
}

impl Discount {
    pub fn is_none(&self) -> bool {
        matches!(self, Discount::None)
    }
}

/// A reusable, named percentage discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDiscount {
    pub id: DiscountId,
    pub name: String,
    /// Percentage of the sub-total (0–100).
    pub percent: Decimal,
}

impl SavedDiscount {
    pub fn new(id: DiscountId, name: impl Into<String>, percent: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            percent,
        }
    }
}
