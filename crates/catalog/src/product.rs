//! Sellable products and their pricing attributes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::ProductId;

use crate::discount::Discount;

/// A sellable product.
///
/// Eligibility flags decide whether the dine-in service charge and the sales
/// tax apply to order items for this product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit selling price.
    pub price: Decimal,
    /// Whether sales tax applies to this product.
    pub tax_eligible: bool,
    /// Whether the dine-in service charge applies to this product.
    pub service_eligible: bool,
    /// Product-level discount, applied before any item-level discount.
    pub discount: Discount,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            tax_eligible: true,
            service_eligible: true,
            discount: Discount::None,
        }
    }

    pub fn tax_eligible(mut self, eligible: bool) -> Self {
        self.tax_eligible = eligible;
        self
    }

    pub fn service_eligible(mut self, eligible: bool) -> Self {
        self.service_eligible = eligible;
        self
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }
}
