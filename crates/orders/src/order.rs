//! Orders and order items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_catalog::Discount;
use larder_core::{Entity, OrderId, OrderItemId, ProductId};

/// How the order is served.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    DineIn,
    Takeaway,
    Delivery,
}

impl ServiceType {
    /// Only dine-in orders attract the service charge.
    pub fn is_dine_in(&self) -> bool {
        matches!(self, ServiceType::DineIn)
    }
}

/// Order lifecycle status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Paid,
    Cancelled,
}

impl OrderStatus {
    /// Whether inventory consumption may run for an order in this status.
    pub fn triggers_fulfillment(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Paid)
    }
}

/// One line of an order.
///
/// The computed fields are owned by the pricing engine and fully rewritten on
/// every recomputation; nothing patches them incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Unit price as sold (copied from the product at order time).
    pub price: Decimal,
    pub quantity: u32,
    pub discount: Discount,

    // Computed by the pricing engine.
    pub sub_total: Decimal,
    pub discount_value: Decimal,
    pub service: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderItem {
    pub fn new(
        id: OrderItemId,
        order_id: OrderId,
        product_id: ProductId,
        price: Decimal,
        quantity: u32,
    ) -> Self {
        Self {
            id,
            order_id,
            product_id,
            price,
            quantity,
            discount: Discount::None,
            sub_total: Decimal::ZERO,
            discount_value: Decimal::ZERO,
            service: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }
}

/// An order with engine-computed financial totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    pub service_type: ServiceType,
    pub status: OrderStatus,
    pub discount: Discount,

    // Computed by the pricing engine.
    pub sub_total: Decimal,
    pub discount_value: Decimal,
    pub service: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,

    /// Set once inventory consumption has run for this order; makes
    /// at-least-once fulfillment dispatch idempotent.
    inventory_processed: bool,
    version: u64,
}

impl Order {
    pub fn new(id: OrderId, service_type: ServiceType) -> Self {
        Self {
            id,
            service_type,
            status: OrderStatus::Pending,
            discount: Discount::None,
            sub_total: Decimal::ZERO,
            discount_value: Decimal::ZERO,
            service: Decimal::ZERO,
            tax: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            inventory_processed: false,
            version: 0,
        }
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_inventory_processed(&self) -> bool {
        self.inventory_processed
    }

    pub fn mark_inventory_processed(&mut self) {
        self.inventory_processed = true;
        self.version += 1;
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
        self.version += 1;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
