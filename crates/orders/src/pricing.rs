//! Order pricing: discounts, service charge, and tax.
//!
//! Everything here is a pure function of `(order, items, products, saved
//! discounts)`. Identical inputs produce bit-identical outputs, so callers
//! may recompute as often as they like; computed fields are fully rewritten
//! on every run, never patched.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use larder_catalog::{Discount, Product, SavedDiscount};
use larder_core::{DomainError, DomainResult, Entity, OrderId};
use larder_events::Event;

use crate::order::{Order, OrderItem, ServiceType};

/// Dine-in service charge rate (12%).
pub fn service_rate() -> Decimal {
    Decimal::new(12, 2)
}

/// Sales tax rate (14%).
pub fn tax_rate() -> Decimal {
    Decimal::new(14, 2)
}

/// Computed totals for one order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTotals {
    pub sub_total: Decimal,
    pub discount_value: Decimal,
    pub service: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Computed totals for a whole order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub sub_total: Decimal,
    pub discount_value: Decimal,
    pub service: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    /// True when the order-level discount was discarded because the combined
    /// discount would have exceeded the order sub-total.
    pub order_discount_discarded: bool,
}

/// Event: OrderRepriced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRepriced {
    pub order_id: OrderId,
    pub total_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderInventoryProcessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInventoryProcessed {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderRepriced(OrderRepriced),
    OrderInventoryProcessed(OrderInventoryProcessed),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderRepriced(_) => "orders.repriced",
            OrderEvent::OrderInventoryProcessed(_) => "orders.inventory_processed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderRepriced(e) => e.occurred_at,
            OrderEvent::OrderInventoryProcessed(e) => e.occurred_at,
        }
    }
}

/// Round a percentage-derived amount to currency precision.
fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Currency amount of one configured discount against a sub-total.
///
/// An unresolvable saved-discount reference contributes zero; reference
/// validation happens at the store boundary, before pricing runs.
fn discount_amount(discount: &Discount, sub_total: Decimal, saved: &[SavedDiscount]) -> Decimal {
    match discount {
        Discount::None => Decimal::ZERO,
        Discount::Cash(amount) => *amount,
        Discount::Percentage(percent) => round_money(sub_total * percent / Decimal::ONE_HUNDRED),
        Discount::Saved(id) => saved
            .iter()
            .find(|s| s.id == *id)
            .map(|s| round_money(sub_total * s.percent / Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO),
    }
}

/// Price one order item.
///
/// Discount = product-level discount + item-level discount, both against the
/// item sub-total. A combined discount exceeding the sub-total resets to
/// zero: an item never prices below zero.
pub fn price_item(
    item: &OrderItem,
    product: &Product,
    service_type: ServiceType,
    saved: &[SavedDiscount],
) -> ItemTotals {
    let sub_total = item.price * Decimal::from(item.quantity);

    let mut discount_value = discount_amount(&product.discount, sub_total, saved)
        + discount_amount(&item.discount, sub_total, saved);
    if discount_value > sub_total {
        discount_value = Decimal::ZERO;
    }

    let service = if service_type.is_dine_in() && product.service_eligible {
        round_money((sub_total - discount_value) * service_rate())
    } else {
        Decimal::ZERO
    };

    let tax = if product.tax_eligible {
        round_money((sub_total - discount_value + service) * tax_rate())
    } else {
        Decimal::ZERO
    };

    ItemTotals {
        sub_total,
        discount_value,
        service,
        tax,
        total: sub_total - discount_value + service + tax,
    }
}

/// Price a whole order from its lines.
///
/// Item discounts are summed first; the order-level discount is applied on
/// top. If the combined discount would exceed the order sub-total, the
/// order-level discount is discarded entirely and only item discounts
/// remain.
pub fn price_order(
    order: &Order,
    lines: &[(&OrderItem, &Product)],
    saved: &[SavedDiscount],
) -> (OrderTotals, Vec<ItemTotals>) {
    let item_totals: Vec<ItemTotals> = lines
        .iter()
        .map(|(item, product)| price_item(item, product, order.service_type, saved))
        .collect();

    let sub_total: Decimal = item_totals.iter().map(|t| t.sub_total).sum();
    let item_discounts: Decimal = item_totals.iter().map(|t| t.discount_value).sum();

    let order_discount = discount_amount(&order.discount, sub_total, saved);
    let combined = item_discounts + order_discount;
    let (discount_value, order_discount_discarded) = if combined > sub_total {
        (item_discounts, true)
    } else {
        (combined, false)
    };

    let service = if order.service_type.is_dine_in() {
        round_money((sub_total - discount_value) * service_rate())
    } else {
        Decimal::ZERO
    };
    let tax = round_money((sub_total - discount_value + service) * tax_rate());

    let totals = OrderTotals {
        sub_total,
        discount_value,
        service,
        tax,
        total_amount: sub_total - discount_value + service + tax,
        order_discount_discarded,
    };

    (totals, item_totals)
}

/// Recompute and persist the computed fields of an order and its items.
///
/// A discarded order-level discount is reset to `Discount::None` on the
/// order, so the over-discount cannot reapply on the next recomputation.
pub fn reprice(
    order: &mut Order,
    items: &mut [OrderItem],
    products: &[Product],
    saved: &[SavedDiscount],
    now: DateTime<Utc>,
) -> DomainResult<OrderEvent> {
    let lines: Vec<(&OrderItem, &Product)> = items
        .iter()
        .map(|item| {
            products
                .iter()
                .find(|p| p.id == item.product_id)
                .map(|p| (item, p))
                .ok_or(DomainError::NotFound)
        })
        .collect::<DomainResult<_>>()?;

    let (order_totals, item_totals) = price_order(order, &lines, saved);

    for (item, totals) in items.iter_mut().zip(&item_totals) {
        item.sub_total = totals.sub_total;
        item.discount_value = totals.discount_value;
        item.service = totals.service;
        item.tax = totals.tax;
        item.total = totals.total;
    }

    order.sub_total = order_totals.sub_total;
    order.discount_value = order_totals.discount_value;
    order.service = order_totals.service;
    order.tax = order_totals.tax;
    order.total_amount = order_totals.total_amount;
    if order_totals.order_discount_discarded {
        order.discount = Discount::None;
    }
    order.bump_version();

    Ok(OrderEvent::OrderRepriced(OrderRepriced {
        order_id: *order.id(),
        total_amount: order.total_amount,
        occurred_at: now,
    }))
}
