//! `larder-orders` — orders, order items, and the pricing engine.
//!
//! Pricing is a pure function of the order, its items, and the referenced
//! catalog data; the engine owns every computed financial field and rewrites
//! them wholesale on each run.

pub mod order;
pub mod pricing;

pub use order::{Order, OrderItem, OrderStatus, ServiceType};
pub use pricing::{
    ItemTotals, OrderEvent, OrderInventoryProcessed, OrderRepriced, OrderTotals, price_item,
    price_order, reprice, service_rate, tax_rate,
};
