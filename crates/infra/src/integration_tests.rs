//! End-to-end flows across stores, workflows, and broadcasting.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use larder_broadcast::{BroadcastDispatcher, ChannelMessage};
use larder_catalog::{Product, Recipe};
use larder_core::{BatchId, DomainError, Entity, MaterialId, OrderItemId, ProductId, RecipeId};
use larder_events::{EventBus, EventDispatcher, InMemoryEventBus, Subscription};
use larder_inventory::{Material, StockBatch};
use larder_orders::{Order, OrderItem, OrderStatus, ServiceType};

use crate::events::register_broadcast_routes;
use crate::fulfillment::{FulfillmentService, ShortfallPolicy};
use crate::store::{
    AlertStore, CatalogStore, InMemoryAlertStore, InMemoryCatalogStore, InMemoryInventoryStore,
    InMemoryOrderStore, InventoryStore, OrderStore,
};

type Stores = (
    Arc<InMemoryInventoryStore>,
    Arc<InMemoryAlertStore>,
    Arc<InMemoryCatalogStore>,
    Arc<InMemoryOrderStore>,
);

type Service = FulfillmentService<
    Arc<InMemoryInventoryStore>,
    Arc<InMemoryAlertStore>,
    Arc<InMemoryCatalogStore>,
    Arc<InMemoryOrderStore>,
>;

fn now() -> DateTime<Utc> {
    "2026-02-01T18:00:00Z".parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Full wiring: stores, broadcast routes, fulfillment service, and a
/// subscription on the outbound bus.
fn wire() -> (Stores, Service, Subscription<ChannelMessage>) {
    let inventory = Arc::new(InMemoryInventoryStore::new());
    let alerts = Arc::new(InMemoryAlertStore::new());
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let orders = Arc::new(InMemoryOrderStore::new());

    let bus = Arc::new(InMemoryEventBus::new());
    let subscription = bus.subscribe();
    let broadcaster = Arc::new(BroadcastDispatcher::new(bus));

    let mut dispatcher = EventDispatcher::new();
    register_broadcast_routes(&mut dispatcher, broadcaster, catalog.clone());
    let events = Arc::new(dispatcher);

    let service = FulfillmentService::new(
        inventory.clone(),
        alerts.clone(),
        catalog.clone(),
        orders.clone(),
        events,
    );

    ((inventory, alerts, catalog, orders), service, subscription)
}

/// Seed: one material (cream, min 3) with two batches (5 expiring
/// tomorrow, 10 expiring in ten days), one product whose recipe takes
/// 200 ml per unit, and a completed order.
fn seed_cream_order(stores: &Stores, quantity: u32) -> (MaterialId, BatchId, BatchId, larder_core::OrderId) {
    let (inventory, _alerts, catalog, orders) = stores;

    let cream = Material::new(MaterialId::new(), "Cream", "l", "ml", dec!(1000))
        .with_levels(dec!(3), dec!(0))
        .with_quantity(dec!(15));
    let material_id = *cream.id();
    let near = StockBatch::new(BatchId::new(), material_id, date(2026, 1, 30), dec!(5), dec!(2))
        .with_expiry(date(2026, 2, 2));
    let far = StockBatch::new(BatchId::new(), material_id, date(2026, 1, 31), dec!(10), dec!(2))
        .with_expiry(date(2026, 2, 11));
    let near_id = near.id();
    let far_id = far.id();
    inventory.put_material(cream, vec![near, far]).unwrap();

    let product = Product::new(ProductId::new(), "Panna Cotta", dec!(6));
    let product_id = product.id;
    catalog.put_product(product).unwrap();
    catalog
        .put_recipe(Recipe::new(RecipeId::new(), product_id).with_component(material_id, dec!(200)))
        .unwrap();

    let order = Order::new(larder_core::OrderId::new(), ServiceType::DineIn)
        .with_status(OrderStatus::Completed);
    let order_id = *order.id();
    let item = OrderItem::new(OrderItemId::new(), order_id, product_id, dec!(6), quantity);
    orders.put_order(order, vec![item]).unwrap();

    (material_id, near_id, far_id, order_id)
}

#[test]
fn completed_order_consumes_fefo_and_broadcasts() {
    let (stores, service, subscription) = wire();
    // 60 units * 200 ml = 12 l: drains the near batch (5) then 7 from the far.
    let (material_id, near_id, far_id, order_id) = seed_cream_order(&stores, 60);
    let (inventory, _alerts, _catalog, orders) = &stores;

    let report = service
        .process_order(order_id, ShortfallPolicy::Abort, now())
        .unwrap();

    assert!(!report.skipped);
    assert_eq!(report.consumed.len(), 1);
    let allocations = &report.consumed[0].1;
    assert_eq!(allocations.len(), 2);
    assert_eq!(allocations[0].batch_id, near_id);
    assert_eq!(allocations[0].quantity_taken, dec!(5));
    assert_eq!(allocations[1].batch_id, far_id);
    assert_eq!(allocations[1].quantity_taken, dec!(7));

    let (material, batches) = inventory.snapshot(material_id).unwrap();
    assert_eq!(material.quantity(), dec!(3));
    let remaining: Decimal = batches.iter().map(|b| b.remaining_quantity()).sum();
    assert_eq!(remaining, dec!(3));

    let (order, _items) = orders.snapshot(order_id).unwrap();
    assert!(order.is_inventory_processed());

    // Broadcasts, in post-commit order: one InventoryChanged per touched
    // batch, each followed by the recipe-cost fan-out, then the alert and
    // order notifications.
    let mut channels = Vec::new();
    while let Ok(message) = subscription.try_recv() {
        channels.push(message.channel);
    }
    assert_eq!(
        channels,
        vec![
            "inventory-updates",
            "recipe-costs",
            "inventory-updates",
            "recipe-costs",
            "alerts",
            "orders",
        ]
    );
}

#[test]
fn consumption_that_crosses_the_minimum_raises_low_stock() {
    let (stores, service, _subscription) = wire();
    let (material_id, _near, _far, order_id) = seed_cream_order(&stores, 60);
    let (_inventory, alerts, _catalog, _orders) = &stores;

    service
        .process_order(order_id, ShortfallPolicy::Abort, now())
        .unwrap();

    // 15 l - 12 l = 3 l, at the minimum of 3: low stock.
    let unresolved = alerts.unresolved_for(material_id).unwrap();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].alert_type, larder_alerts::AlertType::LowStock);
}

#[test]
fn reprocessing_a_processed_order_is_a_no_op() {
    let (stores, service, subscription) = wire();
    let (material_id, _near, _far, order_id) = seed_cream_order(&stores, 10);
    let (inventory, _alerts, _catalog, _orders) = &stores;

    service
        .process_order(order_id, ShortfallPolicy::Abort, now())
        .unwrap();
    while subscription.try_recv().is_ok() {}

    // At-least-once delivery: the duplicate dispatch consumes nothing.
    let report = service
        .process_order(order_id, ShortfallPolicy::Abort, now())
        .unwrap();
    assert!(report.skipped);
    assert!(subscription.try_recv().is_err());

    let (material, _batches) = inventory.snapshot(material_id).unwrap();
    assert_eq!(material.quantity(), dec!(13));
}

#[test]
fn abort_policy_rolls_the_whole_order_back() {
    let (stores, service, subscription) = wire();
    let (inventory, _alerts, catalog, orders) = &stores;

    // Two materials; the second cannot cover its requirement.
    let flour = Material::new(MaterialId::new(), "Flour", "kg", "g", dec!(1000))
        .with_quantity(dec!(10));
    let flour_id = *flour.id();
    let flour_batch = StockBatch::new(BatchId::new(), flour_id, date(2026, 1, 1), dec!(10), dec!(1));
    inventory.put_material(flour, vec![flour_batch]).unwrap();

    let saffron = Material::new(MaterialId::new(), "Saffron", "g", "g", dec!(0))
        .with_quantity(dec!(1));
    let saffron_id = *saffron.id();
    let saffron_batch = StockBatch::new(BatchId::new(), saffron_id, date(2026, 1, 1), dec!(1), dec!(50));
    inventory.put_material(saffron, vec![saffron_batch]).unwrap();

    let product = Product::new(ProductId::new(), "Saffron Bun", dec!(4));
    let product_id = product.id;
    catalog.put_product(product).unwrap();
    catalog
        .put_recipe(
            Recipe::new(RecipeId::new(), product_id)
                .with_component(flour_id, dec!(100))
                .with_component(saffron_id, dec!(0.5)),
        )
        .unwrap();

    let order = Order::new(larder_core::OrderId::new(), ServiceType::Takeaway)
        .with_status(OrderStatus::Paid);
    let order_id = *order.id();
    let item = OrderItem::new(OrderItemId::new(), order_id, product_id, dec!(4), 4);
    orders.put_order(order, vec![item]).unwrap();

    // Needs 2 g of saffron but only 1 g remains.
    let err = service
        .process_order(order_id, ShortfallPolicy::Abort, now())
        .unwrap_err();
    assert_eq!(err.shortfall(), Some(dec!(1)));

    // The flour consumption was undone; nothing was broadcast.
    let (flour, batches) = inventory.snapshot(flour_id).unwrap();
    assert_eq!(flour.quantity(), dec!(10));
    assert_eq!(batches[0].remaining_quantity(), dec!(10));
    assert!(subscription.try_recv().is_err());

    let (order, _items) = orders.snapshot(order_id).unwrap();
    assert!(!order.is_inventory_processed());
}

#[test]
fn record_and_continue_reports_the_shortfall() {
    let (stores, service, _subscription) = wire();
    let (inventory, _alerts, catalog, orders) = &stores;

    let saffron = Material::new(MaterialId::new(), "Saffron", "g", "g", dec!(0))
        .with_quantity(dec!(1));
    let saffron_id = *saffron.id();
    let batch = StockBatch::new(BatchId::new(), saffron_id, date(2026, 1, 1), dec!(1), dec!(50));
    inventory.put_material(saffron, vec![batch]).unwrap();

    let product = Product::new(ProductId::new(), "Saffron Tea", dec!(3));
    let product_id = product.id;
    catalog.put_product(product).unwrap();
    catalog
        .put_recipe(Recipe::new(RecipeId::new(), product_id).with_component(saffron_id, dec!(2)))
        .unwrap();

    let order = Order::new(larder_core::OrderId::new(), ServiceType::Takeaway)
        .with_status(OrderStatus::Completed);
    let order_id = *order.id();
    let item = OrderItem::new(OrderItemId::new(), order_id, product_id, dec!(3), 1);
    orders.put_order(order, vec![item]).unwrap();

    let report = service
        .process_order(order_id, ShortfallPolicy::RecordAndContinue, now())
        .unwrap();

    assert_eq!(report.shortfalls.len(), 1);
    assert_eq!(report.shortfalls[0].material_id, saffron_id);
    assert_eq!(report.shortfalls[0].requested, dec!(2));
    assert_eq!(report.shortfalls[0].available, dec!(1));

    // The order still completes its workflow and will not be reprocessed.
    let (order, _items) = orders.snapshot(order_id).unwrap();
    assert!(order.is_inventory_processed());
}

#[test]
fn pending_orders_do_not_consume_inventory() {
    let (stores, service, _subscription) = wire();
    let (_material_id, _near, _far, order_id) = seed_cream_order(&stores, 1);
    let (_inventory, _alerts, _catalog, orders) = &stores;

    orders
        .with_order(order_id, |order, _items| {
            order.set_status(OrderStatus::Pending);
            Ok(())
        })
        .unwrap();

    let err = service
        .process_order(order_id, ShortfallPolicy::Abort, now())
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}
