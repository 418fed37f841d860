//! Application-level domain event stream and broadcast routing.
//!
//! The domain crates each emit their own fact type; [`CoreEvent`] is the
//! union the application works with. `register_broadcast_routes` wires the
//! registered-callback dispatcher so that facts drained from an outbox after
//! commit turn into channel broadcasts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use larder_alerts::AlertEvent;
use larder_broadcast::{BroadcastDispatcher, BroadcastEvent, ChannelMessage, StockChange};
use larder_events::{Event, EventBus, EventDispatcher};
use larder_inventory::InventoryEvent;
use larder_orders::OrderEvent;

use crate::store::CatalogStore;

/// Union of every fact the domain core emits.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    Inventory(InventoryEvent),
    Alert(AlertEvent),
    Order(OrderEvent),
}

impl From<InventoryEvent> for CoreEvent {
    fn from(event: InventoryEvent) -> Self {
        CoreEvent::Inventory(event)
    }
}

impl From<AlertEvent> for CoreEvent {
    fn from(event: AlertEvent) -> Self {
        CoreEvent::Alert(event)
    }
}

impl From<OrderEvent> for CoreEvent {
    fn from(event: OrderEvent) -> Self {
        CoreEvent::Order(event)
    }
}

impl Event for CoreEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CoreEvent::Inventory(e) => e.event_type(),
            CoreEvent::Alert(e) => e.event_type(),
            CoreEvent::Order(e) => e.event_type(),
        }
    }

    fn version(&self) -> u32 {
        match self {
            CoreEvent::Inventory(e) => e.version(),
            CoreEvent::Alert(e) => e.version(),
            CoreEvent::Order(e) => e.version(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CoreEvent::Inventory(e) => e.occurred_at(),
            CoreEvent::Alert(e) => e.occurred_at(),
            CoreEvent::Order(e) => e.occurred_at(),
        }
    }
}

/// Wire domain facts to their broadcast translations.
///
/// - batch consumed / stock received → `InventoryChanged`, plus a
///   `RecipeCostChanged` per recipe consuming the material
/// - alert raised → `AlertTriggered`; alert resolved → `DashboardChanged`
/// - order repriced → `DashboardChanged`; order inventory processed →
///   `OrderInventoryProcessed`
pub fn register_broadcast_routes<B, C>(
    dispatcher: &mut EventDispatcher<CoreEvent>,
    broadcaster: Arc<BroadcastDispatcher<B>>,
    catalog: Arc<C>,
) where
    B: EventBus<ChannelMessage> + 'static,
    C: CatalogStore + 'static,
{
    let inventory_broadcaster = broadcaster.clone();
    dispatcher.on("inventory.*", move |event: &CoreEvent| {
        let CoreEvent::Inventory(inventory_event) = event else {
            return;
        };
        match inventory_event {
            InventoryEvent::BatchConsumed(e) => {
                inventory_broadcaster.publish(&BroadcastEvent::InventoryChanged {
                    material_id: e.material_id,
                    change: StockChange::Consumed,
                    occurred_at: e.occurred_at,
                });
                match catalog.recipes_using(e.material_id) {
                    Ok(recipes) => {
                        for recipe in recipes {
                            inventory_broadcaster.publish(&BroadcastEvent::RecipeCostChanged {
                                recipe_id: recipe.id,
                                product_id: recipe.product_id,
                                occurred_at: e.occurred_at,
                            });
                        }
                    }
                    Err(err) => {
                        debug!(error = %err, "recipe lookup failed during broadcast routing");
                    }
                }
            }
            InventoryEvent::StockReceived(e) => {
                inventory_broadcaster.publish(&BroadcastEvent::InventoryChanged {
                    material_id: e.material_id,
                    change: StockChange::Received,
                    occurred_at: e.occurred_at,
                });
            }
        }
    });

    let alert_broadcaster = broadcaster.clone();
    dispatcher.on("alerts.*", move |event: &CoreEvent| {
        let CoreEvent::Alert(alert_event) = event else {
            return;
        };
        match alert_event {
            AlertEvent::AlertRaised(e) => {
                alert_broadcaster.publish(&BroadcastEvent::AlertTriggered {
                    alert_id: e.alert_id,
                    material_id: e.material_id,
                    alert_type: e.alert_type.as_str().to_string(),
                    severity: format!("{:?}", e.severity).to_lowercase(),
                    occurred_at: e.occurred_at,
                });
            }
            AlertEvent::AlertResolved(e) => {
                alert_broadcaster.publish(&BroadcastEvent::DashboardChanged {
                    occurred_at: e.occurred_at,
                });
            }
        }
    });

    dispatcher.on("orders.*", move |event: &CoreEvent| {
        let CoreEvent::Order(order_event) = event else {
            return;
        };
        match order_event {
            OrderEvent::OrderRepriced(e) => {
                broadcaster.publish(&BroadcastEvent::DashboardChanged {
                    occurred_at: e.occurred_at,
                });
            }
            OrderEvent::OrderInventoryProcessed(e) => {
                broadcaster.publish(&BroadcastEvent::OrderInventoryProcessed {
                    order_id: e.order_id,
                    occurred_at: e.occurred_at,
                });
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_catalog::Recipe;
    use larder_core::{BatchId, MaterialId, ProductId, RecipeId};
    use larder_events::InMemoryEventBus;
    use larder_inventory::BatchConsumed;
    use rust_decimal_macros::dec;

    use crate::store::InMemoryCatalogStore;

    fn now() -> DateTime<Utc> {
        "2026-02-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn batch_consumption_routes_to_inventory_and_recipe_channels() {
        let bus = Arc::new(InMemoryEventBus::new());
        let subscription = bus.subscribe();
        let broadcaster = Arc::new(BroadcastDispatcher::new(bus));

        let material_id = MaterialId::new();
        let catalog = Arc::new(InMemoryCatalogStore::new());
        catalog
            .put_recipe(
                Recipe::new(RecipeId::new(), ProductId::new()).with_component(material_id, dec!(1)),
            )
            .unwrap();

        let mut dispatcher = EventDispatcher::new();
        register_broadcast_routes(&mut dispatcher, broadcaster, catalog);

        let event = CoreEvent::Inventory(InventoryEvent::BatchConsumed(BatchConsumed {
            material_id,
            batch_id: BatchId::new(),
            quantity_taken: dec!(2),
            batch_remaining: dec!(3),
            occurred_at: now(),
        }));
        dispatcher.dispatch(&event);

        let first = subscription.try_recv().unwrap();
        assert_eq!(first.channel, "inventory-updates");
        let second = subscription.try_recv().unwrap();
        assert_eq!(second.channel, "recipe-costs");
        assert!(subscription.try_recv().is_err());
    }

    #[test]
    fn order_processing_routes_to_the_orders_channel() {
        let bus = Arc::new(InMemoryEventBus::new());
        let subscription = bus.subscribe();
        let broadcaster = Arc::new(BroadcastDispatcher::new(bus));
        let catalog = Arc::new(InMemoryCatalogStore::new());

        let mut dispatcher = EventDispatcher::new();
        register_broadcast_routes(&mut dispatcher, broadcaster, catalog);

        let event = CoreEvent::Order(larder_orders::OrderEvent::OrderInventoryProcessed(
            larder_orders::OrderInventoryProcessed {
                order_id: larder_core::OrderId::new(),
                occurred_at: now(),
            },
        ));
        dispatcher.dispatch(&event);

        let message = subscription.try_recv().unwrap();
        assert_eq!(message.channel, "orders");
    }
}
