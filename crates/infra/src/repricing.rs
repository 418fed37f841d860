//! Order repricing behind the per-order exclusive scope.
//!
//! Item mutations and the recomputation they trigger run in one unit of
//! work, so two racing mutations of the same order cannot interleave and
//! lose an update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use larder_catalog::Product;
use larder_core::{DomainResult, Entity, OrderId};
use larder_events::EventDispatcher;
use larder_orders::{Order, OrderItem};

use crate::events::CoreEvent;
use crate::store::{CatalogStore, OrderStore};

/// Recomputes order totals whenever order state changes.
pub struct RepricingService<O, C> {
    orders: O,
    catalog: C,
    events: Arc<EventDispatcher<CoreEvent>>,
}

impl<O, C> RepricingService<O, C>
where
    O: OrderStore,
    C: CatalogStore,
{
    pub fn new(orders: O, catalog: C, events: Arc<EventDispatcher<CoreEvent>>) -> Self {
        Self {
            orders,
            catalog,
            events,
        }
    }

    /// Apply a mutation to an order and recompute its totals in the same
    /// exclusive scope. Returns the updated order.
    pub fn mutate_and_reprice(
        &self,
        order_id: OrderId,
        now: DateTime<Utc>,
        mutate: impl FnOnce(&mut Order, &mut Vec<OrderItem>) -> DomainResult<()>,
    ) -> DomainResult<Order> {
        let (order_after, event) = self.orders.with_order(order_id, |order, items| {
            mutate(order, items)?;

            let mut products: Vec<Product> = Vec::with_capacity(items.len());
            for item in items.iter() {
                products.push(self.catalog.product(item.product_id)?);
            }
            let saved = self.catalog.saved_discounts()?;

            let event = larder_orders::reprice(order, items, &products, &saved, now)?;
            Ok((order.clone(), event))
        })?;

        // Committed; notify subscribers.
        self.events.dispatch(&CoreEvent::Order(event));
        debug!(%order_id, total = %order_after.total_amount, "order repriced");
        Ok(order_after)
    }

    /// Recompute totals without changing order state.
    pub fn reprice_order(&self, order_id: OrderId, now: DateTime<Utc>) -> DomainResult<Order> {
        self.mutate_and_reprice(order_id, now, |_order, _items| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_catalog::Discount;
    use larder_core::{OrderItemId, ProductId};
    use larder_orders::ServiceType;
    use rust_decimal_macros::dec;

    use crate::store::{InMemoryCatalogStore, InMemoryOrderStore};

    fn now() -> DateTime<Utc> {
        "2026-02-01T12:30:00Z".parse().unwrap()
    }

    fn service() -> (
        RepricingService<Arc<InMemoryOrderStore>, Arc<InMemoryCatalogStore>>,
        Arc<InMemoryOrderStore>,
        Arc<InMemoryCatalogStore>,
    ) {
        let orders = Arc::new(InMemoryOrderStore::new());
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let service = RepricingService::new(
            orders.clone(),
            catalog.clone(),
            Arc::new(EventDispatcher::new()),
        );
        (service, orders, catalog)
    }

    #[test]
    fn quantity_change_recomputes_totals() {
        let (service, orders, catalog) = service();

        let product = Product::new(ProductId::new(), "Latte", dec!(10)).service_eligible(false);
        let product_id = product.id;
        catalog.put_product(product).unwrap();

        let order = Order::new(OrderId::new(), ServiceType::Takeaway);
        let order_id = *order.id();
        let item = OrderItem::new(OrderItemId::new(), order_id, product_id, dec!(10), 3);
        orders.put_order(order, vec![item]).unwrap();

        let order = service.reprice_order(order_id, now()).unwrap();
        assert_eq!(order.sub_total, dec!(30));
        assert_eq!(order.total_amount, dec!(34.2));

        let order = service
            .mutate_and_reprice(order_id, now(), |_order, items| {
                items[0].quantity = 5;
                Ok(())
            })
            .unwrap();
        assert_eq!(order.sub_total, dec!(50));
        assert_eq!(order.total_amount, dec!(57));

        // The recomputation persisted.
        let (stored, items) = orders.snapshot(order_id).unwrap();
        assert_eq!(stored.total_amount, dec!(57));
        assert_eq!(items[0].sub_total, dec!(50));
    }

    #[test]
    fn discarded_order_discount_stays_discarded() {
        let (service, orders, catalog) = service();

        let product = Product::new(ProductId::new(), "Cake", dec!(100))
            .service_eligible(false)
            .tax_eligible(false);
        let product_id = product.id;
        catalog.put_product(product).unwrap();

        let order = Order::new(OrderId::new(), ServiceType::Takeaway)
            .with_discount(Discount::Percentage(dec!(80)));
        let order_id = *order.id();
        let item = OrderItem::new(OrderItemId::new(), order_id, product_id, dec!(100), 1)
            .with_discount(Discount::Cash(dec!(50)));
        orders.put_order(order, vec![item]).unwrap();

        // 50 + 80 = 130 > 100: order discount is discarded and reset.
        let order = service.reprice_order(order_id, now()).unwrap();
        assert_eq!(order.discount_value, dec!(50));
        assert!(order.discount.is_none());

        // The next recomputation keeps only the item discount.
        let order = service.reprice_order(order_id, now()).unwrap();
        assert_eq!(order.discount_value, dec!(50));
    }
}
