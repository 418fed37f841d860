//! In-memory store implementations for tests/dev.
//!
//! The per-entity cell layout mirrors what a row-locking database gives the
//! core: `with_material`/`with_order` hold the cell's mutex for the whole
//! read-allocate-write sequence, and mutations are written back only when
//! the closure succeeds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use larder_alerts::{AlertType, StockAlert};
use larder_catalog::{Product, Recipe, SavedDiscount};
use larder_core::{
    AlertId, DomainError, DomainResult, Entity, ExpectedVersion, MaterialId, OrderId, ProductId,
    RecipeId, UserId,
};
use larder_inventory::{Material, StockBatch};
use larder_orders::{Order, OrderItem};

use super::{
    AlertStore, CatalogStore, HistoryStore, InventoryStore, OrderStore, RaiseOutcome,
    StockHistoryEntry,
};

#[derive(Debug, Clone)]
struct MaterialCell {
    material: Material,
    batches: Vec<StockBatch>,
}

/// In-memory inventory store.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    cells: RwLock<HashMap<MaterialId, Arc<Mutex<MaterialCell>>>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn put_material(&self, material: Material, batches: Vec<StockBatch>) -> DomainResult<()> {
        let mut cells = self.cells.write().unwrap();
        cells.insert(
            *material.id(),
            Arc::new(Mutex::new(MaterialCell { material, batches })),
        );
        Ok(())
    }

    fn material_ids(&self) -> DomainResult<Vec<MaterialId>> {
        let cells = self.cells.read().unwrap();
        let mut ids: Vec<MaterialId> = cells.keys().copied().collect();
        ids.sort_by_key(|id| *id.as_uuid());
        Ok(ids)
    }

    fn snapshot(&self, id: MaterialId) -> DomainResult<(Material, Vec<StockBatch>)> {
        let cell = self
            .cells
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;
        let guard = cell.lock().unwrap();
        Ok((guard.material.clone(), guard.batches.clone()))
    }

    fn with_material<R>(
        &self,
        id: MaterialId,
        f: impl FnOnce(&mut Material, &mut Vec<StockBatch>) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let cell = self
            .cells
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;

        // Exclusive per-material scope for the whole read-allocate-write
        // sequence.
        let mut guard = cell.lock().unwrap();
        let mut material = guard.material.clone();
        let mut batches = guard.batches.clone();

        let result = f(&mut material, &mut batches)?;

        // Commit only on Ok; an Err above leaves the cell untouched.
        guard.material = material;
        guard.batches = batches;
        Ok(result)
    }
}

/// In-memory alert store enforcing the per-key dedup guard.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    alerts: RwLock<Vec<StockAlert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every alert ever raised, resolved ones included.
    pub fn all(&self) -> Vec<StockAlert> {
        self.alerts.read().unwrap().clone()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn raise(&self, alert: StockAlert) -> DomainResult<RaiseOutcome> {
        let mut alerts = self.alerts.write().unwrap();

        // Dedup guard: at most one unresolved alert per (material, type).
        let duplicate = alerts.iter().any(|a| {
            !a.resolved
                && a.material_id == alert.material_id
                && a.alert_type == alert.alert_type
        });
        if duplicate {
            return Ok(RaiseOutcome::AlreadyRaised);
        }

        let id = alert.id;
        alerts.push(alert);
        Ok(RaiseOutcome::Raised(id))
    }

    fn resolve(
        &self,
        material_id: MaterialId,
        alert_type: AlertType,
        resolved_by: Option<UserId>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<AlertId>> {
        let mut alerts = self.alerts.write().unwrap();

        let found = alerts
            .iter_mut()
            .find(|a| !a.resolved && a.material_id == material_id && a.alert_type == alert_type);

        match found {
            Some(alert) => {
                alert.resolve(resolved_by, at);
                Ok(Some(alert.id))
            }
            None => Ok(None),
        }
    }

    fn unresolved_for(&self, material_id: MaterialId) -> DomainResult<Vec<StockAlert>> {
        let alerts = self.alerts.read().unwrap();
        Ok(alerts
            .iter()
            .filter(|a| !a.resolved && a.material_id == material_id)
            .cloned()
            .collect())
    }

    fn all_unresolved(&self) -> DomainResult<Vec<StockAlert>> {
        let alerts = self.alerts.read().unwrap();
        Ok(alerts.iter().filter(|a| !a.resolved).cloned().collect())
    }
}

#[derive(Debug, Clone)]
struct OrderCell {
    order: Order,
    items: Vec<OrderItem>,
}

/// In-memory order store.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    cells: RwLock<HashMap<OrderId, Arc<Mutex<OrderCell>>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn put_order(&self, order: Order, items: Vec<OrderItem>) -> DomainResult<()> {
        let mut cells = self.cells.write().unwrap();
        cells.insert(
            *order.id(),
            Arc::new(Mutex::new(OrderCell { order, items })),
        );
        Ok(())
    }

    fn snapshot(&self, id: OrderId) -> DomainResult<(Order, Vec<OrderItem>)> {
        let cell = self
            .cells
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;
        let guard = cell.lock().unwrap();
        Ok((guard.order.clone(), guard.items.clone()))
    }

    fn update_order(
        &self,
        order: Order,
        items: Vec<OrderItem>,
        expected: ExpectedVersion,
    ) -> DomainResult<()> {
        let cell = self
            .cells
            .read()
            .unwrap()
            .get(order.id())
            .cloned()
            .ok_or(DomainError::NotFound)?;

        let mut guard = cell.lock().unwrap();
        expected.check(guard.order.version())?;
        guard.order = order;
        guard.items = items;
        Ok(())
    }

    fn with_order<R>(
        &self,
        id: OrderId,
        f: impl FnOnce(&mut Order, &mut Vec<OrderItem>) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let cell = self
            .cells
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;

        let mut guard = cell.lock().unwrap();
        let mut order = guard.order.clone();
        let mut items = guard.items.clone();

        let result = f(&mut order, &mut items)?;

        guard.order = order;
        guard.items = items;
        Ok(result)
    }
}

/// In-memory catalog store.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    products: RwLock<HashMap<ProductId, Product>>,
    recipes: RwLock<HashMap<RecipeId, Recipe>>,
    saved_discounts: RwLock<Vec<SavedDiscount>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn put_product(&self, product: Product) -> DomainResult<()> {
        self.products.write().unwrap().insert(product.id, product);
        Ok(())
    }

    fn put_recipe(&self, recipe: Recipe) -> DomainResult<()> {
        self.recipes.write().unwrap().insert(recipe.id, recipe);
        Ok(())
    }

    fn put_saved_discount(&self, discount: SavedDiscount) -> DomainResult<()> {
        let mut discounts = self.saved_discounts.write().unwrap();
        discounts.retain(|d| d.id != discount.id);
        discounts.push(discount);
        Ok(())
    }

    fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.products
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    fn recipe_for_product(&self, product_id: ProductId) -> DomainResult<Option<Recipe>> {
        let recipes = self.recipes.read().unwrap();
        Ok(recipes
            .values()
            .find(|r| r.product_id == product_id)
            .cloned())
    }

    fn recipes_using(&self, material_id: MaterialId) -> DomainResult<Vec<Recipe>> {
        let recipes = self.recipes.read().unwrap();
        Ok(recipes
            .values()
            .filter(|r| r.uses_material(material_id))
            .cloned()
            .collect())
    }

    fn saved_discounts(&self) -> DomainResult<Vec<SavedDiscount>> {
        Ok(self.saved_discounts.read().unwrap().clone())
    }
}

/// In-memory stock history store.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: RwLock<HashMap<(MaterialId, i32, u32), StockHistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn record(&self, entry: StockHistoryEntry) -> DomainResult<()> {
        let key = (entry.material_id, entry.year, entry.month);
        self.entries.write().unwrap().insert(key, entry);
        Ok(())
    }

    fn entries_for(&self, material_id: MaterialId) -> DomainResult<Vec<StockHistoryEntry>> {
        let entries = self.entries.read().unwrap();
        let mut result: Vec<StockHistoryEntry> = entries
            .values()
            .filter(|e| e.material_id == material_id)
            .cloned()
            .collect();
        result.sort_by_key(|e| (e.year, e.month));
        Ok(result)
    }
}

// Shared-ownership forwarding, so services can hold `Arc<Store>`.

impl<S: InventoryStore + ?Sized> InventoryStore for Arc<S> {
    fn put_material(&self, material: Material, batches: Vec<StockBatch>) -> DomainResult<()> {
        (**self).put_material(material, batches)
    }

    fn material_ids(&self) -> DomainResult<Vec<MaterialId>> {
        (**self).material_ids()
    }

    fn snapshot(&self, id: MaterialId) -> DomainResult<(Material, Vec<StockBatch>)> {
        (**self).snapshot(id)
    }

    fn with_material<R>(
        &self,
        id: MaterialId,
        f: impl FnOnce(&mut Material, &mut Vec<StockBatch>) -> DomainResult<R>,
    ) -> DomainResult<R> {
        (**self).with_material(id, f)
    }
}

impl<S: AlertStore + ?Sized> AlertStore for Arc<S> {
    fn raise(&self, alert: StockAlert) -> DomainResult<RaiseOutcome> {
        (**self).raise(alert)
    }

    fn resolve(
        &self,
        material_id: MaterialId,
        alert_type: AlertType,
        resolved_by: Option<UserId>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<AlertId>> {
        (**self).resolve(material_id, alert_type, resolved_by, at)
    }

    fn unresolved_for(&self, material_id: MaterialId) -> DomainResult<Vec<StockAlert>> {
        (**self).unresolved_for(material_id)
    }

    fn all_unresolved(&self) -> DomainResult<Vec<StockAlert>> {
        (**self).all_unresolved()
    }
}

impl<S: OrderStore + ?Sized> OrderStore for Arc<S> {
    fn put_order(&self, order: Order, items: Vec<OrderItem>) -> DomainResult<()> {
        (**self).put_order(order, items)
    }

    fn snapshot(&self, id: OrderId) -> DomainResult<(Order, Vec<OrderItem>)> {
        (**self).snapshot(id)
    }

    fn update_order(
        &self,
        order: Order,
        items: Vec<OrderItem>,
        expected: ExpectedVersion,
    ) -> DomainResult<()> {
        (**self).update_order(order, items, expected)
    }

    fn with_order<R>(
        &self,
        id: OrderId,
        f: impl FnOnce(&mut Order, &mut Vec<OrderItem>) -> DomainResult<R>,
    ) -> DomainResult<R> {
        (**self).with_order(id, f)
    }
}

impl<S: CatalogStore + ?Sized> CatalogStore for Arc<S> {
    fn put_product(&self, product: Product) -> DomainResult<()> {
        (**self).put_product(product)
    }

    fn put_recipe(&self, recipe: Recipe) -> DomainResult<()> {
        (**self).put_recipe(recipe)
    }

    fn put_saved_discount(&self, discount: SavedDiscount) -> DomainResult<()> {
        (**self).put_saved_discount(discount)
    }

    fn product(&self, id: ProductId) -> DomainResult<Product> {
        (**self).product(id)
    }

    fn recipe_for_product(&self, product_id: ProductId) -> DomainResult<Option<Recipe>> {
        (**self).recipe_for_product(product_id)
    }

    fn recipes_using(&self, material_id: MaterialId) -> DomainResult<Vec<Recipe>> {
        (**self).recipes_using(material_id)
    }

    fn saved_discounts(&self) -> DomainResult<Vec<SavedDiscount>> {
        (**self).saved_discounts()
    }
}

impl<S: HistoryStore + ?Sized> HistoryStore for Arc<S> {
    fn record(&self, entry: StockHistoryEntry) -> DomainResult<()> {
        (**self).record(entry)
    }

    fn entries_for(&self, material_id: MaterialId) -> DomainResult<Vec<StockHistoryEntry>> {
        (**self).entries_for(material_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use larder_core::BatchId;
    use larder_orders::ServiceType;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::thread;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_material(quantity: Decimal) -> (InMemoryInventoryStore, MaterialId) {
        let store = InMemoryInventoryStore::new();
        let material = Material::new(MaterialId::new(), "Milk", "l", "ml", dec!(1000))
            .with_quantity(quantity);
        let id = *material.id();
        let batch = StockBatch::new(BatchId::new(), id, date(2026, 1, 1), quantity, dec!(1));
        store.put_material(material, vec![batch]).unwrap();
        (store, id)
    }

    #[test]
    fn snapshot_of_unknown_material_is_not_found() {
        let store = InMemoryInventoryStore::new();
        assert_eq!(
            store.snapshot(MaterialId::new()).unwrap_err(),
            DomainError::NotFound
        );
    }

    #[test]
    fn failed_unit_of_work_rolls_back() {
        let (store, id) = seeded_material(dec!(10));

        let err = store
            .with_material(id, |material, batches| {
                // Mutate, then fail: nothing may survive.
                larder_inventory::consume(material, batches, dec!(4), Utc::now())?;
                Err::<(), _>(DomainError::validation("boom"))
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let (material, batches) = store.snapshot(id).unwrap();
        assert_eq!(material.quantity(), dec!(10));
        assert_eq!(batches[0].remaining_quantity(), dec!(10));
    }

    #[test]
    fn concurrent_consumption_never_oversells() {
        let (store, id) = seeded_material(dec!(10));
        let store = Arc::new(store);

        // Ten threads each try to take 3; only three can succeed.
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    store.with_material(id, |material, batches| {
                        larder_inventory::consume(material, batches, dec!(3), Utc::now())
                    })
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();
        assert_eq!(successes, 3);

        let (material, batches) = store.snapshot(id).unwrap();
        assert_eq!(material.quantity(), dec!(1));
        assert_eq!(batches[0].remaining_quantity(), dec!(1));
    }

    #[test]
    fn alert_dedup_guard_blocks_second_raise() {
        let store = InMemoryAlertStore::new();
        let material = Material::new(MaterialId::new(), "Salt", "kg", "g", dec!(1000))
            .with_levels(dec!(10), dec!(0))
            .with_quantity(dec!(2));

        let first = store
            .raise(StockAlert::low_stock(&material, Utc::now()))
            .unwrap();
        assert!(matches!(first, RaiseOutcome::Raised(_)));

        let second = store
            .raise(StockAlert::low_stock(&material, Utc::now()))
            .unwrap();
        assert_eq!(second, RaiseOutcome::AlreadyRaised);

        assert_eq!(store.all_unresolved().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_raises_leave_exactly_one_unresolved() {
        let store = Arc::new(InMemoryAlertStore::new());
        let material = Material::new(MaterialId::new(), "Salt", "kg", "g", dec!(1000))
            .with_levels(dec!(10), dec!(0))
            .with_quantity(dec!(2));
        let material_id = *material.id();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let alert = StockAlert::low_stock(&material, Utc::now());
                thread::spawn(move || store.raise(alert).unwrap())
            })
            .collect();

        let raised = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, RaiseOutcome::Raised(_)))
            .count();

        assert_eq!(raised, 1);
        assert_eq!(store.unresolved_for(material_id).unwrap().len(), 1);
    }

    #[test]
    fn resolve_is_idempotent() {
        let store = InMemoryAlertStore::new();
        let material = Material::new(MaterialId::new(), "Salt", "kg", "g", dec!(1000))
            .with_quantity(dec!(0));
        let material_id = *material.id();

        store
            .raise(StockAlert::out_of_stock(&material, Utc::now()))
            .unwrap();

        let first = store
            .resolve(material_id, AlertType::OutOfStock, None, Utc::now())
            .unwrap();
        assert!(first.is_some());

        let second = store
            .resolve(material_id, AlertType::OutOfStock, None, Utc::now())
            .unwrap();
        assert!(second.is_none());

        // System-attributed resolution.
        let resolved = store.all().into_iter().find(|a| a.resolved).unwrap();
        assert!(resolved.resolved_by.is_none());
        assert!(resolved.resolved_at.is_some());
    }

    #[test]
    fn stale_order_write_is_rejected() {
        let store = InMemoryOrderStore::new();
        let order = Order::new(OrderId::new(), ServiceType::Takeaway);
        let id = *order.id();
        store.put_order(order, Vec::new()).unwrap();

        // Another writer commits in between.
        store
            .with_order(id, |order, _items| {
                order.mark_inventory_processed();
                Ok(())
            })
            .unwrap();

        let (mut stale, items) = store.snapshot(id).unwrap();
        stale.set_status(larder_orders::OrderStatus::Completed);
        let err = store
            .update_order(stale, items, ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn recipes_using_finds_consumers() {
        let store = InMemoryCatalogStore::new();
        let flour = MaterialId::new();
        let bread = Recipe::new(RecipeId::new(), ProductId::new()).with_component(flour, dec!(0.5));
        let soup = Recipe::new(RecipeId::new(), ProductId::new());
        store.put_recipe(bread.clone()).unwrap();
        store.put_recipe(soup).unwrap();

        let using = store.recipes_using(flour).unwrap();
        assert_eq!(using.len(), 1);
        assert_eq!(using[0].id, bread.id);
    }

    #[test]
    fn history_rollover_is_an_upsert() {
        let store = InMemoryHistoryStore::new();
        let material_id = MaterialId::new();

        for quantity in [dec!(10), dec!(12)] {
            store
                .record(StockHistoryEntry {
                    material_id,
                    year: 2026,
                    month: 2,
                    closing_quantity: quantity,
                    recorded_at: Utc::now(),
                })
                .unwrap();
        }

        let entries = store.entries_for(material_id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].closing_quantity, dec!(12));
    }
}
