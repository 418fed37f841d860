//! Storage abstractions for the domain core.
//!
//! Transactional CRUD with exclusive per-material/per-order scopes.
//! `with_material` / `with_order` run a closure against a consistent copy of
//! the entity's state and commit the mutations only when the closure returns
//! `Ok`; an `Err` rolls the whole unit of work back, so no partial batch
//! decrement ever survives a failed operation.

pub mod in_memory;

pub use in_memory::{
    InMemoryAlertStore, InMemoryCatalogStore, InMemoryHistoryStore, InMemoryInventoryStore,
    InMemoryOrderStore,
};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_alerts::{AlertType, StockAlert};
use larder_catalog::{Product, Recipe, SavedDiscount};
use larder_core::{
    AlertId, DomainResult, ExpectedVersion, MaterialId, OrderId, ProductId, UserId,
};
use larder_inventory::{Material, StockBatch};
use larder_orders::{Order, OrderItem};

/// Material + batch storage with an exclusive per-material scope.
pub trait InventoryStore: Send + Sync {
    /// Insert or replace a material together with its batches.
    fn put_material(&self, material: Material, batches: Vec<StockBatch>) -> DomainResult<()>;

    /// Every known material id.
    fn material_ids(&self) -> DomainResult<Vec<MaterialId>>;

    /// Consistent read-only copy of a material and its batches.
    fn snapshot(&self, id: MaterialId) -> DomainResult<(Material, Vec<StockBatch>)>;

    /// Run `f` under the material's exclusive scope.
    ///
    /// The closure sees a consistent `(material, batches)` pair; its
    /// mutations commit only if it returns `Ok`.
    fn with_material<R>(
        &self,
        id: MaterialId,
        f: impl FnOnce(&mut Material, &mut Vec<StockBatch>) -> DomainResult<R>,
    ) -> DomainResult<R>;
}

/// Outcome of raising an alert under the dedup guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaiseOutcome {
    /// The alert was inserted.
    Raised(AlertId),
    /// An unresolved alert for the same `(material, alert_type)` key already
    /// exists. Losing this race is a no-op, not an error.
    AlreadyRaised,
}

/// Alert storage enforcing at most one unresolved alert per
/// `(material, alert_type)` pair.
pub trait AlertStore: Send + Sync {
    /// Insert an unresolved alert unless one with the same key exists.
    fn raise(&self, alert: StockAlert) -> DomainResult<RaiseOutcome>;

    /// Resolve the unresolved alert for a key, if any.
    ///
    /// Returns the resolved alert's id, or `None` when there was nothing to
    /// resolve (idempotent). `resolved_by = None` records a system
    /// resolution.
    fn resolve(
        &self,
        material_id: MaterialId,
        alert_type: AlertType,
        resolved_by: Option<UserId>,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<AlertId>>;

    /// Unresolved alerts for one material.
    fn unresolved_for(&self, material_id: MaterialId) -> DomainResult<Vec<StockAlert>>;

    /// Unresolved alert types for one material (the engine's dedup input).
    fn unresolved_types(&self, material_id: MaterialId) -> DomainResult<Vec<AlertType>> {
        Ok(self
            .unresolved_for(material_id)?
            .into_iter()
            .map(|a| a.alert_type)
            .collect())
    }

    /// Every unresolved alert across materials.
    fn all_unresolved(&self) -> DomainResult<Vec<StockAlert>>;
}

/// Order + item storage with an exclusive per-order scope.
pub trait OrderStore: Send + Sync {
    /// Insert or replace an order together with its items.
    fn put_order(&self, order: Order, items: Vec<OrderItem>) -> DomainResult<()>;

    /// Consistent read-only copy of an order and its items.
    fn snapshot(&self, id: OrderId) -> DomainResult<(Order, Vec<OrderItem>)>;

    /// Write back an externally mutated order, detecting stale writes.
    fn update_order(
        &self,
        order: Order,
        items: Vec<OrderItem>,
        expected: ExpectedVersion,
    ) -> DomainResult<()>;

    /// Run `f` under the order's exclusive scope; mutations commit on `Ok`.
    fn with_order<R>(
        &self,
        id: OrderId,
        f: impl FnOnce(&mut Order, &mut Vec<OrderItem>) -> DomainResult<R>,
    ) -> DomainResult<R>;
}

/// Read-mostly catalog reference data.
pub trait CatalogStore: Send + Sync {
    fn put_product(&self, product: Product) -> DomainResult<()>;
    fn put_recipe(&self, recipe: Recipe) -> DomainResult<()>;
    fn put_saved_discount(&self, discount: SavedDiscount) -> DomainResult<()>;

    fn product(&self, id: ProductId) -> DomainResult<Product>;

    /// The recipe producing a product, if one is configured.
    fn recipe_for_product(&self, product_id: ProductId) -> DomainResult<Option<Recipe>>;

    /// Every recipe consuming the given material.
    fn recipes_using(&self, material_id: MaterialId) -> DomainResult<Vec<Recipe>>;

    fn saved_discounts(&self) -> DomainResult<Vec<SavedDiscount>>;
}

/// A monthly closing-quantity snapshot for one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockHistoryEntry {
    pub material_id: MaterialId,
    pub year: i32,
    pub month: u32,
    pub closing_quantity: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Stock history storage for the monthly rollover.
pub trait HistoryStore: Send + Sync {
    /// Record a snapshot; re-recording the same `(material, year, month)`
    /// replaces the previous entry, keeping the rollover idempotent.
    fn record(&self, entry: StockHistoryEntry) -> DomainResult<()>;

    fn entries_for(&self, material_id: MaterialId) -> DomainResult<Vec<StockHistoryEntry>>;
}
