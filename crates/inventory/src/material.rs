//! Raw-material stock records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{Entity, MaterialId};

/// A raw material tracked in stock.
///
/// `quantity` is the on-hand total in stock units. The steady-state target is
/// `quantity == sum(remaining_quantity)` over the material's batches; every
/// consumption and receipt restores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    id: MaterialId,
    name: String,
    quantity: Decimal,
    /// Unit stock is counted in (e.g. "kg").
    stock_unit: String,
    /// Unit recipes are written in (e.g. "g").
    recipe_unit: String,
    /// Recipe units per one stock unit.
    conversion_rate: Decimal,
    minimum_stock_level: Decimal,
    maximum_stock_level: Decimal,
    reorder_point: Decimal,
    reorder_quantity: Decimal,
    perishable: bool,
    version: u64,
}

impl Material {
    pub fn new(
        id: MaterialId,
        name: impl Into<String>,
        stock_unit: impl Into<String>,
        recipe_unit: impl Into<String>,
        conversion_rate: Decimal,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            quantity: Decimal::ZERO,
            stock_unit: stock_unit.into(),
            recipe_unit: recipe_unit.into(),
            conversion_rate,
            minimum_stock_level: Decimal::ZERO,
            maximum_stock_level: Decimal::ZERO,
            reorder_point: Decimal::ZERO,
            reorder_quantity: Decimal::ZERO,
            perishable: false,
            version: 0,
        }
    }

    pub fn with_levels(mut self, minimum: Decimal, maximum: Decimal) -> Self {
        self.minimum_stock_level = minimum;
        self.maximum_stock_level = maximum;
        self
    }

    pub fn with_reorder(mut self, point: Decimal, quantity: Decimal) -> Self {
        self.reorder_point = point;
        self.reorder_quantity = quantity;
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn perishable(mut self, perishable: bool) -> Self {
        self.perishable = perishable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn stock_unit(&self) -> &str {
        &self.stock_unit
    }

    pub fn recipe_unit(&self) -> &str {
        &self.recipe_unit
    }

    pub fn conversion_rate(&self) -> Decimal {
        self.conversion_rate
    }

    pub fn minimum_stock_level(&self) -> Decimal {
        self.minimum_stock_level
    }

    pub fn maximum_stock_level(&self) -> Decimal {
        self.maximum_stock_level
    }

    pub fn reorder_point(&self) -> Decimal {
        self.reorder_point
    }

    pub fn reorder_quantity(&self) -> Decimal {
        self.reorder_quantity
    }

    pub fn is_perishable(&self) -> bool {
        self.perishable
    }

    /// Convert a requirement expressed in recipe units into stock units.
    pub fn to_stock_units(&self, recipe_quantity: Decimal) -> Decimal {
        if self.conversion_rate.is_zero() {
            recipe_quantity
        } else {
            recipe_quantity / self.conversion_rate
        }
    }

    pub(crate) fn apply_consumption(&mut self, total: Decimal) {
        self.quantity -= total;
        self.version += 1;
    }

    pub(crate) fn apply_receipt(&mut self, quantity: Decimal) {
        self.quantity += quantity;
        self.version += 1;
    }
}

impl Entity for Material {
    type Id = MaterialId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
