//! Recipes: what each product consumes from stock.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{MaterialId, ProductId, RecipeId};

/// One ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeComponent {
    pub material_id: MaterialId,
    /// Quantity consumed per product unit, in the material's recipe unit.
    pub quantity_per_unit: Decimal,
}

/// Maps a product to the materials it consumes.
///
/// Recipes are read-only input to consumption sizing; fulfilling an order
/// never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub product_id: ProductId,
    pub components: Vec<RecipeComponent>,
}

impl Recipe {
    pub fn new(id: RecipeId, product_id: ProductId) -> Self {
        Self {
            id,
            product_id,
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, material_id: MaterialId, quantity_per_unit: Decimal) -> Self {
        self.components.push(RecipeComponent {
            material_id,
            quantity_per_unit,
        });
        self
    }

    /// Whether this recipe consumes the given material.
    pub fn uses_material(&self, material_id: MaterialId) -> bool {
        self.components
            .iter()
            .any(|c| c.material_id == material_id)
    }

    /// Material requirements, in recipe units, for producing `units` of the
    /// product.
    pub fn requirements(&self, units: Decimal) -> Vec<(MaterialId, Decimal)> {
        self.components
            .iter()
            .map(|c| (c.material_id, c.quantity_per_unit * units))
            .collect()
    }
}
