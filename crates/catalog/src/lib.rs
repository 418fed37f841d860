//! `larder-catalog` — products, discounts, and recipes.
//!
//! Read-only reference data consumed by the pricing engine and the
//! fulfillment workflow.

pub mod discount;
pub mod product;
pub mod recipe;

pub use discount::{Discount, SavedDiscount};
pub use product::Product;
pub use recipe::{Recipe, RecipeComponent};
