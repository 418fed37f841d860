//! `larder-inventory` — materials, stock batches, and the batch ledger.
//!
//! Business rules for perishable stock, implemented as deterministic domain
//! logic (no IO, no storage). The ledger draws batches down
//! earliest-expiry-first and emits consumption facts for downstream alerting
//! and broadcasting.

pub mod batch;
pub mod ledger;
pub mod material;

pub use batch::StockBatch;
pub use ledger::{
    BatchAllocation, BatchConsumed, Consumption, InventoryEvent, StockReceived, classify_expired,
    classify_expiring, consume, receive, restore,
};
pub use material::Material;
