//! Broadcast event kinds and their channel/payload mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use larder_core::{AlertId, BatchId, MaterialId, OrderId, ProductId, RecipeId};
use larder_events::Event;

/// What changed about a material's stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockChange {
    Consumed,
    Received,
}

impl StockChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockChange::Consumed => "consumed",
            StockChange::Received => "received",
        }
    }
}

/// A state-change notification for external subscribers (dashboards).
///
/// Every kind maps to a fixed channel and serializes into a fixed payload:
/// the relevant identifiers, a change-type tag, and an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastEvent {
    InventoryChanged {
        material_id: MaterialId,
        change: StockChange,
        occurred_at: DateTime<Utc>,
    },
    DashboardChanged {
        occurred_at: DateTime<Utc>,
    },
    AlertTriggered {
        alert_id: AlertId,
        material_id: MaterialId,
        alert_type: String,
        severity: String,
        occurred_at: DateTime<Utc>,
    },
    RecipeCostChanged {
        recipe_id: RecipeId,
        product_id: ProductId,
        occurred_at: DateTime<Utc>,
    },
    OrderInventoryProcessed {
        order_id: OrderId,
        occurred_at: DateTime<Utc>,
    },
    BatchExpiryWarning {
        material_id: MaterialId,
        batch_id: BatchId,
        days_until_expiry: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl BroadcastEvent {
    /// Channel this event publishes to.
    pub fn channel(&self) -> &'static str {
        match self {
            BroadcastEvent::InventoryChanged { .. } => "inventory-updates",
            BroadcastEvent::DashboardChanged { .. } => "dashboard-updates",
            BroadcastEvent::AlertTriggered { .. } => "alerts",
            BroadcastEvent::RecipeCostChanged { .. } => "recipe-costs",
            BroadcastEvent::OrderInventoryProcessed { .. } => "orders",
            BroadcastEvent::BatchExpiryWarning { .. } => "alerts",
        }
    }

    /// Fixed JSON payload for subscribers.
    pub fn payload(&self) -> JsonValue {
        match self {
            BroadcastEvent::InventoryChanged {
                material_id,
                change,
                occurred_at,
            } => json!({
                "material_id": material_id,
                "change": change.as_str(),
                "timestamp": occurred_at.to_rfc3339(),
            }),
            BroadcastEvent::DashboardChanged { occurred_at } => json!({
                "change": "dashboard",
                "timestamp": occurred_at.to_rfc3339(),
            }),
            BroadcastEvent::AlertTriggered {
                alert_id,
                material_id,
                alert_type,
                severity,
                occurred_at,
            } => json!({
                "alert_id": alert_id,
                "material_id": material_id,
                "change": alert_type,
                "severity": severity,
                "timestamp": occurred_at.to_rfc3339(),
            }),
            BroadcastEvent::RecipeCostChanged {
                recipe_id,
                product_id,
                occurred_at,
            } => json!({
                "recipe_id": recipe_id,
                "product_id": product_id,
                "change": "recipe_cost",
                "timestamp": occurred_at.to_rfc3339(),
            }),
            BroadcastEvent::OrderInventoryProcessed {
                order_id,
                occurred_at,
            } => json!({
                "order_id": order_id,
                "change": "inventory_processed",
                "timestamp": occurred_at.to_rfc3339(),
            }),
            BroadcastEvent::BatchExpiryWarning {
                material_id,
                batch_id,
                days_until_expiry,
                occurred_at,
            } => json!({
                "material_id": material_id,
                "batch_id": batch_id,
                "change": "batch_expiry",
                "days_until_expiry": days_until_expiry,
                "timestamp": occurred_at.to_rfc3339(),
            }),
        }
    }

    /// Build the wire message for this event.
    pub fn to_message(&self) -> ChannelMessage {
        ChannelMessage {
            channel: self.channel().to_string(),
            event: self.event_type().to_string(),
            payload: self.payload(),
        }
    }
}

impl Event for BroadcastEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BroadcastEvent::InventoryChanged { .. } => "broadcast.inventory_changed",
            BroadcastEvent::DashboardChanged { .. } => "broadcast.dashboard_changed",
            BroadcastEvent::AlertTriggered { .. } => "broadcast.alert_triggered",
            BroadcastEvent::RecipeCostChanged { .. } => "broadcast.recipe_cost_changed",
            BroadcastEvent::OrderInventoryProcessed { .. } => "broadcast.order_inventory_processed",
            BroadcastEvent::BatchExpiryWarning { .. } => "broadcast.batch_expiry_warning",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BroadcastEvent::InventoryChanged { occurred_at, .. }
            | BroadcastEvent::DashboardChanged { occurred_at }
            | BroadcastEvent::AlertTriggered { occurred_at, .. }
            | BroadcastEvent::RecipeCostChanged { occurred_at, .. }
            | BroadcastEvent::OrderInventoryProcessed { occurred_at, .. }
            | BroadcastEvent::BatchExpiryWarning { occurred_at, .. } => *occurred_at,
        }
    }
}

/// A channel-addressed message as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub channel: String,
    pub event: String,
    pub payload: JsonValue,
}
