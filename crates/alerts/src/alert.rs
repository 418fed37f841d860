//! Stock alert model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{AlertId, BatchId, Entity, MaterialId, UserId};
use larder_inventory::{Material, StockBatch};

/// What condition an alert describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    OutOfStock,
    LowStock,
    Overstock,
    ExpiryWarning,
    ExpiryCritical,
    ExpiredBatch,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::OutOfStock => "out_of_stock",
            AlertType::LowStock => "low_stock",
            AlertType::Overstock => "overstock",
            AlertType::ExpiryWarning => "expiry_warning",
            AlertType::ExpiryCritical => "expiry_critical",
            AlertType::ExpiredBatch => "expired_batch",
        }
    }

    /// Whether this alert type is evaluated per batch rather than per
    /// material quantity.
    pub fn is_batch_level(&self) -> bool {
        matches!(
            self,
            AlertType::ExpiryWarning | AlertType::ExpiryCritical | AlertType::ExpiredBatch
        )
    }
}

impl core::fmt::Display for AlertType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity levels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    /// Needs immediate action (stock gone, batch unusable).
    Critical,
    /// Should be addressed but does not block operations.
    Warning,
    /// Informational only.
    Info,
}

/// A raised stock alert.
///
/// At most one unresolved alert exists per `(material, alert_type)` pair;
/// the alert store enforces that guard on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: AlertId,
    pub material_id: MaterialId,
    /// Triggering batch, for expiry alerts.
    pub batch_id: Option<BatchId>,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub threshold_value: Decimal,
    pub observed_value: Decimal,
    pub message: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    /// `None` means system-resolved.
    pub resolved_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl StockAlert {
    fn new(
        material_id: MaterialId,
        alert_type: AlertType,
        severity: AlertSeverity,
        threshold_value: Decimal,
        observed_value: Decimal,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            material_id,
            batch_id: None,
            alert_type,
            severity,
            threshold_value,
            observed_value,
            message,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
            created_at,
        }
    }

    pub fn out_of_stock(material: &Material, now: DateTime<Utc>) -> Self {
        Self::new(
            *material.id(),
            AlertType::OutOfStock,
            AlertSeverity::Critical,
            Decimal::ZERO,
            material.quantity(),
            format!("{} is out of stock", material.name()),
            now,
        )
    }

    pub fn low_stock(material: &Material, now: DateTime<Utc>) -> Self {
        Self::new(
            *material.id(),
            AlertType::LowStock,
            AlertSeverity::Warning,
            material.minimum_stock_level(),
            material.quantity(),
            format!(
                "Low stock: {} has only {} {} remaining (minimum {})",
                material.name(),
                material.quantity(),
                material.stock_unit(),
                material.minimum_stock_level()
            ),
            now,
        )
    }

    pub fn overstock(material: &Material, now: DateTime<Utc>) -> Self {
        Self::new(
            *material.id(),
            AlertType::Overstock,
            AlertSeverity::Warning,
            material.maximum_stock_level(),
            material.quantity(),
            format!(
                "Overstock: {} has {} {}, above the maximum of {}",
                material.name(),
                material.quantity(),
                material.stock_unit(),
                material.maximum_stock_level()
            ),
            now,
        )
    }

    pub fn expiry_warning(
        material: &Material,
        batch: &StockBatch,
        days_until_expiry: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut alert = Self::new(
            *material.id(),
            AlertType::ExpiryWarning,
            AlertSeverity::Warning,
            Decimal::from(7),
            Decimal::from(days_until_expiry),
            format!(
                "Batch of {} expires in {} day(s)",
                material.name(),
                days_until_expiry
            ),
            now,
        );
        alert.batch_id = Some(batch.id());
        alert
    }

    pub fn expiry_critical(
        material: &Material,
        batch: &StockBatch,
        days_until_expiry: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut alert = Self::new(
            *material.id(),
            AlertType::ExpiryCritical,
            AlertSeverity::Critical,
            Decimal::from(2),
            Decimal::from(days_until_expiry),
            format!(
                "Batch of {} expires in {} day(s)",
                material.name(),
                days_until_expiry
            ),
            now,
        );
        alert.batch_id = Some(batch.id());
        alert
    }

    pub fn expired_batch(
        material: &Material,
        batch: &StockBatch,
        days_until_expiry: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut alert = Self::new(
            *material.id(),
            AlertType::ExpiredBatch,
            AlertSeverity::Critical,
            Decimal::ZERO,
            Decimal::from(days_until_expiry),
            format!(
                "Batch of {} expired {} day(s) ago",
                material.name(),
                days_until_expiry.abs()
            ),
            now,
        );
        alert.batch_id = Some(batch.id());
        alert
    }

    /// Mark this alert resolved. `resolved_by = None` records a
    /// system-attributed resolution.
    pub fn resolve(&mut self, resolved_by: Option<UserId>, at: DateTime<Utc>) {
        self.resolved = true;
        self.resolved_at = Some(at);
        self.resolved_by = resolved_by;
    }
}
