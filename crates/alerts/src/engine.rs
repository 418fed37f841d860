//! Threshold evaluation and the alert state machine.
//!
//! Evaluation is pure: it inspects a material snapshot, its batches, and the
//! set of currently unresolved alert types, and returns the transitions that
//! would bring alert state in line with the observed stock. Re-running on
//! unchanged state returns no transitions. The alert store applies
//! transitions under the per-key dedup guard; a lost race is a no-op there,
//! not an error.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use larder_core::{AlertId, Entity, MaterialId};
use larder_events::Event;
use larder_inventory::{Material, StockBatch};

use crate::alert::{AlertSeverity, AlertType, StockAlert};

/// A state-machine transition for one `(material, alert_type)` key.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertTransition {
    /// Raise a new unresolved alert (subject to the store's dedup guard).
    Raise(StockAlert),
    /// Resolve the unresolved alert of this type, if one exists.
    Resolve {
        material_id: MaterialId,
        alert_type: AlertType,
    },
}

/// Event: AlertRaised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRaised {
    pub alert_id: AlertId,
    pub material_id: MaterialId,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AlertResolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertResolved {
    pub material_id: MaterialId,
    pub alert_type: AlertType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertEvent {
    AlertRaised(AlertRaised),
    AlertResolved(AlertResolved),
}

impl Event for AlertEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AlertEvent::AlertRaised(_) => "alerts.raised",
            AlertEvent::AlertResolved(_) => "alerts.resolved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AlertEvent::AlertRaised(e) => e.occurred_at,
            AlertEvent::AlertResolved(e) => e.occurred_at,
        }
    }
}

/// Evaluate material-level thresholds.
///
/// Priority, first match wins: out-of-stock, low-stock, overstock. When no
/// condition holds, the explicit resolution rules clear stale alerts:
/// `quantity > minimum` resolves low/out-of-stock, `quantity <= maximum`
/// resolves overstock.
pub fn evaluate_material(
    material: &Material,
    unresolved: &[AlertType],
    now: DateTime<Utc>,
) -> Vec<AlertTransition> {
    let quantity = material.quantity();
    let minimum = material.minimum_stock_level();
    let maximum = material.maximum_stock_level();

    let desired = if quantity <= Decimal::ZERO {
        Some(AlertType::OutOfStock)
    } else if minimum > Decimal::ZERO && quantity <= minimum {
        Some(AlertType::LowStock)
    } else if maximum > Decimal::ZERO && quantity > maximum {
        Some(AlertType::Overstock)
    } else {
        None
    };

    let mut transitions = Vec::new();

    match desired {
        Some(alert_type) => {
            if !unresolved.contains(&alert_type) {
                let alert = match alert_type {
                    AlertType::OutOfStock => StockAlert::out_of_stock(material, now),
                    AlertType::LowStock => StockAlert::low_stock(material, now),
                    AlertType::Overstock => StockAlert::overstock(material, now),
                    _ => unreachable!("material-level evaluation only"),
                };
                transitions.push(AlertTransition::Raise(alert));
            }
        }
        None => {
            if quantity > minimum {
                for alert_type in [AlertType::LowStock, AlertType::OutOfStock] {
                    if unresolved.contains(&alert_type) {
                        transitions.push(AlertTransition::Resolve {
                            material_id: *material.id(),
                            alert_type,
                        });
                    }
                }
            }
            if quantity <= maximum && unresolved.contains(&AlertType::Overstock) {
                transitions.push(AlertTransition::Resolve {
                    material_id: *material.id(),
                    alert_type: AlertType::Overstock,
                });
            }
        }
    }

    transitions
}

/// Evaluate batch-level expiry thresholds.
///
/// Each type is backed by whichever batches currently satisfy it:
/// expired (`expiry < today`), critical (`0 <= days <= 2`), warning
/// (`2 < days <= 7`). Types no longer backed by any batch are resolved. The
/// earliest-expiring triggering batch becomes the alert's batch reference.
pub fn evaluate_batches(
    material: &Material,
    batches: &[StockBatch],
    unresolved: &[AlertType],
    now: DateTime<Utc>,
) -> Vec<AlertTransition> {
    let today = now.date_naive();

    let mut expired: Option<(&StockBatch, i64)> = None;
    let mut critical: Option<(&StockBatch, i64)> = None;
    let mut warning: Option<(&StockBatch, i64)> = None;

    for batch in batches.iter().filter(|b| b.is_available()) {
        let Some(days) = batch.days_until_expiry(today) else {
            continue;
        };
        let slot = if days < 0 {
            &mut expired
        } else if days <= 2 {
            &mut critical
        } else if days <= 7 {
            &mut warning
        } else {
            continue;
        };
        // Keep the earliest-expiring batch as the alert reference.
        if slot.is_none_or(|(_, held)| days < held) {
            *slot = Some((batch, days));
        }
    }

    let mut transitions = Vec::new();
    let cases = [
        (AlertType::ExpiredBatch, expired),
        (AlertType::ExpiryCritical, critical),
        (AlertType::ExpiryWarning, warning),
    ];

    for (alert_type, trigger) in cases {
        match trigger {
            Some((batch, days)) => {
                if !unresolved.contains(&alert_type) {
                    let alert = match alert_type {
                        AlertType::ExpiredBatch => {
                            StockAlert::expired_batch(material, batch, days, now)
                        }
                        AlertType::ExpiryCritical => {
                            StockAlert::expiry_critical(material, batch, days, now)
                        }
                        AlertType::ExpiryWarning => {
                            StockAlert::expiry_warning(material, batch, days, now)
                        }
                        _ => unreachable!("batch-level evaluation only"),
                    };
                    transitions.push(AlertTransition::Raise(alert));
                }
            }
            None => {
                if unresolved.contains(&alert_type) {
                    transitions.push(AlertTransition::Resolve {
                        material_id: *material.id(),
                        alert_type,
                    });
                }
            }
        }
    }

    transitions
}

/// Full evaluation: material-level and batch-level thresholds together.
pub fn evaluate(
    material: &Material,
    batches: &[StockBatch],
    unresolved: &[AlertType],
    now: DateTime<Utc>,
) -> Vec<AlertTransition> {
    let mut transitions = evaluate_material(material, unresolved, now);
    transitions.extend(evaluate_batches(material, batches, unresolved, now));
    transitions
}
