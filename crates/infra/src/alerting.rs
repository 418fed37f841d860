//! Applying alert-engine transitions through the store's dedup guard.

use chrono::{DateTime, Utc};

use larder_alerts::{AlertEvent, AlertRaised, AlertResolved, AlertTransition};
use larder_core::{DomainResult, MaterialId};
use larder_events::Outbox;

use crate::events::CoreEvent;
use crate::store::{AlertStore, InventoryStore, RaiseOutcome};

/// Apply a batch of transitions, recording a fact for each one that took.
///
/// A raise losing the dedup race is a harmless no-op: the winning evaluation
/// already recorded the equivalent fact. Returns how many transitions
/// actually changed state.
pub fn apply_transitions<A: AlertStore>(
    store: &A,
    transitions: Vec<AlertTransition>,
    now: DateTime<Utc>,
    outbox: &mut Outbox<CoreEvent>,
) -> DomainResult<usize> {
    let mut applied = 0;

    for transition in transitions {
        match transition {
            AlertTransition::Raise(alert) => {
                let material_id = alert.material_id;
                let alert_type = alert.alert_type;
                let severity = alert.severity;
                match store.raise(alert)? {
                    RaiseOutcome::Raised(alert_id) => {
                        applied += 1;
                        outbox.record(CoreEvent::Alert(AlertEvent::AlertRaised(AlertRaised {
                            alert_id,
                            material_id,
                            alert_type,
                            severity,
                            occurred_at: now,
                        })));
                    }
                    RaiseOutcome::AlreadyRaised => {}
                }
            }
            AlertTransition::Resolve {
                material_id,
                alert_type,
            } => {
                if store.resolve(material_id, alert_type, None, now)?.is_some() {
                    applied += 1;
                    outbox.record(CoreEvent::Alert(AlertEvent::AlertResolved(AlertResolved {
                        material_id,
                        alert_type,
                        occurred_at: now,
                    })));
                }
            }
        }
    }

    Ok(applied)
}

/// Evaluate one material's current state and apply the outcome.
pub fn evaluate_and_apply<I, A>(
    inventory: &I,
    alerts: &A,
    material_id: MaterialId,
    now: DateTime<Utc>,
    outbox: &mut Outbox<CoreEvent>,
) -> DomainResult<usize>
where
    I: InventoryStore,
    A: AlertStore,
{
    let (material, batches) = inventory.snapshot(material_id)?;
    let unresolved = alerts.unresolved_types(material_id)?;
    let transitions = larder_alerts::evaluate(&material, &batches, &unresolved, now);
    apply_transitions(alerts, transitions, now, outbox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::BatchId;
    use larder_inventory::{Material, StockBatch};
    use rust_decimal_macros::dec;

    use crate::store::{InMemoryAlertStore, InMemoryInventoryStore};

    fn now() -> DateTime<Utc> {
        "2026-02-01T06:00:00Z".parse().unwrap()
    }

    #[test]
    fn low_stock_lifecycle_raises_then_resolves() {
        let inventory = InMemoryInventoryStore::new();
        let alerts = InMemoryAlertStore::new();

        let material = Material::new(larder_core::MaterialId::new(), "Yeast", "kg", "g", dec!(1000))
            .with_levels(dec!(10), dec!(0))
            .with_quantity(dec!(5));
        let id = *larder_core::Entity::id(&material);
        inventory.put_material(material, Vec::new()).unwrap();

        let mut outbox = Outbox::new();
        let applied = evaluate_and_apply(&inventory, &alerts, id, now(), &mut outbox).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(alerts.unresolved_for(id).unwrap().len(), 1);
        assert_eq!(outbox.len(), 1);

        // Unchanged state: the second run is a no-op.
        let applied = evaluate_and_apply(&inventory, &alerts, id, now(), &mut outbox).unwrap();
        assert_eq!(applied, 0);

        // Replenish past the minimum: the alert resolves, system-attributed.
        inventory
            .with_material(id, |material, batches| {
                let batch = StockBatch::new(BatchId::new(), id, now().date_naive(), dec!(7), dec!(1));
                larder_inventory::receive(material, &batch, now())?;
                batches.push(batch);
                Ok(())
            })
            .unwrap();

        let applied = evaluate_and_apply(&inventory, &alerts, id, now(), &mut outbox).unwrap();
        assert_eq!(applied, 1);
        assert!(alerts.unresolved_for(id).unwrap().is_empty());
    }
}
