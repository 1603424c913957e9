//! Pairwise relations between states in contact.
//!
//! A relation is fixed on first contact from the ratio of the two powers and
//! kept until the states lose contact. Relations are always written to both
//! sides at once.

use anyhow::Result;
use tracing::{debug, info};

use crate::{
    config::DiplomacyParams,
    engine::{System, SystemContext},
    rng::PhaseRng,
    settlement::Relation,
    world::{SettlementId, SimEvent, World},
};

pub struct DiplomacySystem;

impl DiplomacySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DiplomacySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DiplomacySystem {
    fn name(&self) -> &str {
        "diplomacy"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut PhaseRng<'_>,
    ) -> Result<()> {
        for id in world.state_ids() {
            if world.contains(id) {
                refresh(world, id);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiplomacyChanges {
    pub established: Vec<(SettlementId, Relation)>,
    pub dropped: Vec<SettlementId>,
    /// Contacts left unclassified because one side's power is not positive yet.
    pub deferred: Vec<SettlementId>,
}

/// Classifies a first contact. `None` defers the decision to a later tick.
///
/// Both powers must be positive and finite, so a pair defers identically
/// whichever side refreshes first.
pub fn classify(own_power: f64, other_power: f64, params: &DiplomacyParams) -> Option<Relation> {
    let usable = |power: f64| power.is_finite() && power > 0.0;
    if !(usable(own_power) && usable(other_power)) {
        return None;
    }
    let ratio = own_power / other_power;
    if (params.peace_low..=params.peace_high).contains(&ratio) {
        Some(Relation::Peace)
    } else {
        Some(Relation::War)
    }
}

/// Brings one state's relations in line with its current contacts.
pub fn refresh(world: &mut World, id: SettlementId) -> DiplomacyChanges {
    let mut changes = DiplomacyChanges::default();
    let Some(polity) = world.polity(id) else {
        return changes;
    };
    let known: Vec<SettlementId> = polity.diplomacy.keys().copied().collect();
    let contacts = world.contacts(id);

    for other in known {
        if !contacts.contains(&other) {
            drop_relation(world, id, other);
            changes.dropped.push(other);
        }
    }

    for other in contacts {
        let undecided = world
            .polity(id)
            .is_some_and(|p| p.relation(other).is_none());
        if !undecided || world.polity(other).is_none() {
            continue;
        }
        match classify(world.power(id), world.power(other), &world.params().diplomacy) {
            Some(relation) => {
                set_relation(world, id, other, relation);
                changes.established.push((other, relation));
            }
            None => changes.deferred.push(other),
        }
    }
    changes
}

/// Writes `relation` on both sides of the pair.
pub fn set_relation(world: &mut World, a: SettlementId, b: SettlementId, relation: Relation) {
    if a == b || world.polity(a).is_none() || world.polity(b).is_none() {
        return;
    }
    for (own, other) in [(a, b), (b, a)] {
        if let Some(polity) = world.polity_mut(own) {
            polity.diplomacy.insert(other, relation);
        }
    }
    match relation {
        Relation::War => info!(a = a.raw(), b = b.raw(), "war declared"),
        Relation::Peace => debug!(a = a.raw(), b = b.raw(), "peace established"),
    }
    world.record(SimEvent::RelationSet { a, b, relation });
}

/// Forgets the pair on both sides.
pub fn drop_relation(world: &mut World, a: SettlementId, b: SettlementId) {
    let mut removed = false;
    for (own, other) in [(a, b), (b, a)] {
        if let Some(polity) = world.polity_mut(own) {
            removed |= polity.diplomacy.remove(&other).is_some();
        }
    }
    if removed {
        debug!(a = a.raw(), b = b.raw(), "contact lost");
        world.record(SimEvent::RelationDropped { a, b });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SimParams,
        settlement::{StageKind, Stockpile},
        spatial::{ResourceKind, TileGrid, TilePos},
        world::SettlementSeed,
    };

    fn neighbours(technology: f64) -> (World, SettlementId, SettlementId) {
        let mut world = World::new(
            TileGrid::uniform(20, 12, ResourceKind::Food, 10.0),
            SimParams::default(),
        );
        let mut state = |x: u32, technology: Option<f64>| {
            world
                .spawn(SettlementSeed {
                    name: None,
                    stage: StageKind::State,
                    position: TilePos::new(x, 5),
                    population: 50.0,
                    stock: Stockpile::default(),
                    technology,
                })
                .unwrap()
        };
        let a = state(5, None);
        let b = state(12, Some(technology));
        (world, a, b)
    }

    #[test]
    fn ratio_band_is_inclusive() {
        let params = DiplomacyParams::default();
        assert_eq!(classify(80.0, 100.0, &params), Some(Relation::Peace));
        assert_eq!(classify(120.0, 100.0, &params), Some(Relation::Peace));
        assert_eq!(classify(100.0, 100.0, &params), Some(Relation::Peace));
        assert_eq!(classify(79.0, 100.0, &params), Some(Relation::War));
        assert_eq!(classify(121.0, 100.0, &params), Some(Relation::War));
    }

    #[test]
    fn zero_power_defers_on_either_side() {
        let params = DiplomacyParams::default();
        assert_eq!(classify(50.0, 0.0, &params), None);
        assert_eq!(classify(0.0, 50.0, &params), None);
        assert_eq!(classify(0.0, 0.0, &params), None);
        assert_eq!(classify(f64::INFINITY, 50.0, &params), None);
    }

    #[test]
    fn powerless_neighbour_is_deferred_from_both_sides() {
        let (mut world, a, b) = neighbours(0.0);
        assert!(world.contacts(a).contains(&b));
        assert_eq!(world.power(b), 0.0);

        let from_a = refresh(&mut world, a);
        let from_b = refresh(&mut world, b);
        assert_eq!(from_a.deferred, vec![b]);
        assert_eq!(from_b.deferred, vec![a]);
        assert!(from_a.established.is_empty() && from_b.established.is_empty());
        assert_eq!(world.polity(a).unwrap().relation(b), None);
        assert_eq!(world.polity(b).unwrap().relation(a), None);

        // once both sides carry power the pair is classified
        world.polity_mut(b).unwrap().technology = 1.0;
        let changes = refresh(&mut world, b);
        assert_eq!(changes.established, vec![(a, Relation::Peace)]);
        assert_eq!(world.polity(a).unwrap().relation(b), Some(Relation::Peace));
    }
}
