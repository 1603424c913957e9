//! Technology accrual and strategic-weapon escalation.

use std::collections::BTreeMap;

use anyhow::Result;
use rand::Rng;
use tracing::{debug, info};

use crate::{
    engine::{System, SystemContext},
    rng::PhaseRng,
    settlement::Relation,
    spatial::TileId,
    world::{SettlementId, SimEvent, World},
};

pub struct TechnologySystem;

impl TechnologySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TechnologySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TechnologySystem {
    fn name(&self) -> &str {
        "technology"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        rng: &mut PhaseRng<'_>,
    ) -> Result<()> {
        let levels = tech_levels(world);
        for id in world.state_ids() {
            if !world.contains(id) {
                continue;
            }
            advance_technology(world, id, &levels);
            advance_weapons(world, id);
            maybe_strike(world, id, rng);
        }
        Ok(())
    }
}

/// Technology of every active state, taken before anyone advances.
pub fn tech_levels(world: &World) -> BTreeMap<SettlementId, f64> {
    world
        .state_ids()
        .into_iter()
        .filter_map(|id| world.polity(id).map(|p| (id, p.technology)))
        .collect()
}

/// Applies one tick of research and returns the new level.
pub fn advance_technology(
    world: &mut World,
    id: SettlementId,
    levels: &BTreeMap<SettlementId, f64>,
) -> Option<f64> {
    let params = world.params().technology.clone();
    let settlement = world.settlement_mut(id)?;
    let population = settlement.population;
    let polity = settlement.polity_mut()?;
    let partner_sum = |relation: Relation| -> f64 {
        polity
            .partners(relation)
            .iter()
            .filter_map(|p| levels.get(p))
            .sum()
    };
    let delta = population * params.per_capita_rate
        + partner_sum(Relation::Peace) * params.peace_influence
        - partner_sum(Relation::War) * params.war_influence;
    polity.technology = (polity.technology + delta).clamp(0.0, params.max_level);
    Some(polity.technology)
}

/// Builds weapons once technology has topped out.
pub fn advance_weapons(world: &mut World, id: SettlementId) -> Option<f64> {
    let params = world.params().technology.clone();
    let polity = world.polity_mut(id)?;
    if polity.technology >= params.max_level {
        polity.weapons += params.weapon_rate;
    }
    Some(polity.weapons)
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrikeReport {
    pub by: SettlementId,
    pub target: TileId,
    pub tiles_hit: usize,
    /// Tiles each owner lost to the blast.
    pub losses: BTreeMap<SettlementId, usize>,
    pub fallen: Vec<SettlementId>,
}

/// Launches one weapon at a random enemy tile if the state is provoked and armed.
pub fn maybe_strike<R: Rng + ?Sized>(
    world: &mut World,
    id: SettlementId,
    rng: &mut R,
) -> Option<StrikeReport> {
    let polity = world.polity(id)?;
    if !polity.war_triggered || polity.whole_weapons() < 1 {
        return None;
    }
    let targets: Vec<SettlementId> = polity
        .enemies()
        .into_iter()
        .filter(|e| world.settlement(*e).is_some_and(|s| !s.territory.is_empty()))
        .collect();
    if targets.is_empty() {
        return None;
    }
    let enemy = targets[rng.gen_range(0..targets.len())];
    let territory = &world.settlement(enemy)?.territory;
    let target = territory[rng.gen_range(0..territory.len())];
    world.polity_mut(id)?.weapons -= 1.0;
    Some(strike(world, id, target))
}

/// Devastates every tile within the strike radius of `target`.
pub fn strike(world: &mut World, by: SettlementId, target: TileId) -> StrikeReport {
    let radius = world.params().technology.strike_radius;
    let blast = world.grid().disk(target, radius);
    let mut before: BTreeMap<SettlementId, usize> = BTreeMap::new();
    let mut losses: BTreeMap<SettlementId, usize> = BTreeMap::new();
    for &tile in &blast {
        if let Some(owner) = world.grid().owner(tile) {
            let held = world.settlement(owner).map_or(0, |s| s.territory.len());
            before.entry(owner).or_insert(held);
            world.release_tile(tile);
            *losses.entry(owner).or_default() += 1;
        }
        let cell = world.grid_mut().tile_mut(tile);
        cell.quantity = 0.0;
        cell.radioactive = true;
    }

    let mut fallen = Vec::new();
    for (&owner, &lost) in &losses {
        let held = before.get(&owner).copied().unwrap_or(lost).max(1);
        let Some(settlement) = world.settlement_mut(owner) else {
            continue;
        };
        let fraction = lost as f64 / held as f64;
        settlement.population = (settlement.population * (1.0 - fraction)).max(0.0);
        if let Some(polity) = settlement.polity_mut() {
            polity.war_triggered = true;
        }
        if settlement.territory.is_empty() || settlement.population <= 0.0 {
            fallen.push(owner);
        }
    }
    for &owner in &fallen {
        world.remove_settlement(owner);
        world.record(SimEvent::Perished { settlement: owner });
        debug!(state = owner.raw(), "state wiped out by strike");
    }

    info!(
        by = by.raw(),
        target = ?world.grid().pos(target),
        tiles_hit = blast.len(),
        "strategic strike"
    );
    world.record(SimEvent::Strike {
        by,
        target,
        tiles_hit: blast.len(),
    });
    StrikeReport {
        by,
        target,
        tiles_hit: blast.len(),
        losses,
        fallen,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::{
        config::SimParams,
        settlement::{StageKind, Stockpile},
        spatial::{ResourceKind, TileGrid, TilePos},
        systems::diplomacy::set_relation,
        world::SettlementSeed,
    };

    fn state_at(world: &mut World, x: u32, y: u32, population: f64, technology: f64) -> SettlementId {
        world
            .spawn(SettlementSeed {
                name: None,
                stage: StageKind::State,
                position: TilePos::new(x, y),
                population,
                stock: Stockpile::default(),
                technology: Some(technology),
            })
            .unwrap()
    }

    fn world() -> World {
        World::new(
            TileGrid::uniform(30, 30, ResourceKind::Food, 10.0),
            SimParams::default(),
        )
    }

    #[test]
    fn research_grows_with_population_and_partners() {
        let mut world = world();
        let a = state_at(&mut world, 5, 5, 100.0, 10.0);
        let b = state_at(&mut world, 12, 5, 100.0, 20.0);
        let c = state_at(&mut world, 5, 12, 100.0, 40.0);
        set_relation(&mut world, a, b, Relation::Peace);
        set_relation(&mut world, a, c, Relation::War);
        let levels = tech_levels(&world);
        let level = advance_technology(&mut world, a, &levels).unwrap();
        let expected = 10.0 + 100.0 * 0.0005 + 20.0 * 0.001 - 40.0 * 0.0005;
        assert!((level - expected).abs() < 1e-12);
    }

    #[test]
    fn research_is_clamped_and_reads_the_snapshot() {
        let mut world = world();
        let a = state_at(&mut world, 5, 5, 1_000.0, 99.9);
        let b = state_at(&mut world, 12, 5, 0.0, 0.0);
        set_relation(&mut world, a, b, Relation::Peace);
        let levels = tech_levels(&world);
        assert_eq!(advance_technology(&mut world, a, &levels), Some(100.0));
        // b still sees a's level from before the phase
        advance_technology(&mut world, b, &levels).unwrap();
        let b_level = world.polity(b).unwrap().technology;
        assert!((b_level - 99.9 * 0.001).abs() < 1e-12, "b at {b_level}");
    }

    #[test]
    fn weapons_accrue_only_at_the_ceiling() {
        let mut world = world();
        let a = state_at(&mut world, 5, 5, 10.0, 99.0);
        assert_eq!(advance_weapons(&mut world, a), Some(0.0));
        world.polity_mut(a).unwrap().technology = 100.0;
        for _ in 0..150 {
            advance_weapons(&mut world, a);
        }
        let polity = world.polity(a).unwrap();
        assert_eq!(polity.whole_weapons(), 1);
        assert!((polity.weapon_progress() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn untriggered_state_holds_fire() {
        let mut world = world();
        let a = state_at(&mut world, 5, 5, 10.0, 100.0);
        let b = state_at(&mut world, 12, 5, 10.0, 100.0);
        set_relation(&mut world, a, b, Relation::War);
        world.polity_mut(a).unwrap().weapons = 3.0;
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert!(maybe_strike(&mut world, a, &mut rng).is_none());
        assert_eq!(world.polity(a).unwrap().weapons, 3.0);
    }

    #[test]
    fn armed_and_triggered_state_strikes_an_enemy_with_land() {
        for seed in 0..16 {
            let mut world = world();
            let a = state_at(&mut world, 5, 5, 40.0, 100.0);
            let b = state_at(&mut world, 20, 20, 40.0, 100.0);
            let c = state_at(&mut world, 5, 22, 40.0, 100.0);
            for tile in world.settlement(c).unwrap().territory.clone() {
                world.release_tile(tile);
            }
            set_relation(&mut world, a, b, Relation::War);
            set_relation(&mut world, a, c, Relation::War);
            let polity = world.polity_mut(a).unwrap();
            polity.weapons = 2.5;
            polity.war_triggered = true;
            let held = world.settlement(a).unwrap().territory.len();

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let report = maybe_strike(&mut world, a, &mut rng).expect("strike fires");

            let pos = world.grid().pos(report.target);
            assert!((17..=23).contains(&pos.x) && (17..=23).contains(&pos.y));
            assert_eq!(report.by, a);
            assert!(report.losses.get(&b).is_some_and(|lost| *lost > 0));
            assert!(!report.losses.contains_key(&c));
            assert_eq!(world.polity(a).unwrap().weapons, 1.5);
            assert_eq!(world.settlement(a).unwrap().territory.len(), held);
            assert!(world.contains(c));
        }
    }
}
