//! Gathering, upkeep, growth, expansion and promotion of every settlement.

use std::collections::BTreeSet;

use anyhow::Result;
use rand::Rng;
use tracing::{debug, info};

use crate::{
    config::{SimParams, StageProfile},
    engine::{System, SystemContext},
    rng::PhaseRng,
    settlement::{Settlement, StageKind},
    spatial::{ResourceKind, TileGrid, TileId},
    world::{SettlementId, SimEvent, World},
};

pub struct LifecycleSystem;

impl LifecycleSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LifecycleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for LifecycleSystem {
    fn name(&self) -> &str {
        "lifecycle"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        rng: &mut PhaseRng<'_>,
    ) -> Result<()> {
        world.bookkeeping.starving.clear();
        world.bookkeeping.events.clear();
        for id in world.settlement_ids() {
            if world.contains(id) {
                advance(world, id, rng);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upkeep {
    Fed,
    Grew,
    Starved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleReport {
    pub upkeep: Upkeep,
    pub expanded: Option<TileId>,
    pub promoted: Option<StageKind>,
    pub perished: bool,
}

/// One tick of a single settlement's life.
pub fn advance<R: Rng + ?Sized>(
    world: &mut World,
    id: SettlementId,
    rng: &mut R,
) -> Option<LifecycleReport> {
    let settlement = world.settlements.get_mut(&id)?;
    let profile = world.params.profile(settlement.kind());
    // thresholds are judged on the settlement as it entered the tick
    let ready = profile
        .promotion
        .is_some_and(|t| t.is_met(settlement.population, &settlement.stock));
    gather(&mut world.grid, settlement, profile, world.params.trade_fraction);
    let capacity = settlement.capacity(&world.params);
    let upkeep = consume(settlement, &world.params, profile.growth_increment, capacity);
    if upkeep == Upkeep::Starved {
        let name = settlement.name.clone();
        world.bookkeeping.starving.push(name);
    }

    let mut report = LifecycleReport {
        upkeep,
        expanded: None,
        promoted: None,
        perished: false,
    };
    let landless = settlement.is_state() && settlement.territory.is_empty();
    if settlement.population <= 0.0 || landless {
        perish(world, id);
        report.perished = true;
        return Some(report);
    }

    if settlement.is_state() {
        report.expanded = expand(world, id, rng);
    }

    let settlement = world.settlements.get_mut(&id)?;
    let threshold = world.params.profile(settlement.kind()).promotion;
    settlement.progress = threshold
        .map(|t| t.progress(settlement.population, &settlement.stock))
        .unwrap_or(1.0);
    if ready || threshold.is_some_and(|t| t.is_met(settlement.population, &settlement.stock)) {
        report.promoted = promote(world, id);
        report.perished = !world.contains(id);
    }
    Some(report)
}

/// Extracts from every territory tile, spreading the stage rate over the territory.
pub fn gather(
    grid: &mut TileGrid,
    settlement: &mut Settlement,
    profile: &StageProfile,
    trade_fraction: f64,
) {
    if settlement.territory.is_empty() || settlement.population <= 0.0 {
        return;
    }
    let rate = profile.gather_rate * settlement.population / settlement.territory.len() as f64;
    for &tile_id in &settlement.territory {
        let tile = grid.tile_mut(tile_id);
        let amount = rate.min(tile.quantity);
        if amount <= 0.0 {
            continue;
        }
        tile.quantity -= amount;
        for kind in ResourceKind::ALL {
            let share = if kind == tile.resource {
                amount
            } else {
                amount * trade_fraction
            };
            *settlement.stock.get_mut(kind) += share;
        }
    }
}

/// Food and water upkeep. A short resource is left alone and costs population.
pub fn consume(
    settlement: &mut Settlement,
    params: &SimParams,
    growth_increment: f64,
    capacity: f64,
) -> Upkeep {
    let population = settlement.population;
    let food_need = population * params.food_per_capita;
    let water_need = population * params.water_per_capita;
    let stock = &mut settlement.stock;
    let fed = stock.food >= food_need;
    let watered = stock.water >= water_need;
    if fed {
        stock.food -= food_need;
    }
    if watered {
        stock.water -= water_need;
    }
    stock.clamp_non_negative();

    if !(fed && watered) {
        settlement.population = (population - params.starvation_loss).max(0.0);
        return Upkeep::Starved;
    }

    let surplus = population * params.growth_stock_multiple;
    if stock.food > surplus && stock.water > surplus && population < capacity {
        settlement.population = (population + growth_increment).min(capacity);
        return Upkeep::Grew;
    }
    Upkeep::Fed
}

/// Buys one free tile next to the border, if the dice and the treasury allow it.
pub fn expand<R: Rng + ?Sized>(world: &mut World, id: SettlementId, rng: &mut R) -> Option<TileId> {
    let rule = world.params.expansion.clone();
    if !rng.gen_bool(rule.chance.clamp(0.0, 1.0)) {
        return None;
    }
    let settlement = world.settlements.get(&id)?;
    let polity = settlement.polity()?;
    if !settlement.stock.covers(&rule.cost) {
        return None;
    }
    let candidates: BTreeSet<TileId> = polity
        .border
        .iter()
        .flat_map(|t| world.grid.neighbors(*t).iter().copied())
        .filter(|n| world.grid.tile(*n).is_claimable())
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let tile = *candidates.iter().nth(rng.gen_range(0..candidates.len()))?;
    world.settlements.get_mut(&id)?.stock.debit(&rule.cost);
    if !world.claim_tile(tile, id) {
        return None;
    }
    debug!(settlement = id.raw(), tile = tile.raw(), "state expanded");
    world.record(SimEvent::Expanded {
        settlement: id,
        tile,
    });
    Some(tile)
}

/// Replaces a settlement with its next-stage variant.
pub fn promote(world: &mut World, id: SettlementId) -> Option<StageKind> {
    let next = world.settlements.get(&id)?.kind().next()?;
    let settlement = world.settlements.remove(&id)?;
    let radius = world.params.profile(next).territory_radius;
    let position = settlement.position;
    match next {
        StageKind::City => {
            let territory = world.grid.square(position, radius);
            world
                .settlements
                .insert(id, settlement.promote(territory, None));
        }
        StageKind::State => {
            let technology = world.params.technology.initial_level;
            let polity = world.new_polity(technology);
            world
                .settlements
                .insert(id, settlement.promote(Vec::new(), Some(polity)));
            if world.seed_territory(id, position, radius) == 0 {
                debug!(settlement = id.raw(), "no free land for new state");
                perish(world, id);
                return Some(next);
            }
        }
        StageKind::Tribe => return None,
    }
    info!(settlement = id.raw(), stage = ?next, "settlement promoted");
    world.record(SimEvent::Promoted {
        settlement: id,
        stage: next,
    });
    Some(next)
}

fn perish(world: &mut World, id: SettlementId) {
    if world.remove_settlement(id).is_some() {
        debug!(settlement = id.raw(), "settlement perished");
        world.record(SimEvent::Perished { settlement: id });
    }
}
