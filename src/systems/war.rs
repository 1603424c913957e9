use std::collections::HashSet;

use anyhow::Result;
use rand::Rng;
use tracing::{debug, info};

use crate::{
    engine::{System, SystemContext},
    rng::PhaseRng,
    spatial::TileId,
    world::{SettlementId, SimEvent, World},
};

/// One border battle per enemy per state per tick.
pub struct WarSystem;

impl WarSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WarSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WarSystem {
    fn name(&self) -> &str {
        "war"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut PhaseRng<'_>,
    ) -> Result<()> {
        let mut captured = HashSet::new();
        let mut battles = 0;
        for id in world.state_ids() {
            if world.polity(id).is_some_and(|p| p.at_war()) {
                battles += resolve_wars(world, id, &mut captured, rng).len();
            }
        }
        if battles > 0 {
            debug!(tick = ctx.tick, battles, "war phase resolved");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Battle {
    pub winner: SettlementId,
    pub loser: SettlementId,
    /// Tile that changed hands.
    pub tile: TileId,
    pub loser_fell: bool,
}

/// Fights one battle against every enemy of `id`, in enemy id order.
///
/// A tile already captured this tick cannot change hands again; a pair
/// touching such a tile is skipped before any dice are rolled.
pub fn resolve_wars<R: Rng + ?Sized>(
    world: &mut World,
    id: SettlementId,
    captured: &mut HashSet<TileId>,
    rng: &mut R,
) -> Vec<Battle> {
    let mut battles = Vec::new();
    let enemies = match world.polity(id) {
        Some(polity) => polity.enemies(),
        None => return battles,
    };
    for enemy in enemies {
        if !world.contains(id) {
            break;
        }
        if world.polity(enemy).is_none() {
            continue;
        }
        let front = world.combat_front(id, enemy);
        if front.is_empty() {
            continue;
        }
        let (own_tile, enemy_tile) = front[rng.gen_range(0..front.len())];
        if captured.contains(&own_tile) || captured.contains(&enemy_tile) {
            continue;
        }
        if let Some(battle) = fight(world, id, enemy, own_tile, enemy_tile, rng) {
            captured.insert(battle.tile);
            battles.push(battle);
        }
    }
    battles
}

/// Resolves a single battle over a touching pair of tiles.
pub fn fight<R: Rng + ?Sized>(
    world: &mut World,
    attacker: SettlementId,
    defender: SettlementId,
    attacker_tile: TileId,
    defender_tile: TileId,
    rng: &mut R,
) -> Option<Battle> {
    let attack = world.power(attacker);
    let defence = world.power(defender);
    let total = attack + defence;
    if total <= 0.0 {
        return None;
    }
    let attacker_wins = rng.gen::<f64>() < attack / total;
    let (winner, loser, tile) = if attacker_wins {
        (attacker, defender, defender_tile)
    } else {
        (defender, attacker, attacker_tile)
    };
    if !world.transfer_tile(tile, loser, winner) {
        return None;
    }
    world.record(SimEvent::Captured {
        tile,
        from: loser,
        to: winner,
    });

    let attrition = world.params().war.attrition;
    for side in [winner, loser] {
        if let Some(settlement) = world.settlement_mut(side) {
            settlement.suffer_losses(attrition);
        }
    }
    if let Some(polity) = world.polity_mut(loser) {
        if polity.whole_weapons() >= 1 {
            polity.war_triggered = true;
        }
    }

    let loser_fell = world
        .settlement(loser)
        .is_some_and(|s| s.territory.is_empty());
    if loser_fell {
        world.remove_settlement(loser);
        world.record(SimEvent::Perished { settlement: loser });
        info!(winner = winner.raw(), loser = loser.raw(), "state conquered");
    }
    Some(Battle {
        winner,
        loser,
        tile,
        loser_fell,
    })
}
