use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::PhaseRng,
    world::World,
};

pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut PhaseRng<'_>,
    ) -> Result<()> {
        for settlement in world.settlements.values_mut() {
            settlement.stock.clamp_non_negative();
        }
        world.bookkeeping.starving.sort();
        world.bookkeeping.starving.dedup();
        if world.params.strict_invariants {
            world
                .verify_invariants()
                .with_context(|| format!("invariant check failed at tick {}", ctx.tick))?;
        }
        debug!(
            tick = ctx.tick,
            settlements = world.settlements.len(),
            states = world.state_ids().len(),
            population = world.total_population(),
            "tick closed"
        );
        Ok(())
    }
}
