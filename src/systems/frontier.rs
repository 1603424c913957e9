use anyhow::Result;
use tracing::trace;

use crate::{
    engine::{System, SystemContext},
    rng::PhaseRng,
    world::{SimEvent, World},
};

/// Settles the frontier after lifecycle changes: landless states are
/// dropped and stale contact sets are rebuilt for the diplomacy phase.
pub struct FrontierSystem;

impl FrontierSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FrontierSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for FrontierSystem {
    fn name(&self) -> &str {
        "frontier"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut PhaseRng<'_>,
    ) -> Result<()> {
        for id in world.state_ids() {
            let landless = world
                .settlement(id)
                .is_some_and(|s| s.territory.is_empty());
            if landless {
                world.remove_settlement(id);
                world.record(SimEvent::Perished { settlement: id });
                continue;
            }
            let contacts = world.contacts(id);
            trace!(
                tick = ctx.tick,
                state = id.raw(),
                contacts = contacts.len(),
                "frontier refreshed"
            );
        }
        Ok(())
    }
}
