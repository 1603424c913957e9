use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, trace};

use crate::{
    rng::{PhaseRng, PhaseStreams},
    snapshot::SnapshotWriter,
    systems::{
        BookkeepingSystem, DiplomacySystem, FrontierSystem, LifecycleSystem, TechnologySystem,
        WarSystem,
    },
    world::{World, WorldSnapshot},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Registers the tick phases in their required order:
    /// lifecycle, frontier, diplomacy, war, technology, bookkeeping.
    pub fn with_standard_phases(self) -> Self {
        self.with_system(LifecycleSystem::new())
            .with_system(FrontierSystem::new())
            .with_system(DiplomacySystem::new())
            .with_system(WarSystem::new())
            .with_system(TechnologySystem::new())
            .with_system(BookkeepingSystem::new())
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: PhaseStreams::new(self.settings.seed),
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: PhaseStreams,
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    /// Runs `ticks` ticks, handing a snapshot to `hook` after each one.
    pub fn run_with_hook(
        &mut self,
        world: &mut World,
        ticks: u64,
        mut hook: impl FnMut(WorldSnapshot),
    ) -> Result<()> {
        for _ in 0..ticks {
            self.step(world)?;
            hook(world.snapshot(&self.settings.scenario_name));
        }
        Ok(())
    }

    pub fn step(&mut self, world: &mut World) -> Result<()> {
        let current_tick = world.tick();
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name());
            let ctx = SystemContext {
                tick: current_tick,
                scenario_name: &self.settings.scenario_name,
            };
            trace!(tick = current_tick, system = system.name(), "running phase");
            system.run(&ctx, world, &mut rng_stream)?;
        }
        world.advance_time();
        if let Some(path) = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?
        {
            debug!(tick = world.tick(), path = %path.display(), "snapshot written");
        }
        Ok(())
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut PhaseRng<'_>,
    ) -> Result<()>;
}
