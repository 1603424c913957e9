use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::warn;

use crate::{
    config::{LoggingConfig, SimParams},
    error::ScenarioError,
    spatial::{ResourceKind, TileGrid, TilePos},
    world::{PromotableCluster, SettlementSeed, World},
};

fn default_snapshot_interval_ticks() -> u64 {
    30
}

fn default_min_quantity() -> f64 {
    50.0
}

fn default_max_quantity() -> f64 {
    200.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    pub grid: GridConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub params: SimParams,
    #[serde(default)]
    pub clusters: Vec<PromotableCluster>,
    #[serde(default)]
    pub settlements: Vec<SettlementSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    /// Fill every tile with this kind instead of drawing one per tile.
    #[serde(default)]
    pub resource: Option<ResourceKind>,
    #[serde(default = "default_min_quantity")]
    pub min_quantity: f64,
    #[serde(default = "default_max_quantity")]
    pub max_quantity: f64,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario = Scenario::from_yaml(&data)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn from_yaml(data: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(data).context("invalid scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::MissingName);
        }
        let (width, height) = (self.grid.width, self.grid.height);
        if width == 0 || height == 0 {
            return Err(ScenarioError::EmptyGrid { width, height });
        }
        let (min, max) = (self.grid.min_quantity, self.grid.max_quantity);
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(ScenarioError::ResourceRange { min, max });
        }
        let positions = self
            .clusters
            .iter()
            .map(|c| ("cluster", c.position))
            .chain(self.settlements.iter().map(|s| ("settlement", s.position)));
        for (what, pos) in positions {
            if pos.x >= width || pos.y >= height {
                return Err(ScenarioError::OutOfBounds {
                    what,
                    x: pos.x,
                    y: pos.y,
                    width,
                    height,
                });
            }
        }
        Ok(())
    }

    /// Fills the grid from the scenario seed, then places settlements and
    /// founds tribes from the listed clusters, in file order.
    pub fn build_world(&self) -> Result<World> {
        self.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let (min, max) = (self.grid.min_quantity, self.grid.max_quantity);
        let grid = TileGrid::new(self.grid.width, self.grid.height, |_: TilePos| {
            let kind = self
                .grid
                .resource
                .unwrap_or_else(|| ResourceKind::ALL[rng.gen_range(0..ResourceKind::ALL.len())]);
            let quantity = if max > min { rng.gen_range(min..=max) } else { min };
            (kind, quantity)
        });

        let mut world = World::new(grid, self.params.clone());
        for seed in &self.settlements {
            if world.spawn(seed.clone()).is_none() {
                warn!(position = ?seed.position, "settlement could not be placed");
            }
        }
        for cluster in &self.clusters {
            if world.found_tribe(cluster).is_none() {
                warn!(
                    position = ?cluster.position,
                    members = cluster.members,
                    "cluster does not meet the founding rule"
                );
            }
        }
        Ok(world)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: meadow
seed: 7
grid:
  width: 12
  height: 10
"#;

    #[test]
    fn minimal_file_takes_defaults() {
        let scenario = Scenario::from_yaml(MINIMAL).unwrap();
        assert_eq!(scenario.snapshot_interval_ticks, 30);
        assert_eq!(scenario.ticks(None), 120);
        assert_eq!(scenario.ticks(Some(5)), 5);
        assert_eq!(scenario.params, SimParams::default());
        assert_eq!(scenario.logging.level, "info");
        let world = scenario.build_world().unwrap();
        assert_eq!(world.grid().tile_count(), 120);
        assert!(world
            .grid()
            .tiles()
            .all(|(_, t)| (50.0..=200.0).contains(&t.quantity)));
    }

    #[test]
    fn same_seed_same_grid() {
        let a = Scenario::from_yaml(MINIMAL).unwrap().build_world().unwrap();
        let b = Scenario::from_yaml(MINIMAL).unwrap().build_world().unwrap();
        let fill = |w: &World| -> Vec<(ResourceKind, f64)> {
            w.grid().tiles().map(|(_, t)| (t.resource, t.quantity)).collect()
        };
        assert_eq!(fill(&a), fill(&b));
    }

    #[test]
    fn rejects_out_of_bounds_settlement() {
        let yaml = r#"
name: edge
seed: 1
grid: { width: 5, height: 5 }
settlements:
  - stage: state
    position: { x: 5, y: 2 }
    population: 50
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        let cause = err.downcast_ref::<ScenarioError>().unwrap();
        assert!(matches!(cause, ScenarioError::OutOfBounds { x: 5, .. }));
    }

    #[test]
    fn rejects_inverted_resource_range() {
        let yaml = r#"
name: barren
seed: 1
grid: { width: 5, height: 5, min_quantity: 10, max_quantity: 1 }
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("resource range"));
    }
}
