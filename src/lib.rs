pub mod config;
pub mod engine;
pub mod error;
pub mod rng;
pub mod scenario;
pub mod settlement;
pub mod snapshot;
pub mod spatial;
pub mod systems;
pub mod territory;
pub mod world;

pub use config::SimParams;
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use error::{InvariantViolation, ScenarioError};
pub use scenario::{Scenario, ScenarioLoader};
pub use settlement::{Relation, Settlement, StageKind, Stockpile};
pub use world::{SettlementId, World, WorldSnapshot};
