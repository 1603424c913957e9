use thiserror::Error;

use crate::{spatial::TilePos, world::SettlementId};

/// A broken ownership or diplomacy invariant. Never expected at runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("tile {pos:?} is owned by {owner:?}, which is not an active state")]
    UnknownOwner { pos: TilePos, owner: SettlementId },

    #[error("tile {pos:?} is owned by {owner:?} but missing from its territory")]
    MissingFromTerritory { pos: TilePos, owner: SettlementId },

    #[error("state {state:?} lists tile {pos:?} owned by {actual:?}")]
    ForeignTerritory {
        state: SettlementId,
        pos: TilePos,
        actual: Option<SettlementId>,
    },

    #[error("state {state:?} lists tile {pos:?} more than once")]
    DuplicateTerritory { state: SettlementId, pos: TilePos },

    #[error("state {state:?} border set drifted: {stale} stale, {missing} missing")]
    BorderMismatch {
        state: SettlementId,
        stale: usize,
        missing: usize,
    },

    #[error("relation between {a:?} and {b:?} is not symmetric")]
    AsymmetricRelation { a: SettlementId, b: SettlementId },
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("scenario must define a name")]
    MissingName,

    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },

    #[error("resource range {min}..={max} is invalid")]
    ResourceRange { min: f64, max: f64 },

    #[error("{what} at ({x}, {y}) lies outside the {width}x{height} grid")]
    OutOfBounds {
        what: &'static str,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}
