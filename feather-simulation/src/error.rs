use feather_core::AgentId;
use thiserror::Error;

use crate::species::Species;

/// Errors raised while building or inspecting a simulation.
///
/// Stepping never fails; numerical edge cases are handled by policy inside
/// the force pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Arena dimensions must be positive, got {width}x{height}")]
    InvalidArena { width: f32, height: f32 },

    #[error("Cell size must be positive and yield at most 2^20 cells, got {0}")]
    InvalidCellSize(f32),

    #[error("Invalid tuning for {species}: {reason}")]
    InvalidTuning { species: Species, reason: String },

    #[error("Invalid obstacle: {0}")]
    InvalidObstacle(String),

    #[error("Position ({x}, {y}) lies outside the arena")]
    OutOfArena { x: f32, y: f32 },

    #[error("Spawn region is empty: {0}")]
    EmptySpawnRegion(String),

    #[error("Unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error("Grid invariant violated: {0}")]
    GridInconsistency(String),
}
