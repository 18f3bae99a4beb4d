//! Rock-paper-scissors flocking on a torus.
//!
//! Three species of agents share a wrap-around arena. Each species flocks
//! with its own kind, chases the species it beats, flees the one that beats
//! it and steers around static obstacles. A chaser that runs head-on into its
//! prey converts it. Neighbor lookup goes through a uniform [`SpatialGrid`]
//! bucketed by species.

pub mod agent;
pub mod error;
pub mod grid;
pub mod obstacle;
pub mod simulation;
pub mod snapshot;
pub mod spawn;
pub mod species;
pub mod steering;
pub mod tuning;

pub use agent::{Agent, ThinkContext, Thought};
pub use error::SimulationError;
pub use grid::{CellCoord, SpatialGrid};
pub use obstacle::{Obstacle, ObstacleRegistry};
pub use simulation::{Simulation, SimulationParams, StepMode};
pub use snapshot::{AgentView, Census, FrameSnapshot};
pub use spawn::SpawnRegion;
pub use species::{PerSpecies, Species};
pub use steering::FlockForce;
pub use tuning::{Arena, ConversionRule, SpeciesTuning};
