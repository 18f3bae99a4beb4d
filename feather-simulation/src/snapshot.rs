use feather_core::AgentId;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::species::{PerSpecies, Species};

/// What a renderer needs to draw one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub species: Species,
    pub x: f32,
    pub y: f32,
    /// Degrees from the +x axis.
    pub heading: f32,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        let position = agent.position();
        Self {
            id: agent.id(),
            species: agent.species(),
            x: position.x,
            y: position.y,
            heading: agent.heading(),
        }
    }
}

/// Population per species.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub red: usize,
    pub green: usize,
    pub blue: usize,
}

impl Census {
    pub fn total(&self) -> usize {
        self.red + self.green + self.blue
    }
}

impl From<PerSpecies<usize>> for Census {
    fn from(counts: PerSpecies<usize>) -> Self {
        Self {
            red: counts[Species::Red],
            green: counts[Species::Green],
            blue: counts[Species::Blue],
        }
    }
}

/// Complete per-frame output for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    /// Simulated seconds since start.
    pub time: f64,
    pub agents: Vec<AgentView>,
    pub census: Census,
}
