use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a simulated agent.
///
/// Ids are dense and handed out in spawn order starting at zero, so an id
/// doubles as the agent's index into the driver's agent arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(u32);

impl AgentId {
    pub fn new(id: u32) -> Self {
        AgentId(id)
    }

    pub fn id(&self) -> u32 {
        self.0
    }

    /// Index of this agent in a dense arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for AgentId {
    fn from(id: u32) -> Self {
        AgentId(id)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
