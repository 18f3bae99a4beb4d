//! The three species and their cyclic flee/chase relation.

use feather_core::AgentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Agent species. Each species flees one other species and chases the third,
/// giving rock-paper-scissors dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Red,
    Green,
    Blue,
}

impl Species {
    pub const COUNT: usize = 3;
    pub const ALL: [Species; Species::COUNT] = [Species::Red, Species::Green, Species::Blue];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Species::Red => 0,
            Species::Green => 1,
            Species::Blue => 2,
        }
    }

    /// Species at `index`, wrapping modulo the species count.
    #[inline]
    pub fn from_index(index: usize) -> Species {
        Species::ALL[index % Species::COUNT]
    }

    /// Canonical initial assignment: species follows the agent id modulo three.
    pub fn for_agent(id: AgentId) -> Species {
        Species::from_index(id.index())
    }

    /// The species this one runs away from.
    #[inline]
    pub fn flees(self) -> Species {
        Species::from_index(self.index() + 2)
    }

    /// The species this one hunts (and converts on collision).
    #[inline]
    pub fn chases(self) -> Species {
        Species::from_index(self.index() + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Red => "RED",
            Species::Green => "GREEN",
            Species::Blue => "BLUE",
        }
    }

    /// Display color as RGB.
    pub fn color(self) -> [u8; 3] {
        match self {
            Species::Red => [255, 0, 0],
            Species::Green => [0, 255, 0],
            Species::Blue => [0, 0, 255],
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per species, indexed by [`Species`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PerSpecies<T>([T; Species::COUNT]);

impl<T> PerSpecies<T> {
    pub fn new(red: T, green: T, blue: T) -> Self {
        PerSpecies([red, green, blue])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Species, &T)> {
        Species::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Clone> PerSpecies<T> {
    pub fn splat(value: T) -> Self {
        PerSpecies([value.clone(), value.clone(), value])
    }
}

impl<T> Index<Species> for PerSpecies<T> {
    type Output = T;

    fn index(&self, species: Species) -> &T {
        &self.0[species.index()]
    }
}

impl<T> IndexMut<Species> for PerSpecies<T> {
    fn index_mut(&mut self, species: Species) -> &mut T {
        &mut self.0[species.index()]
    }
}
