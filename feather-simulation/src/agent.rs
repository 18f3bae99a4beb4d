/*
 * Agent Module
 *
 * Per-agent state and the two halves of an agent's frame:
 * 1. think: gather candidates from the grid window and combine the
 *    flee, chase, flock and obstacle-avoidance forces
 * 2. integrate: velocity, speed cap, position, torus wrap, heading
 *
 * Agents never hold a reference to the grid or to each other. The driver
 * lends them a read-only ThinkContext and applies any side effects
 * (species conversions, grid relocation) itself.
 */

use feather_core::{AgentId, Vector2, Vector2Ext};
use smallvec::SmallVec;

use crate::grid::{CellCoord, SpatialGrid};
use crate::obstacle::ObstacleRegistry;
use crate::species::{PerSpecies, Species};
use crate::steering::{self, FlockForce};
use crate::tuning::{Arena, ConversionRule, SpeciesTuning};

#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    species: Species,
    position: Vector2,
    velocity: Vector2,
    acceleration: Vector2,
    cell: CellCoord,
    heading: f32,
}

/// Everything an agent reads while thinking.
#[derive(Clone, Copy)]
pub struct ThinkContext<'a> {
    pub agents: &'a [Agent],
    pub grid: &'a SpatialGrid,
    pub obstacles: &'a ObstacleRegistry,
    pub tuning: &'a PerSpecies<SpeciesTuning>,
    pub conversion: &'a ConversionRule,
}

/// Result of one `think`: the individual force terms plus the prey to convert.
#[derive(Debug, Clone, Default)]
pub struct Thought {
    pub flee: Vector2,
    pub chase: Vector2,
    pub flock: FlockForce,
    pub avoidance: Vector2,
    pub conversions: SmallVec<[AgentId; 2]>,
}

impl Thought {
    /// Net acceleration (mass is one, so force equals acceleration).
    pub fn acceleration(&self) -> Vector2 {
        self.chase - self.flee + self.flock.total() + self.avoidance
    }
}

impl Agent {
    pub(crate) fn new(
        id: AgentId,
        species: Species,
        position: Vector2,
        velocity: Vector2,
        cell: CellCoord,
    ) -> Self {
        Self {
            id,
            species,
            position,
            velocity,
            acceleration: Vector2::ZERO,
            cell,
            heading: velocity.rotation_degrees(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    /// Acceleration applied during the most recent step.
    pub fn acceleration(&self) -> Vector2 {
        self.acceleration
    }

    /// Grid cell cached from the current position.
    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    /// Direction of travel in degrees from the +x axis.
    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Rotation for a sprite drawn pointing up, clockwise-positive.
    pub fn sprite_rotation(&self) -> f32 {
        -(self.heading - 90.0)
    }

    pub(crate) fn set_species(&mut self, species: Species) {
        self.species = species;
    }

    pub(crate) fn set_cell(&mut self, cell: CellCoord) {
        self.cell = cell;
    }

    pub fn think(&self, ctx: &ThinkContext<'_>) -> Thought {
        let tuning = &ctx.tuning[self.species];
        let radius = ctx.grid.window_radius(tuning.sensing_range);
        let candidates = ctx.grid.neighbors_in_window(self.cell, radius);

        let flee = steering::pursuit_force(
            self,
            tuning,
            ctx.agents,
            &candidates[self.species.flees()],
            None,
        );
        let chase = steering::pursuit_force(
            self,
            tuning,
            ctx.agents,
            &candidates[self.species.chases()],
            Some(ctx.conversion),
        );
        let flock = steering::flock_force(self, tuning, ctx.agents, &candidates[self.species]);
        let avoidance = steering::avoid_obstacles(self, tuning, ctx.obstacles);

        Thought {
            flee: flee.force,
            chase: chase.force,
            flock,
            avoidance,
            conversions: chase.conversions,
        }
    }

    /// Applies `acceleration` over `dt`, caps speed and wraps onto the torus.
    /// The caller refreshes the grid cell afterwards.
    pub fn integrate(
        &mut self,
        acceleration: Vector2,
        dt: f32,
        tuning: &SpeciesTuning,
        arena: &Arena,
    ) {
        self.acceleration = acceleration;

        self.velocity += acceleration * dt;
        self.velocity.limit_in_place(tuning.speed_cap);

        self.position += self.velocity * dt;
        self.position = arena.wrap(self.position);

        self.heading = self.velocity.rotation_degrees();
    }
}
