//! Simulation Driver
//!
//! Owns the grid, the obstacle registry and the agent arena, and advances
//! every agent once per frame. Agents are addressed by [`AgentId`], which is
//! also their index in the arena.
//!
//! # Update order
//!
//! In [`StepMode::Sequential`] agents are stepped in ascending id order and
//! each one reads the population as it is at that moment: an agent stepped
//! later in a frame sees the new positions of agents stepped earlier, and
//! sees any species conversions they caused. Results therefore depend on
//! id order, and that order is fixed.
//!
//! [`StepMode::Parallel`] computes every agent's forces from the frame-start
//! state on the rayon pool, then applies the buffered conversions in
//! ascending converter id order, then integrates in ascending id order. The
//! outcome does not depend on the number of threads.

use feather_core::{AgentId, Vector2, Vector2Ext};
use log::{debug, trace};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ThinkContext, Thought};
use crate::error::SimulationError;
use crate::grid::SpatialGrid;
use crate::obstacle::{Obstacle, ObstacleRegistry};
use crate::snapshot::{AgentView, FrameSnapshot};
use crate::spawn::{self, SpawnRegion};
use crate::species::{PerSpecies, Species};
use crate::tuning::{Arena, ConversionRule, SpeciesTuning};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepMode {
    /// Live mutation in ascending id order.
    #[default]
    Sequential,
    /// Snapshot forces in parallel, deferred conversions.
    Parallel,
}

/// Construction inputs for a [`Simulation`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub arena: Arena,
    pub cell_size: f32,
    pub tuning: PerSpecies<SpeciesTuning>,
    pub conversion: ConversionRule,
    pub step_mode: StepMode,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            cell_size: 64.0,
            tuning: PerSpecies::default(),
            conversion: ConversionRule::default(),
            step_mode: StepMode::default(),
        }
    }
}

pub struct Simulation {
    arena: Arena,
    grid: SpatialGrid,
    obstacles: ObstacleRegistry,
    agents: Vec<Agent>,
    tuning: PerSpecies<SpeciesTuning>,
    conversion: ConversionRule,
    step_mode: StepMode,
    frame: u64,
    elapsed: f64,
}

impl Simulation {
    pub fn new(params: SimulationParams) -> Result<Self, SimulationError> {
        for (species, tuning) in params.tuning.iter() {
            tuning.validate(species)?;
        }
        let grid = SpatialGrid::new(&params.arena, params.cell_size)?;
        let (cols, rows) = grid.dimensions();
        debug!(
            "Created {}x{} arena with a {}x{} grid of {}-unit cells",
            params.arena.width, params.arena.height, cols, rows, params.cell_size
        );

        Ok(Self {
            arena: params.arena,
            grid,
            obstacles: ObstacleRegistry::new(),
            agents: Vec::new(),
            tuning: params.tuning,
            conversion: params.conversion,
            step_mode: params.step_mode,
            frame: 0,
            elapsed: 0.0,
        })
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        debug!(
            "Registered obstacle at {:?} with radius {}",
            obstacle.position(),
            obstacle.radius()
        );
        self.obstacles.register(obstacle);
    }

    /// Adds one agent and files it in the grid. Velocity is capped to the species speed cap.
    pub fn spawn_agent(
        &mut self,
        species: Species,
        position: Vector2,
        velocity: Vector2,
    ) -> Result<AgentId, SimulationError> {
        if !self.arena.contains(position) {
            return Err(SimulationError::OutOfArena {
                x: position.x,
                y: position.y,
            });
        }

        let id = AgentId::new(self.agents.len() as u32);
        let cell = self.grid.cell_for(position);
        let velocity = velocity.limit(self.tuning[species].speed_cap);
        self.grid.insert(id, cell, species);
        self.agents.push(Agent::new(id, species, position, velocity, cell));
        trace!("Spawned {} agent {} at {:?}", species, id, position);
        Ok(id)
    }

    /// Spawns `count` agents in the quadrant boxes of `region`, with species
    /// following the agent id and a random starting velocity.
    pub fn populate<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        region: &SpawnRegion,
        rng: &mut R,
    ) -> Result<(), SimulationError> {
        for _ in 0..count {
            let species = Species::for_agent(AgentId::new(self.agents.len() as u32));
            let position = region.sample(rng)?;
            let velocity = spawn::initial_velocity(species, rng);
            self.spawn_agent(species, position, velocity)?;
        }
        debug!("Populated {} agents: {:?}", count, self.population_by_species());
        Ok(())
    }

    fn think_context(&self) -> ThinkContext<'_> {
        ThinkContext {
            agents: &self.agents,
            grid: &self.grid,
            obstacles: &self.obstacles,
            tuning: &self.tuning,
            conversion: &self.conversion,
        }
    }

    /// Advances every agent by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        match self.step_mode {
            StepMode::Sequential => {
                for index in 0..self.agents.len() {
                    self.step_agent_at(index, dt);
                }
            }
            StepMode::Parallel => self.step_parallel(dt),
        }

        self.frame += 1;
        self.elapsed += dt as f64;
        trace!("Frame {} done at t={:.3}s", self.frame, self.elapsed);
    }

    /// Advances a single agent: think, convert, integrate, relocate.
    pub fn step_agent(&mut self, id: AgentId, dt: f32) -> Result<(), SimulationError> {
        if id.index() >= self.agents.len() {
            return Err(SimulationError::UnknownAgent(id));
        }
        self.step_agent_at(id.index(), dt);
        Ok(())
    }

    fn step_agent_at(&mut self, index: usize, dt: f32) {
        let species = self.agents[index].species();
        let thought = self.agents[index].think(&self.think_context());
        self.apply_conversions(index, species, &thought);
        self.integrate_at(index, thought.acceleration(), dt);
    }

    fn step_parallel(&mut self, dt: f32) {
        let thoughts: Vec<(Species, Thought)> = {
            let ctx = self.think_context();
            self.agents
                .par_iter()
                .map(|agent| (agent.species(), agent.think(&ctx)))
                .collect()
        };

        // Converters act as the species they were when they thought
        for (index, (species, thought)) in thoughts.iter().enumerate() {
            self.apply_conversions(index, *species, thought);
        }
        for (index, (_, thought)) in thoughts.iter().enumerate() {
            self.integrate_at(index, thought.acceleration(), dt);
        }
    }

    fn apply_conversions(&mut self, converter: usize, species: Species, thought: &Thought) {
        for &target in &thought.conversions {
            let index = target.index();
            if self.agents[index].species() != species {
                debug!(
                    "Agent {} converted {} from {} to {}",
                    self.agents[converter].id(),
                    target,
                    self.agents[index].species(),
                    species
                );
                self.retype_at(index, species);
            }
        }
    }

    fn integrate_at(&mut self, index: usize, acceleration: Vector2, dt: f32) {
        let agent = &mut self.agents[index];
        let tuning = &self.tuning[agent.species()];
        agent.integrate(acceleration, dt, tuning, &self.arena);

        let old_cell = agent.cell();
        let new_cell = self.grid.cell_for(agent.position());
        if new_cell != old_cell {
            self.grid.relocate(agent.id(), agent.species(), old_cell, new_cell);
            agent.set_cell(new_cell);
        }
    }

    /// Changes an agent's species, moving it to the matching grid bucket.
    /// No-op when the species is unchanged.
    pub fn set_species(&mut self, id: AgentId, species: Species) -> Result<(), SimulationError> {
        if id.index() >= self.agents.len() {
            return Err(SimulationError::UnknownAgent(id));
        }
        self.retype_at(id.index(), species);
        Ok(())
    }

    fn retype_at(&mut self, index: usize, species: Species) {
        let agent = &mut self.agents[index];
        let old_species = agent.species();
        if old_species == species {
            return;
        }
        self.grid.reclassify(agent.id(), agent.cell(), old_species, species);
        agent.set_species(species);
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn obstacles(&self) -> &ObstacleRegistry {
        &self.obstacles
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn tuning(&self, species: Species) -> &SpeciesTuning {
        &self.tuning[species]
    }

    pub fn step_mode(&self) -> StepMode {
        self.step_mode
    }

    pub fn set_step_mode(&mut self, step_mode: StepMode) {
        self.step_mode = step_mode;
    }

    /// Frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated seconds stepped so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn population_by_species(&self) -> PerSpecies<usize> {
        let mut counts = PerSpecies::splat(0);
        for agent in &self.agents {
            counts[agent.species()] += 1;
        }
        counts
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            frame: self.frame,
            time: self.elapsed,
            agents: self.agents.iter().map(AgentView::from).collect(),
            census: self.population_by_species().into(),
        }
    }

    /// Checks that every agent sits in exactly one grid bucket, that the
    /// bucket matches its cached cell and current species, and that the
    /// cached cell matches its position.
    pub fn verify_grid(&self) -> Result<(), SimulationError> {
        if self.grid.len() != self.agents.len() {
            return Err(SimulationError::GridInconsistency(format!(
                "grid holds {} memberships for {} agents",
                self.grid.len(),
                self.agents.len()
            )));
        }

        for agent in &self.agents {
            let expected = self.grid.cell_for(agent.position());
            if agent.cell() != expected {
                return Err(SimulationError::GridInconsistency(format!(
                    "agent {} caches cell {:?} but sits in {:?}",
                    agent.id(),
                    agent.cell(),
                    expected
                )));
            }
            let occupancy = self.grid.occupancy(agent.id());
            if occupancy != 1 {
                return Err(SimulationError::GridInconsistency(format!(
                    "agent {} is in {} buckets",
                    agent.id(),
                    occupancy
                )));
            }
            if !self.grid.bucket(agent.cell(), agent.species()).contains(&agent.id()) {
                return Err(SimulationError::GridInconsistency(format!(
                    "agent {} is missing from bucket {:?}/{}",
                    agent.id(),
                    agent.cell(),
                    agent.species()
                )));
            }
        }
        Ok(())
    }
}
