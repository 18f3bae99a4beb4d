//! Initial placement and velocity of agents.
//!
//! Agents start in one of four boxes around the arena center, one per
//! quadrant, kept clear of the central obstacle by `inner` and of the arena
//! edges by the padding baked into `outer_x` / `outer_y`. Every obstacle,
//! wherever it sits, also gets a circular keep-out zone; samples landing in
//! one are drawn again.

use feather_core::Vector2;
use rand::Rng;

use crate::error::SimulationError;
use crate::obstacle::{Obstacle, ObstacleRegistry};
use crate::species::Species;
use crate::tuning::Arena;

/// Quadrant signs applied to the sampled offsets.
pub const QUADRANTS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)];

/// Each velocity component is drawn from `-SPAWN_SPEED_RANGE..=SPAWN_SPEED_RANGE`.
pub const SPAWN_SPEED_RANGE: i32 = 10;

/// Draws per agent before giving up on finding a position outside every keep-out zone.
pub const MAX_SPAWN_ATTEMPTS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRegion {
    center: Vector2,
    inner: i32,
    outer_x: i32,
    outer_y: i32,
    // (obstacle center, clearance)
    keep_out: Vec<(Vector2, f32)>,
}

impl SpawnRegion {
    /// Offsets from `center` are whole numbers in `inner..=outer` on each axis.
    pub fn new(
        center: Vector2,
        inner: f32,
        outer_x: f32,
        outer_y: f32,
    ) -> Result<Self, SimulationError> {
        let inner_cells = inner.ceil() as i32;
        let outer_x_cells = outer_x.floor() as i32;
        let outer_y_cells = outer_y.floor() as i32;

        if inner < 0.0 || inner_cells > outer_x_cells || inner_cells > outer_y_cells {
            return Err(SimulationError::EmptySpawnRegion(format!(
                "inner offset {inner} does not fit under outer offsets ({outer_x}, {outer_y})"
            )));
        }

        Ok(Self {
            center,
            inner: inner_cells,
            outer_x: outer_x_cells,
            outer_y: outer_y_cells,
            keep_out: Vec::new(),
        })
    }

    /// Boxes around the arena center that keep `padding` clear of every
    /// obstacle and of the arena edges. Offsets never reach the far edge,
    /// so every sample lies inside the arena even with zero padding.
    pub fn around_obstacles(
        arena: &Arena,
        obstacles: &ObstacleRegistry,
        padding: f32,
    ) -> Result<Self, SimulationError> {
        let center = arena.center();
        let region = Self::new(
            center,
            obstacles.largest_radius() + padding,
            (arena.width / 2.0 - padding).min(max_offset(center.x, arena.width)),
            (arena.height / 2.0 - padding).min(max_offset(center.y, arena.height)),
        )?;
        Ok(obstacles
            .iter()
            .fold(region, |region, obstacle| region.avoiding(obstacle, padding)))
    }

    /// Adds a keep-out zone of `obstacle.radius() + padding` around `obstacle`.
    pub fn avoiding(mut self, obstacle: &Obstacle, padding: f32) -> Self {
        self.keep_out.push((obstacle.position(), obstacle.radius() + padding));
        self
    }

    /// Draws a position from a random quadrant box, retrying while it falls
    /// inside a keep-out zone.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vector2, SimulationError> {
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            let candidate = self.draw(rng);
            if self.is_clear(candidate) {
                return Ok(candidate);
            }
        }
        Err(SimulationError::EmptySpawnRegion(format!(
            "no position clear of obstacles after {MAX_SPAWN_ATTEMPTS} draws"
        )))
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector2 {
        let (sx, sy) = QUADRANTS[rng.gen_range(0..QUADRANTS.len())];
        let dx = rng.gen_range(self.inner..=self.outer_x) as f32;
        let dy = rng.gen_range(self.inner..=self.outer_y) as f32;
        self.center + Vector2::new(dx * sx, dy * sy)
    }

    #[inline]
    fn is_clear(&self, position: Vector2) -> bool {
        self.keep_out
            .iter()
            .all(|&(center, clearance)| position.distance(center) >= clearance)
    }
}

/// Largest whole offset that keeps `center +/- offset` inside `0..extent`.
fn max_offset(center: f32, extent: f32) -> f32 {
    ((extent - center).ceil() - 1.0).min(center.floor())
}

/// Random starting velocity; heavier species start faster.
pub fn initial_velocity<R: Rng + ?Sized>(species: Species, rng: &mut R) -> Vector2 {
    let vx = rng.gen_range(-SPAWN_SPEED_RANGE..=SPAWN_SPEED_RANGE) as f32;
    let vy = rng.gen_range(-SPAWN_SPEED_RANGE..=SPAWN_SPEED_RANGE) as f32;
    let scale = ((2 + species.index()) * 2) as f32;
    Vector2::new(vx, vy) * scale
}
