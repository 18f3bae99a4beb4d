use feather_core::Vector2;

use crate::error::SimulationError;

/// A static circular obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    position: Vector2,
    radius: f32,
}

impl Obstacle {
    pub fn new(position: Vector2, radius: f32) -> Result<Self, SimulationError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(SimulationError::InvalidObstacle(format!(
                "radius must be positive, got {radius}"
            )));
        }
        if !position.is_finite() {
            return Err(SimulationError::InvalidObstacle(format!(
                "position must be finite, got {position:?}"
            )));
        }
        Ok(Self { position, radius })
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

/// Flat list of obstacles. Counts stay in the single digits, so there is no spatial index.
#[derive(Debug, Clone, Default)]
pub struct ObstacleRegistry {
    obstacles: Vec<Obstacle>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Radius of the biggest obstacle, or zero when there are none.
    pub fn largest_radius(&self) -> f32 {
        self.obstacles
            .iter()
            .map(Obstacle::radius)
            .fold(0.0, f32::max)
    }
}
