//! Tunable constants: per-species force/speed tuning, the conversion rule and the arena torus.

use feather_core::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::species::Species;

/// Force and perception limits for one species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesTuning {
    /// Cap on the flee, chase and flocking forces.
    pub max_force: f32,
    /// Cap on velocity magnitude.
    pub speed_cap: f32,
    /// Neighbors and obstacles farther than this are ignored.
    pub sensing_range: f32,
    /// Ideal spacing; closer neighbors get an inverse-proportional boost.
    pub min_distance: f32,
}

impl Default for SpeciesTuning {
    fn default() -> Self {
        Self {
            max_force: 60.0,
            speed_cap: 100.0,
            sensing_range: 256.0,
            min_distance: 48.0,
        }
    }
}

impl SpeciesTuning {
    pub fn validate(&self, species: Species) -> Result<(), SimulationError> {
        let fields = [
            ("max_force", self.max_force),
            ("speed_cap", self.speed_cap),
            ("sensing_range", self.sensing_range),
            ("min_distance", self.min_distance),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimulationError::InvalidTuning {
                    species,
                    reason: format!("{name} must be positive, got {value}"),
                });
            }
        }
        Ok(())
    }
}

/// When a chaser collides head-on with prey, the prey joins the chaser's species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRule {
    pub enabled: bool,
    /// Prey must be strictly closer than this.
    pub distance: f32,
    /// The unit vector from prey to chaser, dotted with the chaser's unit heading,
    /// must be strictly below this (a nearly head-on approach).
    pub heading_dot: f32,
}

impl Default for ConversionRule {
    fn default() -> Self {
        Self {
            enabled: true,
            distance: 16.0,
            heading_dot: -0.6,
        }
    }
}

impl ConversionRule {
    #[inline]
    pub fn converts(&self, distance: f32, away_dot_heading: f32) -> bool {
        self.enabled && distance < self.distance && away_dot_heading < self.heading_dot
    }
}

/// The toroidal plane agents live on. Positions are kept in `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 900.0,
            height: 900.0,
        }
    }
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Result<Self, SimulationError> {
        let arena = Self { width, height };
        arena.validate()?;
        Ok(arena)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if valid(self.width) && valid(self.height) {
            Ok(())
        } else {
            Err(SimulationError::InvalidArena {
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn contains(&self, position: Vector2) -> bool {
        (0.0..self.width).contains(&position.x) && (0.0..self.height).contains(&position.y)
    }

    /// Wraps a position that left the arena by less than one arena extent.
    pub fn wrap(&self, position: Vector2) -> Vector2 {
        Vector2::new(
            wrap_axis(position.x, self.width),
            wrap_axis(position.y, self.height),
        )
    }
}

#[inline]
fn wrap_axis(value: f32, extent: f32) -> f32 {
    let wrapped = if value < 0.0 {
        value + extent
    } else if value >= extent {
        value - extent
    } else {
        value
    };
    // A tiny negative value plus the extent can round back up to the extent
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_is_a_single_torus_step() {
        let arena = Arena::new(900.0, 600.0).unwrap();
        assert_eq!(arena.wrap(Vector2::new(-10.0, 610.0)), Vector2::new(890.0, 10.0));
        assert_eq!(arena.wrap(Vector2::new(900.0, 0.0)), Vector2::new(0.0, 0.0));
        assert_eq!(arena.wrap(Vector2::new(450.0, 300.0)), Vector2::new(450.0, 300.0));
    }

    #[test]
    fn wrap_never_lands_on_the_far_edge() {
        let arena = Arena::new(900.0, 900.0).unwrap();
        let wrapped = arena.wrap(Vector2::new(-1e-6, -1e-6));
        assert!(arena.contains(wrapped), "{wrapped:?}");
    }

    #[test]
    fn arena_rejects_degenerate_dimensions() {
        assert!(Arena::new(0.0, 10.0).is_err());
        assert!(Arena::new(10.0, f32::NAN).is_err());
    }

    #[test]
    fn tuning_validation() {
        assert!(SpeciesTuning::default().validate(Species::Red).is_ok());
        let bad = SpeciesTuning {
            speed_cap: 0.0,
            ..SpeciesTuning::default()
        };
        let err = bad.validate(Species::Blue).unwrap_err();
        assert!(err.to_string().contains("speed_cap"));
    }

    #[test]
    fn conversion_requires_close_head_on_approach() {
        let rule = ConversionRule::default();
        assert!(rule.converts(10.0, -1.0));
        assert!(!rule.converts(16.0, -1.0));
        assert!(!rule.converts(10.0, -0.6));
        assert!(!rule.converts(10.0, 0.5));
        let disabled = ConversionRule {
            enabled: false,
            ..rule
        };
        assert!(!disabled.converts(1.0, -1.0));
    }
}
