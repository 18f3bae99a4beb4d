//! 2D vector math used by every force computation.
//!
//! `Vector2` is glam's `Vec2`; arithmetic, `length`, `dot` and
//! `normalize_or_zero` come straight from glam. [`Vector2Ext`] adds the
//! handful of operations the steering code wants in a specific shape.

pub use glam::Vec2 as Vector2;

/// Extra vector operations on top of glam.
pub trait Vector2Ext: Sized {
    /// Clamps the magnitude to `max`. A vector at or under the cap is returned unchanged.
    fn limit(self, max: f32) -> Self;

    /// In-place form of [`Vector2Ext::limit`].
    fn limit_in_place(&mut self, max: f32);

    /// Divides by the magnitude. A zero vector stays zero.
    fn normalize_in_place(&mut self);

    /// Unit-length copy, or zero for a zero vector.
    fn normalized(self) -> Self;

    /// Angle from the +x axis in radians (`atan2(y, x)`).
    fn rotation(self) -> f32;

    /// Angle from the +x axis in degrees.
    fn rotation_degrees(self) -> f32;
}

impl Vector2Ext for Vector2 {
    #[inline]
    fn limit(self, max: f32) -> Self {
        if self.length_squared() > max * max {
            self.normalized() * max
        } else {
            self
        }
    }

    #[inline]
    fn limit_in_place(&mut self, max: f32) {
        *self = self.limit(max);
    }

    #[inline]
    fn normalize_in_place(&mut self) {
        *self = self.normalized();
    }

    #[inline]
    fn normalized(self) -> Self {
        let magnitude = self.length();
        if magnitude > 0.0 {
            self / magnitude
        } else {
            Vector2::ZERO
        }
    }

    #[inline]
    fn rotation(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[inline]
    fn rotation_degrees(self) -> f32 {
        self.rotation().to_degrees()
    }
}
