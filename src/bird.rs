/*
 * Bird Module
 *
 * This module defines the Bird struct: one self-propelled particle.
 * A bird carries only its position and heading. Its velocity is never
 * stored; it is always rebuilt from the heading and the flock speed.
 */

use glam::DVec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bird {
    pub position: DVec2,
    pub heading: f64, // radians, no canonical range
}

impl Bird {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            position: DVec2::new(x, y),
            heading,
        }
    }

    // Velocity of a bird flying at `speed` along its heading
    #[inline]
    pub fn velocity(&self, speed: f64) -> DVec2 {
        DVec2::new(speed * self.heading.cos(), speed * self.heading.sin())
    }

    // Free motion over one timestep
    #[inline]
    pub fn advance(&mut self, speed: f64, dt: f64) {
        self.position += self.velocity(speed) * dt;
    }

    // Wrap the bird back into the periodic domain [0, size)
    #[inline]
    pub fn wrap_edges(&mut self, size: f64) {
        self.position.x = wrap(self.position.x, size);
        self.position.y = wrap(self.position.y, size);
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.heading.is_finite()
    }
}

/// Floor-mod into [0, size).
///
/// `rem_euclid` can round a tiny negative input up to exactly `size`; that
/// case folds to 0 so the half-open range always holds.
#[inline]
pub fn wrap(value: f64, size: f64) -> f64 {
    let r = value.rem_euclid(size);
    if r >= size {
        r - size
    } else {
        r
    }
}
