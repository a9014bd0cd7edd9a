//! Verlet integration
//!
//! Velocity is implicit: the delta between the current and previous position.
//! Forces are accumulated into `acceleration` during a tick and consumed by the
//! next [`VerletBody::integrate`] call.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::circle::Circle;
use crate::consts::{DEFAULT_FRICTION, DEFAULT_TRACTION};

/// Per-level physics parameters, taken from the level theme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Velocity multiplier applied every tick
    pub friction: f32,
    /// Scales how much accumulated acceleration reaches velocity
    pub traction: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            friction: DEFAULT_FRICTION,
            traction: DEFAULT_TRACTION,
        }
    }
}

/// Physics state attached to a moving object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerletBody {
    pub previous_pos: Vec2,
    /// Velocity computed by the last integration step
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Boundaries this body was near the last time it was near any
    pub previous_nearby_boundaries: Vec<usize>,
}

impl VerletBody {
    /// A body at rest at `pos`
    pub fn at(pos: Vec2) -> Self {
        Self {
            previous_pos: pos,
            ..Default::default()
        }
    }

    #[inline]
    pub fn accelerate(&mut self, by: Vec2) {
        self.acceleration += by;
    }

    /// Advance one tick. Step order matters for replay.
    pub fn integrate(&mut self, circle: &mut Circle, physics: &PhysicsConfig) {
        self.velocity = circle.pos() - self.previous_pos;
        self.velocity += self.acceleration * physics.traction;
        self.velocity *= physics.friction;
        self.acceleration = Vec2::ZERO;
        self.previous_pos = circle.pos();
        circle.translate(self.velocity);
    }

    /// Teleport without introducing velocity
    pub fn place(&mut self, circle: &mut Circle, pos: Vec2) {
        circle.set_pos(pos);
        self.previous_pos = pos;
        self.velocity = Vec2::ZERO;
    }

    /// Drop boundary memory from a previous level
    pub fn forget_boundaries(&mut self) {
        self.previous_nearby_boundaries.clear();
    }
}
