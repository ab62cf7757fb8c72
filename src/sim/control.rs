//! Player-driven environment parameters
//!
//! Gravity can only point along one of the four screen axes at the level's
//! magnitude, and damping stays within [0.1, 1.0]. Inputs mutate the state
//! between ticks; each tick reads one snapshot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::clamp_damping;
use crate::consts::DAMPING_STEP;

/// Cardinal gravity direction (screen coordinates, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GravityDirection {
    Up,
    Down,
    Left,
    Right,
}

impl GravityDirection {
    pub const ALL: [GravityDirection; 4] = [
        GravityDirection::Up,
        GravityDirection::Down,
        GravityDirection::Left,
        GravityDirection::Right,
    ];

    /// Unit vector for this direction
    pub fn unit(self) -> Vec2 {
        match self {
            GravityDirection::Up => Vec2::NEG_Y,
            GravityDirection::Down => Vec2::Y,
            GravityDirection::Left => Vec2::NEG_X,
            GravityDirection::Right => Vec2::X,
        }
    }

    /// Recover a direction from a vector lying exactly on one axis.
    ///
    /// Diagonal, zero or non-finite vectors yield `None`.
    pub fn from_vector(v: Vec2) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }
        match (v.x == 0.0, v.y == 0.0) {
            (true, false) if v.y < 0.0 => Some(GravityDirection::Up),
            (true, false) => Some(GravityDirection::Down),
            (false, true) if v.x < 0.0 => Some(GravityDirection::Left),
            (false, true) => Some(GravityDirection::Right),
            _ => None,
        }
    }
}

/// The snapshot a physics step consumes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlVariables {
    /// Cardinal unit vector scaled by the level magnitude
    pub gravity: Vec2,
    pub direction: GravityDirection,
    /// Air density, always within [0.1, 1.0]
    pub damping: f32,
}

/// Gravity and damping with their mutation rules
#[derive(Debug, Clone)]
pub struct ControlState {
    direction: GravityDirection,
    magnitude: f32,
    damping: f32,
    damping_step: f32,
    initial_direction: GravityDirection,
    initial_damping: f32,
}

impl ControlState {
    /// Start from a level's initial gravity and damping.
    ///
    /// `damping` is clamped; a bad value from upstream is never trusted.
    pub fn new(direction: GravityDirection, magnitude: f32, damping: f32) -> Self {
        let damping = clamp_damping(damping);
        Self {
            direction,
            magnitude: magnitude.abs(),
            damping,
            damping_step: DAMPING_STEP,
            initial_direction: direction,
            initial_damping: damping,
        }
    }

    /// Override the per-input damping step
    pub fn with_damping_step(mut self, step: f32) -> Self {
        self.damping_step = step.abs();
        self
    }

    /// Point gravity along `direction`; last write before a tick wins
    pub fn apply_direction(&mut self, direction: GravityDirection) {
        self.direction = direction;
    }

    /// Add `delta` to damping, clamped to [0.1, 1.0]
    pub fn adjust_damping(&mut self, delta: f32) {
        self.damping = clamp_damping(self.damping + delta);
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = clamp_damping(damping);
    }

    /// One DampingUp input
    pub fn thicken(&mut self) {
        self.adjust_damping(self.damping_step);
    }

    /// One DampingDown input
    pub fn thin(&mut self) {
        self.adjust_damping(-self.damping_step);
    }

    /// Back to the level defaults (respawn/restart)
    pub fn reset(&mut self) {
        self.direction = self.initial_direction;
        self.damping = self.initial_damping;
    }

    pub fn direction(&self) -> GravityDirection {
        self.direction
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    pub fn gravity(&self) -> Vec2 {
        self.direction.unit() * self.magnitude
    }

    pub fn snapshot(&self) -> ControlVariables {
        ControlVariables {
            gravity: self.gravity(),
            direction: self.direction,
            damping: self.damping,
        }
    }
}
