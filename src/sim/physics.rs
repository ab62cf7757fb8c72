//! Single-body integrator
//!
//! Semi-implicit Euler under the current control snapshot:
//! `v += g·dt; v *= damping_factor; p += v·dt`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::control::ControlVariables;
use crate::tuning::{DampingModel, Tuning};

/// The ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub mass: f32,
}

impl Body {
    pub fn new(pos: Vec2, radius: f32, mass: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            mass,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// Owns the body and advances it at a fixed step
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    body: Body,
    damping_model: DampingModel,
    damping_strength: f32,
}

impl PhysicsWorld {
    /// Create a world with a resting ball at `start`
    pub fn new(start: Vec2, tuning: &Tuning) -> Self {
        Self {
            body: Body::new(start, tuning.ball_radius, tuning.ball_mass),
            damping_model: tuning.damping_model,
            damping_strength: tuning.damping_strength,
        }
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Recreate the ball at `start` with zero velocity
    pub fn reset(&mut self, start: Vec2) {
        self.body = Body::new(start, self.body.radius, self.body.mass);
    }

    /// Per-step velocity multiplier for a damping coefficient
    #[inline]
    pub fn damping_factor(&self, dt: f32, damping: f32) -> f32 {
        self.damping_model
            .factor(damping, dt, self.damping_strength)
    }

    /// Velocity half of the step: gravity, then damping
    pub fn accelerate(&mut self, dt: f32, controls: &ControlVariables) {
        let force = controls.gravity * self.body.mass;
        let accel = force / self.body.mass;
        self.body.vel += accel * dt;
        self.body.vel *= self.damping_factor(dt, controls.damping);
    }

    /// Position half of the step
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        self.body.pos += self.body.vel * dt;
    }

    /// Full fixed step; returns the new position and velocity
    pub fn step(&mut self, dt: f32, controls: &ControlVariables) -> (Vec2, Vec2) {
        self.accelerate(dt, controls);
        self.advance(dt);
        (self.body.pos, self.body.vel)
    }

    /// Sub-moves needed so no single move exceeds half the ball radius
    pub fn sweep_steps(&self, dt: f32, max_steps: u32) -> u32 {
        let travel = self.body.vel.length() * dt;
        let max_move = (self.body.radius * 0.5).max(f32::EPSILON);
        let steps = (travel / max_move).ceil();
        if steps.is_finite() {
            (steps as u32).clamp(1, max_steps.max(1))
        } else {
            max_steps.max(1)
        }
    }
}
