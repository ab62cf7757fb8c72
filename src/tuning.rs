//! Data-driven simulation constants
//!
//! Everything the integrator and session need that is not part of a level
//! record. Loaded from an optional JSON file; absent fields keep defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// How the damping coefficient maps onto per-step velocity attenuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DampingModel {
    /// Coefficient is air density: attenuation grows with the coefficient
    /// (0.1 = thin air / fast, 1.0 = thick air / slow).
    #[default]
    AirDensity,
    /// Coefficient is the fraction of velocity kept per second
    /// (1.0 = no attenuation).
    Retention,
}

impl DampingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DampingModel::AirDensity => "air_density",
            DampingModel::Retention => "retention",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "air_density" | "air-density" | "density" => Some(DampingModel::AirDensity),
            "retention" | "retain" => Some(DampingModel::Retention),
            _ => None,
        }
    }

    /// Velocity multiplier for one step of length `dt`
    pub fn factor(&self, damping: f32, dt: f32, strength: f32) -> f32 {
        match self {
            DampingModel::AirDensity => (-strength * damping * dt).exp(),
            DampingModel::Retention => damping.powf(dt),
        }
    }
}

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed tuning file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid tuning value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Clock ===
    /// Fixed physics step (seconds)
    pub sim_dt: f32,
    /// Cap on fixed steps per presentation frame
    pub max_substeps: u32,
    /// Longest frame delta the accumulator absorbs (seconds)
    pub max_frame_dt: f32,

    // === Ball ===
    pub ball_radius: f32,
    pub ball_mass: f32,

    // === Controls ===
    /// Damping change per DampingUp/DampingDown input
    pub damping_step: f32,
    pub damping_model: DampingModel,
    /// Rate constant for `DampingModel::AirDensity`
    pub damping_strength: f32,

    // === Contacts ===
    /// Fraction of normal speed kept when bouncing off a wall
    pub wall_restitution: f32,
    /// Tangential speed lost per unit of normal impulse at a wall
    pub wall_friction: f32,
    /// Upper bound on swept sub-moves per step
    pub max_sweep_steps: u32,

    // === Arena ===
    pub arena_width: f32,
    pub arena_height: f32,
    /// Solid frame around the arena; 0 disables it
    pub boundary_thickness: f32,

    // === Session ===
    /// Ticks spent in HazardHit before the ball respawns
    pub respawn_delay_ticks: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            sim_dt: SIM_DT,
            max_substeps: MAX_SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT,

            ball_radius: BALL_RADIUS,
            ball_mass: BALL_MASS,

            damping_step: DAMPING_STEP,
            damping_model: DampingModel::AirDensity,
            // c = 1.0 keeps 10% of velocity per second
            damping_strength: std::f32::consts::LN_10,

            wall_restitution: WALL_RESTITUTION,
            wall_friction: WALL_FRICTION,
            max_sweep_steps: 16,

            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            boundary_thickness: BOUNDARY_THICKNESS,

            respawn_delay_ticks: 0,
        }
    }
}

impl Tuning {
    /// Parse tuning JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        fn positive(field: &'static str, v: f32) -> Result<(), TuningError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: format!("must be a positive number, got {v}"),
                })
            }
        }

        positive("sim_dt", self.sim_dt)?;
        positive("max_frame_dt", self.max_frame_dt)?;
        positive("ball_radius", self.ball_radius)?;
        positive("ball_mass", self.ball_mass)?;
        positive("damping_step", self.damping_step)?;
        positive("damping_strength", self.damping_strength)?;
        positive("arena_width", self.arena_width)?;
        positive("arena_height", self.arena_height)?;

        if self.max_substeps == 0 {
            return Err(TuningError::Invalid {
                field: "max_substeps",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_sweep_steps == 0 {
            return Err(TuningError::Invalid {
                field: "max_sweep_steps",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.wall_restitution) {
            return Err(TuningError::Invalid {
                field: "wall_restitution",
                reason: format!("must be within [0, 1], got {}", self.wall_restitution),
            });
        }
        if !self.wall_friction.is_finite() || self.wall_friction < 0.0 {
            return Err(TuningError::Invalid {
                field: "wall_friction",
                reason: format!("must be non-negative, got {}", self.wall_friction),
            });
        }
        if !self.boundary_thickness.is_finite() || self.boundary_thickness < 0.0 {
            return Err(TuningError::Invalid {
                field: "boundary_thickness",
                reason: format!("must be non-negative, got {}", self.boundary_thickness),
            });
        }
        Ok(())
    }
}
