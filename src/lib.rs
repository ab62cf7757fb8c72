//! Gravity Puzzle - a second-order physics puzzle engine
//!
//! The player never pushes the ball. They bend the laws acting on it:
//! the gravity direction and the air density (damping).
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, geometry, controls, level session)
//! - `level`: Level definition schema and validation
//! - `score`: Time-based scoring
//! - `progress`: Persisted cross-session progress
//! - `tuning`: Data-driven simulation constants
//! - `game`: Top-level controller (input queue, fixed-step accumulator, snapshots)
//! - `logging`: env_logger setup for the runner

pub mod game;
pub mod level;
pub mod logging;
pub mod progress;
pub mod score;
pub mod sim;
pub mod tuning;

pub use game::{Game, GameError, Snapshot};
pub use level::{Difficulty, LevelDefinition, LevelError, LevelSet};
pub use logging::init as init_logging;
pub use progress::{ProgressError, ProgressRecord, ProgressStore};
pub use tuning::{DampingModel, Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum fixed steps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the accumulator will absorb (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Arena dimensions (screen coordinates, y grows downward)
    pub const ARENA_WIDTH: f32 = 800.0;
    pub const ARENA_HEIGHT: f32 = 600.0;
    /// Thickness of the solid strips framing the arena
    pub const BOUNDARY_THICKNESS: f32 = 10.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 15.0;
    pub const BALL_MASS: f32 = 10.0;

    /// Default gravity magnitude (pixels/s²)
    pub const DEFAULT_GRAVITY: f32 = 900.0;

    /// Damping (air density) bounds, inclusive
    pub const DAMPING_MIN: f32 = 0.1;
    pub const DAMPING_MAX: f32 = 1.0;
    /// Damping change per discrete input
    pub const DAMPING_STEP: f32 = 0.1;

    /// Restitution on wall contact (0.8 elasticity on both ball and wall)
    pub const WALL_RESTITUTION: f32 = 0.64;
    /// Coulomb friction on wall contact (0.5 friction on both ball and wall)
    pub const WALL_FRICTION: f32 = 0.25;

    /// Lives when a level record omits them
    pub const DEFAULT_LIVES: u32 = 3;
}

/// Clamp a damping coefficient into its legal range.
///
/// NaN collapses to the minimum; infinities saturate at the bounds.
#[inline]
pub fn clamp_damping(damping: f32) -> f32 {
    use consts::{DAMPING_MAX, DAMPING_MIN};
    if damping.is_nan() {
        return DAMPING_MIN;
    }
    damping.clamp(DAMPING_MIN, DAMPING_MAX)
}

/// Convert a tick count into simulated seconds
#[inline]
pub fn ticks_to_secs(ticks: u64, dt: f32) -> f64 {
    ticks as f64 * dt as f64
}
