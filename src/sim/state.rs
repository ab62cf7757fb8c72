//! Level session state
//!
//! Everything that belongs to one attempt at a level. Destroyed when the
//! level is left; nothing here is persisted.

use serde::{Deserialize, Serialize};

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    LostAllLives,
}

/// Current phase of the attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Geometry, body and controls being built from the level record
    Loading,
    /// Active simulation
    Playing,
    /// A life was just lost; waiting out the respawn delay
    HazardHit,
    /// Goal touched; score being computed
    GoalReached,
    /// Terminal for this attempt
    Ended(Outcome),
}

impl SessionPhase {
    pub fn is_ended(&self) -> bool {
        matches!(self, SessionPhase::Ended(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::Playing => "playing",
            SessionPhase::HazardHit => "hazard_hit",
            SessionPhase::GoalReached => "goal_reached",
            SessionPhase::Ended(Outcome::Won) => "won",
            SessionPhase::Ended(Outcome::LostAllLives) => "game_over",
        }
    }
}

/// Something the surrounding game should react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Ball touched a hazard; `lives_left` after the decrement
    HazardHit { lives_left: u32 },
    /// Ball is back at the start position
    Respawned,
    /// Goal reached; the attempt is over
    Completed {
        level_id: u32,
        score: u64,
        elapsed_ticks: u64,
        elapsed_secs: f64,
    },
    /// Last life lost; the attempt is over
    GameOver {
        level_id: u32,
        elapsed_ticks: u64,
        elapsed_secs: f64,
    },
    /// Attempt thrown away and the level reloaded
    Restarted { level_id: u32 },
}

/// Mutable per-attempt record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSessionState {
    pub lives: u32,
    /// Simulated ticks spent playing (keeps running across respawns)
    pub elapsed_ticks: u64,
    pub phase: SessionPhase,
    /// Set once the goal is touched
    pub goal_touched: bool,
    /// Ticks left before respawn while in `HazardHit`
    pub respawn_ticks: u32,
}

impl LevelSessionState {
    pub fn new(lives: u32) -> Self {
        Self {
            lives,
            elapsed_ticks: 0,
            phase: SessionPhase::Loading,
            goal_touched: false,
            respawn_ticks: 0,
        }
    }
}
