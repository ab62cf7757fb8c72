//! Top-level game controller
//!
//! Owns the level catalog, the progress store and the active session, and
//! bridges the variable-rate presentation clock to the fixed simulation
//! step. Nothing here is global; tests build as many games as they like.

use std::collections::VecDeque;

use glam::Vec2;
use serde::Serialize;
use thiserror::Error;

use crate::level::{LevelError, LevelSet};
use crate::progress::ProgressStore;
use crate::sim::{ControlVariables, InputEvent, LevelSession, SessionEvent, SessionPhase};
use crate::tuning::Tuning;

/// Slack when comparing the accumulator to one step, so frame deltas that
/// are exact multiples of the step never lose a tick to rounding.
const ACCUMULATOR_EPSILON: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("No level with id {0}")]
    UnknownLevel(u32),

    #[error("Level {0} is locked")]
    Locked(u32),

    #[error("No level is being played")]
    NoSession,

    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Read-only view handed to the renderer each frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub level_id: u32,
    pub level_name: String,
    pub position: Vec2,
    /// Drives trail coloring together with `controls.damping`
    pub velocity: Vec2,
    pub controls: ControlVariables,
    pub phase: SessionPhase,
    pub elapsed_ticks: u64,
    pub elapsed_secs: f64,
    pub lives: u32,
    pub paused: bool,
}

/// Game instance holding all state
pub struct Game {
    tuning: Tuning,
    levels: LevelSet,
    progress: ProgressStore,
    session: Option<LevelSession>,
    pending: VecDeque<InputEvent>,
    accumulator: f64,
    paused: bool,
}

impl Game {
    pub fn new(levels: LevelSet, progress: ProgressStore, tuning: Tuning) -> Self {
        Self {
            tuning,
            levels,
            progress,
            session: None,
            pending: VecDeque::new(),
            accumulator: 0.0,
            paused: false,
        }
    }

    /// Start an attempt at an unlocked level
    pub fn enter_level(&mut self, level_id: u32) -> Result<(), GameError> {
        let level = self
            .levels
            .get(level_id)
            .ok_or(GameError::UnknownLevel(level_id))?;
        if !self.progress.record().is_unlocked(level_id) {
            return Err(GameError::Locked(level_id));
        }

        let session = LevelSession::new(level, &self.tuning)?;
        self.session = Some(session);
        self.pending.clear();
        self.accumulator = 0.0;
        self.paused = false;
        Ok(())
    }

    /// Move on from the current level. `None` once the last level is done.
    pub fn next_level(&mut self) -> Result<Option<u32>, GameError> {
        let current = self
            .session
            .as_ref()
            .ok_or(GameError::NoSession)?
            .level()
            .level_id;

        match self.levels.next_after(current).map(|l| l.level_id) {
            Some(next) => {
                self.enter_level(next)?;
                Ok(Some(next))
            }
            None => {
                log::info!("All {} levels played", self.levels.len());
                self.session = None;
                Ok(None)
            }
        }
    }

    /// Leave the level; the attempt is dropped
    pub fn quit_to_menu(&mut self) {
        if let Some(session) = self.session.take() {
            log::info!("Left level {}", session.level().level_id);
        }
        self.pending.clear();
        self.accumulator = 0.0;
        self.paused = false;
    }

    /// Queue a discrete input for the next update
    pub fn push_input(&mut self, input: InputEvent) {
        self.pending.push_back(input);
    }

    /// Absorb one presentation frame: drain inputs, then run as many fixed
    /// steps as the accumulated time allows (at most `max_substeps`).
    pub fn update(&mut self, frame_dt: f32) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.drain_inputs(&mut events);

        let Some(session) = self.session.as_mut() else {
            return events;
        };
        if self.paused || session.phase().is_ended() {
            // No catch-up burst after resuming
            self.accumulator = 0.0;
            return events;
        }

        let frame_dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, self.tuning.max_frame_dt)
        } else {
            0.0
        };
        self.accumulator += frame_dt as f64;

        let dt = self.tuning.sim_dt as f64;
        let mut substeps = 0;
        let mut produced = Vec::new();
        while self.accumulator + ACCUMULATOR_EPSILON >= dt && substeps < self.tuning.max_substeps {
            produced.extend(session.tick());
            self.accumulator -= dt;
            substeps += 1;

            if session.phase().is_ended() {
                self.accumulator = 0.0;
                break;
            }
        }

        self.record_events(&produced);
        events.extend(produced);
        events
    }

    fn drain_inputs(&mut self, events: &mut Vec<SessionEvent>) {
        while let Some(input) = self.pending.pop_front() {
            match input {
                InputEvent::PauseToggle => {
                    if self.session.is_some() {
                        self.paused = !self.paused;
                        log::debug!("{}", if self.paused { "Paused" } else { "Resumed" });
                    }
                }
                InputEvent::Restart => {
                    self.paused = false;
                    self.accumulator = 0.0;
                    if let Some(event) = self.session.as_mut().and_then(|s| s.apply_input(input)) {
                        events.push(event);
                    }
                }
                _ if self.paused => {}
                _ => {
                    if let Some(session) = self.session.as_mut() {
                        session.apply_input(input);
                    }
                }
            }
        }
    }

    /// Fold session events into persisted progress
    fn record_events(&mut self, events: &[SessionEvent]) {
        for event in events {
            match *event {
                SessionEvent::HazardHit { .. } => {
                    self.progress.record_death();
                }
                SessionEvent::GameOver { elapsed_secs, .. } => {
                    self.progress.record_play_time(elapsed_secs);
                }
                SessionEvent::Completed {
                    level_id,
                    score,
                    elapsed_secs,
                    ..
                } => {
                    self.progress.record_completion(level_id, score, elapsed_secs);
                }
                SessionEvent::Respawned | SessionEvent::Restarted { .. } => {}
            }
        }
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        let session = self.session.as_ref()?;
        let body = session.body();
        Some(Snapshot {
            level_id: session.level().level_id,
            level_name: session.level().name.clone(),
            position: body.pos,
            velocity: body.vel,
            controls: session.controls().snapshot(),
            phase: session.phase(),
            elapsed_ticks: session.elapsed_ticks(),
            elapsed_secs: session.elapsed_secs(),
            lives: session.lives(),
            paused: self.paused,
        })
    }

    pub fn session(&self) -> Option<&LevelSession> {
        self.session.as_ref()
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::level::LevelDefinition;
    use crate::level::tests::sample_level;
    use crate::sim::{GravityDirection, Outcome, Rect};

    fn game_with(levels: Vec<LevelDefinition>) -> Game {
        let tuning = Tuning::default();
        let levels = LevelSet::new(levels, &tuning).unwrap();
        Game::new(levels, ProgressStore::in_memory(), tuning)
    }

    fn quick_win(level_id: u32) -> LevelDefinition {
        LevelDefinition {
            goal_rect: Rect::new(80.0, 80.0, 40.0, 40.0),
            hazards: vec![],
            ..sample_level(level_id)
        }
    }

    #[test]
    fn test_locked_and_unknown_levels() {
        let mut game = game_with(vec![sample_level(1), sample_level(2)]);
        assert!(matches!(game.enter_level(2), Err(GameError::Locked(2))));
        assert!(matches!(game.enter_level(9), Err(GameError::UnknownLevel(9))));
        assert!(matches!(game.next_level(), Err(GameError::NoSession)));
        assert!(game.enter_level(1).is_ok());
    }

    #[test]
    fn test_win_updates_progress_and_advances() {
        let mut game = game_with(vec![quick_win(1), quick_win(2)]);
        game.enter_level(1).unwrap();

        let events = game.update(SIM_DT);
        assert!(matches!(events.as_slice(), [SessionEvent::Completed { score: 9_990, .. }]));
        let record = game.progress().record();
        assert_eq!(record.best_score(1), Some(9_990));
        assert_eq!(record.unlocked_levels, 2);

        // Ended sessions do not tick
        assert!(game.update(SIM_DT).is_empty());

        assert_eq!(game.next_level().unwrap(), Some(2));
        game.update(SIM_DT);
        assert_eq!(game.next_level().unwrap(), None);
        assert!(game.session().is_none());
        assert_eq!(game.progress().record().unlocked_levels, 3);
    }

    #[test]
    fn test_game_over_records_deaths_and_time() {
        let level = LevelDefinition {
            lives: 1,
            gravity_start: Vec2::new(900.0, 0.0),
            hazards: vec![Rect::new(115.1, 50.0, 20.0, 100.0)],
            walls: vec![],
            ..sample_level(1)
        };
        let mut game = game_with(vec![level]);
        game.enter_level(1).unwrap();

        game.update(SIM_DT);
        let snapshot = game.snapshot().unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Ended(Outcome::LostAllLives));

        let record = game.progress().record();
        assert_eq!(record.total_deaths, 1);
        assert!(record.level_scores.is_empty());
        assert!((record.total_time - SIM_DT as f64).abs() < 1e-9);
    }

    #[test]
    fn test_every_life_lost_counts_as_a_death() {
        let level = LevelDefinition {
            lives: 3,
            gravity_start: Vec2::new(900.0, 0.0),
            hazards: vec![Rect::new(115.1, 50.0, 20.0, 100.0)],
            walls: vec![],
            ..sample_level(1)
        };
        let mut game = game_with(vec![level]);
        game.enter_level(1).unwrap();

        // Respawn puts the ball back one tick from the hazard
        for expected_deaths in 1..=3 {
            game.update(SIM_DT);
            assert_eq!(game.progress().record().total_deaths, expected_deaths);
        }
        let snapshot = game.snapshot().unwrap();
        assert_eq!(snapshot.phase, SessionPhase::Ended(Outcome::LostAllLives));
        assert_eq!(snapshot.elapsed_ticks, 3);
    }

    #[test]
    fn test_frame_rate_does_not_change_outcome() {
        let run = |frame_dt: f32, frames: usize| {
            let mut game = game_with(vec![sample_level(1)]);
            game.enter_level(1).unwrap();
            game.push_input(InputEvent::Gravity(GravityDirection::Right));
            for _ in 0..frames {
                game.update(frame_dt);
            }
            game.snapshot().unwrap()
        };

        let steady = run(SIM_DT, 60);
        let slow = run(SIM_DT * 3.0, 20);
        let fast = run(SIM_DT / 4.0, 240);

        assert_eq!(steady.elapsed_ticks, 60);
        assert_eq!(slow.elapsed_ticks, 60);
        assert_eq!(fast.elapsed_ticks, 60);
        assert_eq!(steady.position, slow.position);
        assert_eq!(steady.position, fast.position);
        assert_eq!(steady.velocity, fast.velocity);
    }

    #[test]
    fn test_substeps_are_capped() {
        let mut game = game_with(vec![sample_level(1)]);
        game.enter_level(1).unwrap();
        // A 5 second hitch is clamped to max_frame_dt
        game.update(5.0);
        assert_eq!(game.snapshot().unwrap().elapsed_ticks, 6);
    }

    #[test]
    fn test_pause_withholds_ticks() {
        let mut game = game_with(vec![sample_level(1)]);
        game.enter_level(1).unwrap();

        game.push_input(InputEvent::PauseToggle);
        game.update(0.1);
        assert!(game.is_paused());
        assert_eq!(game.snapshot().unwrap().elapsed_ticks, 0);

        // Controls are ignored while paused
        game.push_input(InputEvent::DampingUp);
        game.update(0.1);
        assert_eq!(game.snapshot().unwrap().controls.damping, 0.5);

        game.push_input(InputEvent::PauseToggle);
        game.update(SIM_DT);
        assert!(!game.is_paused());
        assert_eq!(game.snapshot().unwrap().elapsed_ticks, 1);
    }

    #[test]
    fn test_restart_leaves_progress_alone() {
        let mut game = game_with(vec![sample_level(1)]);
        game.enter_level(1).unwrap();
        for _ in 0..10 {
            game.update(SIM_DT);
        }

        game.push_input(InputEvent::Restart);
        let events = game.update(0.0);
        assert_eq!(events, vec![SessionEvent::Restarted { level_id: 1 }]);
        assert_eq!(game.snapshot().unwrap().elapsed_ticks, 0);
        assert_eq!(game.progress().record(), &crate::ProgressRecord::default());
    }

    #[test]
    fn test_quit_to_menu_drops_session() {
        let mut game = game_with(vec![sample_level(1)]);
        game.enter_level(1).unwrap();
        game.quit_to_menu();
        assert!(game.snapshot().is_none());
        assert!(game.update(SIM_DT).is_empty());
    }
}
