//! Fixed timestep level session
//!
//! One attempt at one level. Each tick consumes a single control snapshot,
//! sweeps the ball through the static geometry and reacts to what it touched.

use serde::{Deserialize, Serialize};

use super::control::{ControlState, GravityDirection};
use super::geometry::{Collider, Contact, GeometryIndex, Rect, RectKind};
use super::physics::{Body, PhysicsWorld};
use super::state::{LevelSessionState, Outcome, SessionEvent, SessionPhase};
use crate::level::{LevelDefinition, LevelError};
use crate::score;
use crate::ticks_to_secs;
use crate::tuning::Tuning;

/// Discrete player input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEvent {
    /// Point gravity along an axis
    Gravity(GravityDirection),
    /// Thicker air
    DampingUp,
    /// Thinner air
    DampingDown,
    /// Throw the attempt away and reload the level
    Restart,
    /// Freeze/unfreeze the clock (handled by the caller, never by the session)
    PauseToggle,
}

/// One play-through of a level
#[derive(Debug, Clone)]
pub struct LevelSession {
    level: LevelDefinition,
    tuning: Tuning,
    geometry: GeometryIndex,
    physics: PhysicsWorld,
    controls: ControlState,
    state: LevelSessionState,
    score: Option<u64>,
}

impl LevelSession {
    /// Validate the level and enter it (Loading -> Playing)
    pub fn new(level: &LevelDefinition, tuning: &Tuning) -> Result<Self, LevelError> {
        level.validate(tuning)?;

        let mut colliders = Vec::with_capacity(level.walls.len() + level.hazards.len() + 5);
        if tuning.boundary_thickness > 0.0 {
            colliders.extend(
                GeometryIndex::boundary_walls(
                    tuning.arena_width,
                    tuning.arena_height,
                    tuning.boundary_thickness,
                )
                .map(|rect| Collider { rect, kind: RectKind::Wall }),
            );
        }
        let tagged = |kind| move |rect: &Rect| Collider { rect: *rect, kind };
        colliders.extend(level.walls.iter().map(tagged(RectKind::Wall)));
        colliders.extend(level.hazards.iter().map(tagged(RectKind::Hazard)));
        colliders.push(Collider { rect: level.goal_rect, kind: RectKind::Goal });

        let controls = ControlState::new(
            level.gravity_direction(),
            level.gravity_magnitude(),
            level.damping_start,
        )
        .with_damping_step(tuning.damping_step);

        let mut session = Self {
            level: level.clone(),
            tuning: tuning.clone(),
            geometry: GeometryIndex::from_colliders(colliders),
            physics: PhysicsWorld::new(level.start_pos, tuning),
            controls,
            state: LevelSessionState::new(level.lives),
            score: None,
        };
        session.finish_loading();

        log::info!(
            "Loaded level {} - {} ({})",
            level.level_id,
            level.name,
            level.difficulty
        );
        Ok(session)
    }

    fn finish_loading(&mut self) {
        debug_assert_eq!(self.state.phase, SessionPhase::Loading);
        self.transition(SessionPhase::Playing);
    }

    fn transition(&mut self, phase: SessionPhase) {
        log::debug!(
            "Level {}: {} -> {}",
            self.level.level_id,
            self.state.phase.as_str(),
            phase.as_str()
        );
        self.state.phase = phase;
    }

    /// Apply one discrete input. Control changes take effect on the next tick.
    pub fn apply_input(&mut self, input: InputEvent) -> Option<SessionEvent> {
        match input {
            InputEvent::Restart => {
                self.restart();
                return Some(SessionEvent::Restarted { level_id: self.level.level_id });
            }
            InputEvent::PauseToggle => return None,
            _ => {}
        }

        if self.state.phase != SessionPhase::Playing {
            log::trace!("Ignoring {:?} while {}", input, self.state.phase.as_str());
            return None;
        }

        match input {
            InputEvent::Gravity(direction) => self.controls.apply_direction(direction),
            InputEvent::DampingUp => self.controls.thicken(),
            InputEvent::DampingDown => self.controls.thin(),
            InputEvent::Restart | InputEvent::PauseToggle => {}
        }
        None
    }

    /// Reload the level from its definition, discarding lives and time
    pub fn restart(&mut self) {
        self.state = LevelSessionState::new(self.level.lives);
        self.score = None;
        self.physics.reset(self.level.start_pos);
        self.controls.reset();
        self.finish_loading();
        log::info!("Restarted level {}", self.level.level_id);
    }

    /// Advance the session by one fixed timestep
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        match self.state.phase {
            SessionPhase::Playing => {}
            SessionPhase::HazardHit => {
                self.state.respawn_ticks = self.state.respawn_ticks.saturating_sub(1);
                if self.state.respawn_ticks == 0 {
                    self.respawn(&mut events);
                }
                return events;
            }
            SessionPhase::Loading | SessionPhase::GoalReached | SessionPhase::Ended(_) => {
                return events;
            }
        }

        let contact = self.step_physics();
        self.state.elapsed_ticks += 1;

        match contact {
            Contact::Hazard => self.hazard_hit(&mut events),
            Contact::Goal => self.goal_reached(&mut events),
            Contact::Wall | Contact::None => {}
        }
        events
    }

    /// Integrate once, then sweep the motion in sub-moves so thin hazards
    /// cannot be skipped. Walls are resolved before each classification.
    fn step_physics(&mut self) -> Contact {
        let dt = self.tuning.sim_dt;
        let controls = self.controls.snapshot();

        self.physics.accelerate(dt, &controls);
        let steps = self.physics.sweep_steps(dt, self.tuning.max_sweep_steps);
        let sub_dt = dt / steps as f32;

        let mut contact = Contact::None;
        for _ in 0..steps {
            self.physics.advance(sub_dt);
            self.geometry
                .resolve_walls(
                    self.physics.body_mut(),
                    self.tuning.wall_restitution,
                    self.tuning.wall_friction,
                );

            let body = self.physics.body();
            contact = contact.max(self.geometry.classify(body.pos, body.radius));
            if contact == Contact::Hazard {
                break;
            }
        }
        contact
    }

    fn hazard_hit(&mut self, events: &mut Vec<SessionEvent>) {
        self.transition(SessionPhase::HazardHit);
        self.state.lives = self.state.lives.saturating_sub(1);
        events.push(SessionEvent::HazardHit { lives_left: self.state.lives });

        if self.state.lives == 0 {
            self.transition(SessionPhase::Ended(Outcome::LostAllLives));
            log::info!(
                "Game over on level {} after {} ticks",
                self.level.level_id,
                self.state.elapsed_ticks
            );
            events.push(SessionEvent::GameOver {
                level_id: self.level.level_id,
                elapsed_ticks: self.state.elapsed_ticks,
                elapsed_secs: self.elapsed_secs(),
            });
        } else if self.tuning.respawn_delay_ticks == 0 {
            self.respawn(events);
        } else {
            self.state.respawn_ticks = self.tuning.respawn_delay_ticks;
            log::debug!(
                "Respawning in {} ticks ({} lives left)",
                self.state.respawn_ticks,
                self.state.lives
            );
        }
    }

    fn respawn(&mut self, events: &mut Vec<SessionEvent>) {
        self.physics.reset(self.level.start_pos);
        self.controls.reset();
        self.transition(SessionPhase::Playing);
        events.push(SessionEvent::Respawned);
    }

    fn goal_reached(&mut self, events: &mut Vec<SessionEvent>) {
        self.transition(SessionPhase::GoalReached);
        self.state.goal_touched = true;

        let ticks = self.state.elapsed_ticks;
        let score = score::score(ticks);
        self.score = Some(score);
        self.transition(SessionPhase::Ended(Outcome::Won));

        log::info!(
            "Level {} complete in {} ticks, score {}",
            self.level.level_id,
            ticks,
            score
        );
        events.push(SessionEvent::Completed {
            level_id: self.level.level_id,
            score,
            elapsed_ticks: ticks,
            elapsed_secs: self.elapsed_secs(),
        });
    }

    pub fn level(&self) -> &LevelDefinition {
        &self.level
    }

    pub fn body(&self) -> &Body {
        self.physics.body()
    }

    pub fn controls(&self) -> &ControlState {
        &self.controls
    }

    pub fn geometry(&self) -> &GeometryIndex {
        &self.geometry
    }

    pub fn state(&self) -> &LevelSessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn lives(&self) -> u32 {
        self.state.lives
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.state.elapsed_ticks
    }

    pub fn elapsed_secs(&self) -> f64 {
        ticks_to_secs(self.state.elapsed_ticks, self.tuning.sim_dt)
    }

    /// Score of a won attempt
    pub fn score(&self) -> Option<u64> {
        self.score
    }
}

/// Replay `(tick, input)` pairs against a fresh session.
///
/// An input tagged `t` is applied before the `t`-th tick (0-based) runs.
/// The script may be in any order; inputs sharing a tick keep their
/// relative order. Stops at `max_ticks` or when the attempt ends.
pub fn replay(
    level: &LevelDefinition,
    tuning: &Tuning,
    script: &[(u64, InputEvent)],
    max_ticks: u64,
) -> Result<LevelSession, LevelError> {
    let mut session = LevelSession::new(level, tuning)?;
    let mut ordered = script.to_vec();
    ordered.sort_by_key(|(tick, _)| *tick);
    let mut pending = ordered.into_iter().peekable();

    for tick in 0..max_ticks {
        while let Some((_, input)) = pending.next_if(|(at, _)| *at <= tick) {
            session.apply_input(input);
        }
        if session.phase().is_ended() {
            break;
        }
        session.tick();
    }
    Ok(session)
}
