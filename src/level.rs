//! Level definition records
//!
//! Levels are a JSON array in the layout the level editor writes:
//! rectangles as `[x, y, w, h]`, vectors as `[x, y]`. Every record is
//! validated before a session can be built from it.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::control::GravityDirection;
use crate::sim::geometry::{GeometryIndex, Rect};
use crate::tuning::Tuning;

/// Difficulty tier shown on level select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Insane,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Insane => "insane",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            "insane" => Some(Difficulty::Insane),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Difficulty {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Difficulty::from_str(&s).ok_or_else(|| format!("unknown difficulty '{s}'"))
    }
}

impl From<Difficulty> for String {
    fn from(d: Difficulty) -> Self {
        d.as_str().to_string()
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed level data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Level {level_id}: {reason}")]
    Invalid { level_id: u32, reason: String },

    #[error("Duplicate level id {0}")]
    DuplicateId(u32),

    #[error("Level ids must run 1..={count} in order; found {found} at position {position}")]
    NonSequentialId {
        found: u32,
        position: usize,
        count: usize,
    },

    #[error("Level file contains no levels")]
    Empty,
}

fn default_lives() -> u32 {
    DEFAULT_LIVES
}

/// One level as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub level_id: u32,
    pub name: String,
    pub difficulty: Difficulty,
    #[serde(default = "default_lives")]
    pub lives: u32,
    pub start_pos: Vec2,
    pub gravity_start: Vec2,
    pub damping_start: f32,
    pub goal_rect: Rect,
    #[serde(default)]
    pub walls: Vec<Rect>,
    #[serde(default)]
    pub hazards: Vec<Rect>,
}

impl LevelDefinition {
    /// Initial gravity direction; only meaningful after `validate`
    pub fn gravity_direction(&self) -> GravityDirection {
        GravityDirection::from_vector(self.gravity_start).unwrap_or(GravityDirection::Down)
    }

    /// Gravity magnitude, fixed for the whole level
    pub fn gravity_magnitude(&self) -> f32 {
        self.gravity_start.length()
    }

    fn invalid(&self, reason: impl Into<String>) -> LevelError {
        LevelError::Invalid {
            level_id: self.level_id,
            reason: reason.into(),
        }
    }

    /// Check every field against its constraints
    pub fn validate(&self, tuning: &Tuning) -> Result<(), LevelError> {
        if self.level_id == 0 {
            return Err(self.invalid("level_id must start at 1"));
        }
        if self.name.trim().is_empty() {
            return Err(self.invalid("name must not be empty"));
        }
        if self.lives < 1 {
            return Err(self.invalid("lives must be at least 1"));
        }
        if !self.damping_start.is_finite()
            || !(DAMPING_MIN..=DAMPING_MAX).contains(&self.damping_start)
        {
            return Err(self.invalid(format!(
                "damping_start {} outside [{DAMPING_MIN}, {DAMPING_MAX}]",
                self.damping_start
            )));
        }
        if GravityDirection::from_vector(self.gravity_start).is_none() {
            return Err(self.invalid(format!(
                "gravity_start {:?} must be a non-zero vector along one axis",
                self.gravity_start
            )));
        }

        let arena = Rect::new(0.0, 0.0, tuning.arena_width, tuning.arena_height);
        if !self.start_pos.is_finite() || !arena.contains(self.start_pos) {
            return Err(self.invalid(format!(
                "start_pos {:?} outside the {}x{} arena",
                self.start_pos, tuning.arena_width, tuning.arena_height
            )));
        }

        let rects = std::iter::once(("goal_rect", &self.goal_rect))
            .chain(self.walls.iter().map(|r| ("wall", r)))
            .chain(self.hazards.iter().map(|r| ("hazard", r)));
        for (what, rect) in rects {
            if !rect.is_finite() || rect.width <= 0.0 || rect.height <= 0.0 {
                return Err(self.invalid(format!("{what} {rect:?} must have a positive size")));
            }
        }

        // The ball starts clear of the frame and of every wall
        let frame = if tuning.boundary_thickness > 0.0 {
            GeometryIndex::boundary_walls(
                tuning.arena_width,
                tuning.arena_height,
                tuning.boundary_thickness,
            )
            .to_vec()
        } else {
            Vec::new()
        };
        if let Some(solid) = frame
            .iter()
            .chain(&self.walls)
            .find(|r| r.overlaps_circle(self.start_pos, tuning.ball_radius))
        {
            return Err(self.invalid(format!(
                "start_pos {:?} overlaps wall {solid:?}",
                self.start_pos
            )));
        }
        Ok(())
    }
}

/// Ordered, validated level catalog
#[derive(Debug, Clone)]
pub struct LevelSet {
    levels: Vec<LevelDefinition>,
}

impl LevelSet {
    /// Validate records and their id sequence
    pub fn new(levels: Vec<LevelDefinition>, tuning: &Tuning) -> Result<Self, LevelError> {
        if levels.is_empty() {
            return Err(LevelError::Empty);
        }

        let mut seen = HashSet::new();
        for level in &levels {
            if !seen.insert(level.level_id) {
                return Err(LevelError::DuplicateId(level.level_id));
            }
        }
        for (position, level) in levels.iter().enumerate() {
            if level.level_id as usize != position + 1 {
                return Err(LevelError::NonSequentialId {
                    found: level.level_id,
                    position,
                    count: levels.len(),
                });
            }
            level.validate(tuning)?;
        }
        Ok(Self { levels })
    }

    pub fn from_json_str(json: &str, tuning: &Tuning) -> Result<Self, LevelError> {
        let levels: Vec<LevelDefinition> = serde_json::from_str(json)?;
        Self::new(levels, tuning)
    }

    /// Load and validate a level file
    pub fn load(path: &Path, tuning: &Tuning) -> Result<Self, LevelError> {
        let json = std::fs::read_to_string(path)?;
        let set = Self::from_json_str(&json, tuning)?;
        log::info!("Loaded {} levels from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, level_id: u32) -> Option<&LevelDefinition> {
        let index = (level_id as usize).checked_sub(1)?;
        self.levels.get(index)
    }

    pub fn first(&self) -> Option<&LevelDefinition> {
        self.levels.first()
    }

    /// The level following `level_id`, if any
    pub fn next_after(&self, level_id: u32) -> Option<&LevelDefinition> {
        self.get(level_id.checked_add(1)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelDefinition> {
        self.levels.iter()
    }
}
