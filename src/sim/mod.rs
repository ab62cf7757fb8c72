//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Inputs applied between steps, never during one
//! - Stable iteration order (level file order)
//! - No rendering or platform dependencies

pub mod control;
pub mod geometry;
pub mod physics;
pub mod session;
pub mod state;

pub use control::{ControlState, ControlVariables, GravityDirection};
pub use geometry::{Collider, CollisionResult, Contact, GeometryIndex, Rect, RectKind};
pub use physics::{Body, PhysicsWorld};
pub use session::{InputEvent, LevelSession, replay};
pub use state::{LevelSessionState, Outcome, SessionEvent, SessionPhase};
