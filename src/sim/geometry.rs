//! Static level geometry and circle-vs-rectangle contacts
//!
//! Every collider is an axis-aligned rectangle tagged as a wall, a hazard or
//! the goal. Walls are solid and get resolved first; hazards and the goal are
//! sensors that only classify the contact.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::Body;

/// What a rectangle does to the ball on contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RectKind {
    Wall,
    Hazard,
    Goal,
}

/// Contact classification after wall resolution, in precedence order
/// (Hazard beats Goal beats Wall).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Contact {
    #[default]
    None,
    Wall,
    Goal,
    Hazard,
}

impl Contact {
    fn rank(self) -> u8 {
        match self {
            Contact::None => 0,
            Contact::Wall => 1,
            Contact::Goal => 2,
            Contact::Hazard => 3,
        }
    }

    /// Keep whichever contact takes precedence
    #[inline]
    pub fn max(self, other: Contact) -> Contact {
        if other.rank() > self.rank() { other } else { self }
    }
}

/// Axis-aligned rectangle: top-left corner plus size (y grows downward).
///
/// Serialized as `[x, y, width, height]`, the layout level files use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl From<[f32; 4]> for Rect {
    fn from([x, y, width, height]: [f32; 4]) -> Self {
        Self { x, y, width, height }
    }
}

impl From<Rect> for [f32; 4] {
    fn from(r: Rect) -> Self {
        [r.x, r.y, r.width, r.height]
    }
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Point containment, edges inclusive
    pub fn contains(&self, p: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }

    /// Closest point on (or in) the rectangle to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min(), self.max())
    }

    /// Circle overlap: closest-point clamp, strict distance check
    pub fn overlaps_circle(&self, center: Vec2, radius: f32) -> bool {
        self.closest_point(center).distance_squared(center) < radius * radius
    }
}

/// A tagged collider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub rect: Rect,
    pub kind: RectKind,
}

/// Result of a circle-vs-rectangle check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal pointing from the rectangle toward the ball center
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check collision between a ball and an axis-aligned rectangle
///
/// When the ball center is outside the rectangle the normal points from the
/// closest point toward the center. When the center is inside, the ball is
/// pushed out through the nearest face.
pub fn ball_rect_collision(ball_pos: Vec2, ball_radius: f32, rect: &Rect) -> CollisionResult {
    let closest = rect.closest_point(ball_pos);
    let offset = ball_pos - closest;
    let dist_sq = offset.length_squared();

    if dist_sq >= ball_radius * ball_radius {
        return CollisionResult::miss();
    }

    if dist_sq > f32::EPSILON {
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            normal: offset / dist,
            penetration: ball_radius - dist,
        };
    }

    // Center inside the rectangle (tunneling) - exit through the nearest face
    let (min, max) = (rect.min(), rect.max());
    let faces = [
        (ball_pos.x - min.x, Vec2::NEG_X),
        (max.x - ball_pos.x, Vec2::X),
        (ball_pos.y - min.y, Vec2::NEG_Y),
        (max.y - ball_pos.y, Vec2::Y),
    ];
    let (depth, normal) = faces
        .into_iter()
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0.0, Vec2::NEG_Y));

    CollisionResult {
        hit: true,
        normal,
        penetration: depth + ball_radius,
    }
}

/// Bounce off a surface.
///
/// The inbound normal component is flipped and scaled by `restitution`.
/// The tangential component loses up to `friction` times the normal
/// impulse (Coulomb), never reversing direction.
pub fn bounce_velocity(velocity: Vec2, normal: Vec2, restitution: f32, friction: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }

    let normal_impulse = -(1.0 + restitution) * vn;
    let tangent = velocity - vn * normal;
    let tangent_speed = tangent.length();
    let slowed = if tangent_speed > f32::EPSILON {
        let drop = (friction * normal_impulse).min(tangent_speed);
        tangent * (1.0 - drop / tangent_speed)
    } else {
        tangent
    };
    slowed - restitution * vn * normal
}

/// Immutable per-level collider set
#[derive(Debug, Clone, Default)]
pub struct GeometryIndex {
    walls: Vec<Rect>,
    hazards: Vec<Rect>,
    goals: Vec<Rect>,
}

/// Wall passes per resolution; corners need more than one
const WALL_RESOLVE_ITERATIONS: usize = 4;

impl GeometryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from tagged colliders, keeping their order
    pub fn from_colliders(colliders: impl IntoIterator<Item = Collider>) -> Self {
        let mut index = Self::new();
        for c in colliders {
            index.insert(c);
        }
        index
    }

    fn insert(&mut self, collider: Collider) {
        match collider.kind {
            RectKind::Wall => self.walls.push(collider.rect),
            RectKind::Hazard => self.hazards.push(collider.rect),
            RectKind::Goal => self.goals.push(collider.rect),
        }
    }

    /// The four solid strips framing an arena
    pub fn boundary_walls(width: f32, height: f32, thickness: f32) -> [Rect; 4] {
        [
            Rect::new(0.0, 0.0, width, thickness),
            Rect::new(0.0, height - thickness, width, thickness),
            Rect::new(0.0, 0.0, thickness, height),
            Rect::new(width - thickness, 0.0, thickness, height),
        ]
    }

    pub fn walls(&self) -> &[Rect] {
        &self.walls
    }

    pub fn hazards(&self) -> &[Rect] {
        &self.hazards
    }

    pub fn goals(&self) -> &[Rect] {
        &self.goals
    }

    /// Push the body out of every wall it overlaps and bounce its velocity.
    ///
    /// Returns true if any wall was touched.
    pub fn resolve_walls(&self, body: &mut Body, restitution: f32, friction: f32) -> bool {
        let mut touched = false;
        for _ in 0..WALL_RESOLVE_ITERATIONS {
            let mut moved = false;
            for wall in &self.walls {
                let result = ball_rect_collision(body.pos, body.radius, wall);
                if result.hit {
                    body.pos += result.normal * result.penetration;
                    body.vel = bounce_velocity(body.vel, result.normal, restitution, friction);
                    moved = true;
                }
            }
            touched |= moved;
            if !moved {
                break;
            }
        }
        touched
    }

    /// Classify what the ball touches at `pos`.
    ///
    /// Hazard wins over Goal; either wins over Wall.
    pub fn classify(&self, pos: Vec2, radius: f32) -> Contact {
        if self.hazards.iter().any(|r| r.overlaps_circle(pos, radius)) {
            return Contact::Hazard;
        }
        if self.goals.iter().any(|r| r.overlaps_circle(pos, radius)) {
            return Contact::Goal;
        }
        if self.walls.iter().any(|r| r.overlaps_circle(pos, radius)) {
            return Contact::Wall;
        }
        Contact::None
    }
}
