//! Arena objects: identities, gameplay tags and collision shapes

use drift_math::Vec2;
use serde::{Deserialize, Serialize};

/// Stable identifier of an object in the collision world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Gameplay role of a collision object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Boundary wall of the arena
    MapEdge,
    /// Level geometry
    Obstacle {
        /// Players can grab onto it and launch from it
        jumpable: bool,
        /// Blocks line of sight and movement
        collidable: bool,
    },
    /// A team's gate
    Gate { team: u8 },
    /// A player's body
    Player { player_id: u32 },
}

impl ObjectKind {
    /// Whether rays that skip non-collidable geometry still stop here
    pub fn is_collidable(&self) -> bool {
        match self {
            ObjectKind::Obstacle { collidable, .. } => *collidable,
            _ => true,
        }
    }

    /// Whether players can launch from this object's surface
    pub fn is_jumpable(&self) -> bool {
        match self {
            ObjectKind::MapEdge => true,
            ObjectKind::Obstacle { jumpable, .. } => *jumpable,
            _ => false,
        }
    }
}

/// Collision shape in object-local coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectShape {
    /// Axis-aligned box (before rotation)
    Box { half_extents: Vec2 },
    /// Convex polygon; vertices in any order, the hull is used
    Polygon { points: Vec<Vec2> },
    /// Circle
    Ball { radius: f32 },
}

/// Description used to create an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDesc {
    pub kind: ObjectKind,
    pub shape: ObjectShape,
    pub position: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Sensors never block rays and have no surface
    pub sensor: bool,
}

impl ObjectDesc {
    /// Create a new object description at `position`
    pub fn new(kind: ObjectKind, shape: ObjectShape, position: Vec2) -> Self {
        Self {
            kind,
            shape,
            position,
            rotation: 0.0,
            sensor: false,
        }
    }

    /// Box-shaped object
    pub fn cuboid(kind: ObjectKind, position: Vec2, half_extents: Vec2) -> Self {
        Self::new(kind, ObjectShape::Box { half_extents }, position)
    }

    /// Set rotation
    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    /// Mark as sensor
    pub fn as_sensor(mut self) -> Self {
        self.sensor = true;
        self
    }
}

/// Book-keeping for a live object
#[derive(Debug, Clone, Copy)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub sensor: bool,
}
