//! Drift Physics - Rapier 2D Collision World
//!
//! Static arena geometry for the Drift arena, queried by the bots.
//!
//! # Features
//!
//! - Map borders, obstacles, gates and player bodies tagged with an [`ObjectKind`]
//! - Nearest-hit raycasting with ignore/non-collidable filtering
//! - World-space surface outlines for navigation mapping
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │             PhysicsWorld             │
//! │  ┌─────────────┐  ┌───────────────┐  │
//! │  │ ColliderSet │  │ QueryPipeline │  │
//! │  └─────────────┘  └───────────────┘  │
//! └──────────────────────────────────────┘
//!            │                  │
//!            ▼                  ▼
//!     ┌──────────────┐   ┌───────────┐
//!     │SurfaceSource │   │ RayCaster │
//!     └──────────────┘   └───────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use drift_physics::prelude::*;
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::default())?;
//! world.add_map_borders(1600.0, 1200.0)?;
//! world.add_object(ObjectDesc::cuboid(
//!     ObjectKind::Obstacle { jumpable: true, collidable: true },
//!     Vec2::new(800.0, 600.0),
//!     Vec2::new(100.0, 40.0),
//! ))?;
//!
//! let hit = world.cast_ray(Vec2::new(100.0, 600.0), Vec2::X, 2000.0, &RayFilter::default());
//! ```

pub mod config;
pub mod error;
pub mod object;
pub mod query;
pub mod world;

pub mod prelude {
    //! Common imports for collision queries
    pub use crate::config::PhysicsConfig;
    pub use crate::error::{PhysicsError, Result};
    pub use crate::object::{ObjectDesc, ObjectId, ObjectInfo, ObjectKind, ObjectShape};
    pub use crate::query::{
        PhysicsQuery, RayCaster, RayFilter, RaycastHit, SurfaceOutline, SurfaceSource,
    };
    pub use crate::world::PhysicsWorld;
    pub use drift_math::Vec2;
}

pub use prelude::*;
