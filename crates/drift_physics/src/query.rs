//! Physics queries (raycasting, surface outlines)

use crate::object::{ObjectId, ObjectInfo, ObjectKind};
use drift_math::Vec2;
use rapier2d::prelude as rapier;
use std::collections::HashMap;

/// Result of a raycast query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// The object that was hit
    pub object: ObjectId,
    /// Gameplay role of the hit object
    pub kind: ObjectKind,
    /// Hit point in world space
    pub point: Vec2,
    /// Distance from ray origin
    pub distance: f32,
}

/// Filter applied to a raycast
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RayFilter {
    /// Object the ray passes through (usually the caster's own body)
    pub ignore: Option<ObjectId>,
    /// Pass through obstacles flagged as non-collidable
    pub skip_non_collidable: bool,
    /// Pass through player bodies
    pub skip_players: bool,
}

impl RayFilter {
    /// Ignore an object
    pub fn ignoring(mut self, object: ObjectId) -> Self {
        self.ignore = Some(object);
        self
    }

    /// Ignore an object if one is given
    pub fn ignoring_opt(mut self, object: Option<ObjectId>) -> Self {
        self.ignore = object;
        self
    }

    /// Pass through non-collidable obstacles
    pub fn solid_only(mut self) -> Self {
        self.skip_non_collidable = true;
        self
    }

    /// Pass through player bodies
    pub fn static_only(mut self) -> Self {
        self.skip_players = true;
        self
    }

    fn admits(&self, kind: &ObjectKind) -> bool {
        if self.skip_non_collidable && !kind.is_collidable() {
            return false;
        }
        !(self.skip_players && matches!(kind, ObjectKind::Player { .. }))
    }
}

/// Nearest-hit ray queries against the arena
pub trait RayCaster {
    /// Cast a ray from `origin` along `direction` and return the nearest hit
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: &RayFilter,
    ) -> Option<RaycastHit>;

    /// Cast along an angle in radians
    fn cast_ray_at(
        &self,
        origin: Vec2,
        radians: f32,
        max_distance: f32,
        filter: &RayFilter,
    ) -> Option<RaycastHit> {
        self.cast_ray(origin, Vec2::from_angle(radians), max_distance, filter)
    }
}

/// World-space outline of a polygonal object, counter-clockwise
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceOutline {
    pub object: ObjectId,
    pub kind: ObjectKind,
    pub vertices: Vec<Vec2>,
}

/// Source of static surfaces for navigation mapping
pub trait SurfaceSource {
    /// Outlines of every solid polygonal object, ordered by object id
    fn surfaces(&self) -> Vec<SurfaceOutline>;
}

/// Query interface for the collision world
pub struct PhysicsQuery<'a> {
    pub(crate) query_pipeline: &'a rapier::QueryPipeline,
    pub(crate) colliders: &'a rapier::ColliderSet,
    pub(crate) bodies: &'a rapier::RigidBodySet,
    pub(crate) objects: &'a HashMap<ObjectId, (ObjectInfo, rapier::ColliderHandle)>,
    pub(crate) max_distance: f32,
}

impl<'a> PhysicsQuery<'a> {
    fn info_for(&self, handle: rapier::ColliderHandle) -> Option<ObjectInfo> {
        let collider = self.colliders.get(handle)?;
        let id = ObjectId(collider.user_data as u64);
        self.objects.get(&id).map(|(info, _)| *info)
    }

    /// Cast a ray and get the first hit
    pub fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        options: &RayFilter,
    ) -> Option<RaycastHit> {
        let direction = direction.normalize();
        if direction == Vec2::ZERO {
            return None;
        }

        let ray = rapier::Ray::new(
            rapier::Point::new(origin.x, origin.y),
            rapier::Vector::new(direction.x, direction.y),
        );

        let predicate = |handle: rapier::ColliderHandle, _: &rapier::Collider| {
            self.info_for(handle)
                .map_or(false, |info| options.admits(&info.kind))
        };

        let mut filter = rapier::QueryFilter::new()
            .exclude_sensors()
            .predicate(&predicate);

        if let Some(ignored) = options.ignore {
            if let Some((_, handle)) = self.objects.get(&ignored) {
                filter = filter.exclude_collider(*handle);
            }
        }

        let (handle, toi) = self.query_pipeline.cast_ray(
            self.bodies,
            self.colliders,
            &ray,
            max_distance.min(self.max_distance),
            true,
            filter,
        )?;

        let info = self.info_for(handle)?;
        let point = ray.point_at(toi);

        Some(RaycastHit {
            object: info.id,
            kind: info.kind,
            point: Vec2::new(point.x, point.y),
            distance: toi,
        })
    }
}
