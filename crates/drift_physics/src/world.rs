//! Collision world - static arena geometry plus player bodies

use crate::config::PhysicsConfig;
use crate::error::{PhysicsError, Result};
use crate::object::{ObjectDesc, ObjectId, ObjectInfo, ObjectKind, ObjectShape};
use crate::query::{PhysicsQuery, RayCaster, RayFilter, RaycastHit, SurfaceOutline, SurfaceSource};
use drift_math::Vec2;
use rapier2d::prelude as rapier;
use std::collections::HashMap;

/// The arena's collision state
///
/// Every object is a single parentless collider; the rigid body set stays
/// empty and only exists because the query pipeline needs one.
pub struct PhysicsWorld {
    /// Configuration
    config: PhysicsConfig,

    /// Query pipeline
    query_pipeline: rapier::QueryPipeline,

    /// Rigid body set
    bodies: rapier::RigidBodySet,

    /// Collider set
    colliders: rapier::ColliderSet,

    /// Live objects and their colliders
    objects: HashMap<ObjectId, (ObjectInfo, rapier::ColliderHandle)>,

    /// Next object id to hand out
    next_id: u64,
}

impl PhysicsWorld {
    /// Create a new collision world
    pub fn new(config: PhysicsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            query_pipeline: rapier::QueryPipeline::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            objects: HashMap::new(),
            next_id: 1,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    // ==================== Objects ====================

    /// Add an object and return its id
    pub fn add_object(&mut self, desc: ObjectDesc) -> Result<ObjectId> {
        let id = ObjectId(self.next_id);

        let builder = match &desc.shape {
            ObjectShape::Box { half_extents } => {
                if half_extents.x <= 0.0 || half_extents.y <= 0.0 {
                    return Err(PhysicsError::ShapeCreationFailed(format!(
                        "box half extents must be positive, got {:?}",
                        half_extents
                    )));
                }
                rapier::ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            }
            ObjectShape::Polygon { points } => {
                let points: Vec<rapier::Point<f32>> = points
                    .iter()
                    .map(|p| rapier::Point::new(p.x, p.y))
                    .collect();
                rapier::ColliderBuilder::convex_hull(&points).ok_or_else(|| {
                    PhysicsError::ShapeCreationFailed(format!(
                        "degenerate polygon with {} points",
                        points.len()
                    ))
                })?
            }
            ObjectShape::Ball { radius } => {
                if *radius <= 0.0 {
                    return Err(PhysicsError::ShapeCreationFailed(format!(
                        "ball radius must be positive, got {}",
                        radius
                    )));
                }
                rapier::ColliderBuilder::ball(*radius)
            }
        };

        let collider = builder
            .translation(rapier::Vector::new(desc.position.x, desc.position.y))
            .rotation(desc.rotation)
            .sensor(desc.sensor)
            .user_data(id.0 as u128)
            .build();

        let handle = self.colliders.insert(collider);
        let info = ObjectInfo {
            id,
            kind: desc.kind,
            sensor: desc.sensor,
        };
        self.objects.insert(id, (info, handle));
        self.next_id += 1;

        self.sync_query_pipeline();
        log::debug!("Added {:?} as {:?}", desc.kind, id);
        Ok(id)
    }

    /// Surround a `width` x `height` arena with four wall boxes outside its bounds
    pub fn add_map_borders(&mut self, width: f32, height: f32) -> Result<[ObjectId; 4]> {
        let t = self.config.border_thickness;
        let half = t / 2.0;
        let walls = [
            (Vec2::new(width / 2.0, -half), Vec2::new(width / 2.0 + t, half)),
            (Vec2::new(width / 2.0, height + half), Vec2::new(width / 2.0 + t, half)),
            (Vec2::new(-half, height / 2.0), Vec2::new(half, height / 2.0 + t)),
            (Vec2::new(width + half, height / 2.0), Vec2::new(half, height / 2.0 + t)),
        ];

        let mut ids = [ObjectId(0); 4];
        for (slot, (center, half_extents)) in ids.iter_mut().zip(walls) {
            *slot = self.add_object(ObjectDesc::cuboid(ObjectKind::MapEdge, center, half_extents))?;
        }
        Ok(ids)
    }

    /// Remove an object
    pub fn remove_object(&mut self, id: ObjectId) -> Result<()> {
        let (_, handle) = self.objects.remove(&id).ok_or(PhysicsError::ObjectNotFound(id))?;
        let mut islands = rapier::IslandManager::new();
        self.colliders.remove(handle, &mut islands, &mut self.bodies, false);
        self.sync_query_pipeline();
        Ok(())
    }

    /// Move an object (players move every tick)
    pub fn set_object_position(&mut self, id: ObjectId, position: Vec2) -> Result<()> {
        let (_, handle) = self.objects.get(&id).ok_or(PhysicsError::ObjectNotFound(id))?;
        let collider = self
            .colliders
            .get_mut(*handle)
            .ok_or(PhysicsError::ObjectNotFound(id))?;
        collider.set_translation(rapier::Vector::new(position.x, position.y));
        self.sync_query_pipeline();
        Ok(())
    }

    /// Get an object's position
    pub fn object_position(&self, id: ObjectId) -> Result<Vec2> {
        let (_, handle) = self.objects.get(&id).ok_or(PhysicsError::ObjectNotFound(id))?;
        let collider = self.colliders.get(*handle).ok_or(PhysicsError::ObjectNotFound(id))?;
        let t = collider.translation();
        Ok(Vec2::new(t.x, t.y))
    }

    /// Look up an object
    pub fn object(&self, id: ObjectId) -> Option<&ObjectInfo> {
        self.objects.get(&id).map(|(info, _)| info)
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Rebuild the acceleration structure used by ray queries
    pub fn sync_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    // ==================== Queries ====================

    /// Get the query interface
    pub fn query(&self) -> PhysicsQuery<'_> {
        PhysicsQuery {
            query_pipeline: &self.query_pipeline,
            colliders: &self.colliders,
            bodies: &self.bodies,
            objects: &self.objects,
            max_distance: self.config.max_ray_distance,
        }
    }

    fn outline_of(&self, info: &ObjectInfo, handle: rapier::ColliderHandle) -> Option<SurfaceOutline> {
        let collider = self.colliders.get(handle)?;
        let shape = collider.shape();

        let local: Vec<rapier::Point<f32>> = if let Some(polygon) = shape.as_convex_polygon() {
            polygon.points().to_vec()
        } else if let Some(cuboid) = shape.as_cuboid() {
            let h = cuboid.half_extents;
            vec![
                rapier::Point::new(-h.x, -h.y),
                rapier::Point::new(h.x, -h.y),
                rapier::Point::new(h.x, h.y),
                rapier::Point::new(-h.x, h.y),
            ]
        } else {
            log::debug!("Skipping non-polygon surface of {:?}", info.id);
            return None;
        };

        let position = collider.position();
        let vertices = local
            .iter()
            .map(|p| {
                let world = position.transform_point(p);
                Vec2::new(world.x, world.y)
            })
            .collect();

        Some(SurfaceOutline {
            object: info.id,
            kind: info.kind,
            vertices,
        })
    }
}

impl RayCaster for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: &RayFilter,
    ) -> Option<RaycastHit> {
        self.query().raycast(origin, direction, max_distance, filter)
    }
}

impl SurfaceSource for PhysicsWorld {
    fn surfaces(&self) -> Vec<SurfaceOutline> {
        let mut ids: Vec<&ObjectId> = self.objects.keys().collect();
        ids.sort();

        ids.into_iter()
            .filter_map(|id| self.objects.get(id))
            .filter(|(info, _)| !info.sensor)
            .filter_map(|(info, handle)| self.outline_of(info, *handle))
            .collect()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self {
            config: PhysicsConfig::default(),
            query_pipeline: rapier::QueryPipeline::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            objects: HashMap::new(),
            next_id: 1,
        }
    }
}
