//! Navigation graph construction
//!
//! The grapher walks every jumpable surface of an arena and records, for
//! each sampled launch point and exit angle, where a straight jump lands.
//! Work is split per object so callers can spread it over many frames.

use super::cache::NavCache;
use super::intersect_map::{Intersect, SparseIntersectMap};
use crate::config::GrapherConfig;
use crate::error::Result;
use crate::snapshot::MapInfo;
use drift_math::{degrees, normalize_degrees, radians, Vec2};
use drift_physics::{ObjectId, RayCaster, RayFilter, SurfaceOutline, SurfaceSource};
use std::time::Instant;

/// Rays shorter than this count as starting inside geometry
const MIN_VALID_HIT: f32 = 1e-3;

/// Counters collected while mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    /// Objects fully mapped
    pub objects: usize,
    /// Surface segments sampled
    pub sides: usize,
    /// Segments dropped because they face out of the arena
    pub culled: usize,
    /// Forward edges recorded
    pub mapped: usize,
    /// Candidates skipped because their key was already populated
    pub skipped: usize,
}

impl MapStats {
    /// Share of candidates that were already known, in percent
    pub fn skipped_percent(&self) -> f32 {
        let total = self.mapped + self.skipped;
        if total == 0 {
            return 0.0;
        }
        self.skipped as f32 / total as f32 * 100.0
    }
}

/// Incremental builder of a [`SparseIntersectMap`]
pub struct MapGrapher {
    config: GrapherConfig,
    graph: SparseIntersectMap,
    pending: Vec<SurfaceOutline>,
    map_name: String,
    width: f32,
    height: f32,
    dist_change: f32,
    theta_change: f32,
    stats: MapStats,
    cache: Option<NavCache>,
    from_cache: bool,
    loaded: bool,
    completed: bool,
    started: Instant,
}

impl MapGrapher {
    /// Create a new grapher
    pub fn new(config: GrapherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: GrapherConfig) -> Self {
        let graph = SparseIntersectMap::new(config.granularity, 0);
        Self {
            config,
            graph,
            pending: Vec::new(),
            map_name: String::new(),
            width: 0.0,
            height: 0.0,
            dist_change: 0.0,
            theta_change: 0.0,
            stats: MapStats::default(),
            cache: None,
            from_cache: false,
            loaded: false,
            completed: false,
            started: Instant::now(),
        }
    }

    /// Read finished maps from, and write them to, `cache`
    pub fn with_cache(mut self, cache: NavCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &GrapherConfig {
        &self.config
    }

    /// Start graphing `map`
    ///
    /// A valid cached graph for the map name replaces construction entirely.
    /// Otherwise every jumpable surface is queued for [`do_mapping`](Self::do_mapping).
    pub fn load_map(&mut self, map: &MapInfo, surfaces: &dyn SurfaceSource) {
        self.started = Instant::now();
        self.map_name = map.name.clone();
        self.width = map.width;
        self.height = map.height;
        self.stats = MapStats::default();
        self.pending.clear();
        self.loaded = true;
        self.from_cache = false;
        self.completed = false;

        if let Some(cache) = &self.cache {
            if cache.exists(&map.name) {
                match cache.load(&map.name, self.config.granularity) {
                    Ok(graph) => {
                        log::debug!("Navigation graph for '{}' restored from cache", map.name);
                        self.graph = graph;
                        self.from_cache = true;
                        self.completed = true;
                        return;
                    }
                    Err(e) => {
                        log::warn!("Ignoring navigation cache for '{}': {}", map.name, e);
                    }
                }
            }
        }

        self.graph = SparseIntersectMap::new(self.config.granularity, self.config.estimated_size);
        self.theta_change = self.graph.angle_step();
        // Sample more densely than a cell so no cell along a surface is missed
        self.dist_change = (2.0f32).sqrt() * self.graph.cell_size() * 0.7;

        self.pending = surfaces
            .surfaces()
            .into_iter()
            .filter(|surface| surface.kind.is_jumpable())
            .collect();

        log::debug!(
            "Graphing '{}' ({}x{}): {} surfaces queued",
            map.name,
            map.width,
            map.height,
            self.pending.len()
        );
    }

    /// Map up to `max_objects` queued objects; returns whether mapping is done
    pub fn do_mapping(&mut self, caster: &dyn RayCaster, max_objects: usize) -> bool {
        for _ in 0..max_objects {
            let Some(surface) = self.pending.pop() else {
                break;
            };
            self.map_object(caster, &surface);
        }

        if self.is_done_mapping() && !self.completed {
            self.finish();
        }
        self.is_done_mapping()
    }

    /// Map everything still queued
    pub fn map_all(&mut self, caster: &dyn RayCaster) {
        let remaining = self.pending.len();
        self.do_mapping(caster, remaining);
    }

    /// Whether a map was loaded and no objects remain
    pub fn is_done_mapping(&self) -> bool {
        self.loaded && self.pending.is_empty()
    }

    /// Objects still waiting to be mapped
    pub fn pending_objects(&self) -> usize {
        self.pending.len()
    }

    pub fn graph(&self) -> &SparseIntersectMap {
        &self.graph
    }

    pub fn stats(&self) -> MapStats {
        self.stats
    }

    /// Whether the current graph came from the cache
    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }

    fn finish(&mut self) {
        self.completed = true;
        log::info!(
            "Graphed '{}': objects {} sides {} entries {} skipped {} ({:.1}%) in {:.2}s",
            self.map_name,
            self.stats.objects,
            self.stats.sides,
            self.stats.mapped,
            self.stats.skipped,
            self.stats.skipped_percent(),
            self.started.elapsed().as_secs_f32()
        );

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store(&self.map_name, &self.graph) {
                log::warn!("Failed to cache navigation graph for '{}': {}", self.map_name, e);
            }
        }
    }

    // ==================== Sampling ====================

    fn map_object(&mut self, caster: &dyn RayCaster, surface: &SurfaceOutline) {
        let vertices = &surface.vertices;
        if vertices.len() < 2 {
            return;
        }

        for (i, &start) in vertices.iter().enumerate() {
            let end = vertices[(i + 1) % vertices.len()];
            self.map_segment(caster, start, end, surface.object);
        }
        self.stats.objects += 1;
    }

    /// Whether a segment at `start` running along `dir` (degrees) sits past
    /// an arena border with its outside facing further out
    fn faces_out_of_bounds(&self, start: Vec2, dir: f32) -> bool {
        let normal = radians(dir - 90.0);
        let (sin, cos) = normal.sin_cos();
        (start.x < 0.0 && cos < -f32::EPSILON)
            || (start.x > self.width && cos > f32::EPSILON)
            || (start.y < 0.0 && sin < -f32::EPSILON)
            || (start.y > self.height && sin > f32::EPSILON)
    }

    fn map_segment(&mut self, caster: &dyn RayCaster, start: Vec2, end: Vec2, object: ObjectId) {
        let segment = end - start;
        let length = segment.length();
        if length <= f32::EPSILON {
            return;
        }

        let dir = degrees(segment.angle());
        if self.faces_out_of_bounds(start, dir) {
            self.stats.culled += 1;
            return;
        }

        let step = segment / length * self.dist_change;
        let mut point = start;
        let mut travelled = 0.0;
        while travelled <= length {
            self.map_point(caster, point, dir, object);
            point += step;
            travelled += self.dist_change;
        }

        self.stats.sides += 1;
    }

    /// Sweep exit angles through the outside half-plane of a surface point
    fn map_point(&mut self, caster: &dyn RayCaster, point: Vec2, dir: f32, object: ObjectId) {
        let last = dir - 180.0 + self.config.buffer_angle;
        let mut angle = dir - self.config.buffer_angle;

        while angle > last {
            let theta = normalize_degrees(angle);
            angle -= self.theta_change;

            if self.graph.contains(point.x, point.y, theta) {
                self.stats.skipped += 1;
                continue;
            }

            // Clearance over every cast ray, landing along the centre ray
            let Some(clearance) = self.nearest_hit(caster, point, theta, object) else {
                continue;
            };
            if clearance < self.config.min_hop_distance {
                continue;
            }

            let landing = point + Vec2::from_angle(radians(theta)) * clearance;
            self.graph
                .set(point.x, point.y, theta, Intersect::at(landing, clearance));
            self.stats.mapped += 1;

            let back = normalize_degrees(theta + 180.0);
            if !self.graph.contains(landing.x, landing.y, back) {
                self.graph
                    .set(landing.x, landing.y, back, Intersect::at(point, clearance));
            }
        }
    }

    /// Clearance along `theta`: the shortest valid hit among the centre ray
    /// and, with multi-casting, two rays offset sideways
    fn nearest_hit(&self, caster: &dyn RayCaster, point: Vec2, theta: f32, object: ObjectId) -> Option<f32> {
        let direction = Vec2::from_angle(radians(theta));
        let filter = RayFilter::default().ignoring(object).solid_only().static_only();
        let max = self.config.max_ray_distance;

        let cast = |origin: Vec2| {
            caster
                .cast_ray(origin, direction, max, &filter)
                .map(|hit| hit.distance)
                .filter(|&d| d > MIN_VALID_HIT)
        };

        let centre = cast(point);
        if !self.config.multi_cast {
            return centre;
        }

        let side = direction.perpendicular() * self.config.multi_cast_width;
        [centre, cast(point + side), cast(point - side)]
            .into_iter()
            .flatten()
            .reduce(f32::min)
    }
}

impl Default for MapGrapher {
    fn default() -> Self {
        Self::with_valid_config(GrapherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_physics::{ObjectDesc, ObjectKind, PhysicsWorld};
    use std::env;

    const SIZE: f32 = 400.0;

    fn arena() -> (MapInfo, PhysicsWorld) {
        let mut world = PhysicsWorld::default();
        world.add_map_borders(SIZE, SIZE).unwrap();
        (MapInfo::new("box", SIZE, SIZE), world)
    }

    #[test]
    fn test_maps_only_jumpable_objects() {
        let (map, mut world) = arena();
        world
            .add_object(ObjectDesc::cuboid(
                ObjectKind::Obstacle { jumpable: false, collidable: true },
                Vec2::new(200.0, 200.0),
                Vec2::new(20.0, 20.0),
            ))
            .unwrap();

        let mut grapher = MapGrapher::new(GrapherConfig::coarse()).unwrap();
        assert!(!grapher.is_done_mapping());

        grapher.load_map(&map, &world);
        assert_eq!(grapher.pending_objects(), 4);

        assert!(!grapher.do_mapping(&world, 1));
        assert_eq!(grapher.pending_objects(), 3);

        grapher.map_all(&world);
        assert!(grapher.is_done_mapping());
        assert_eq!(grapher.stats().objects, 4);
        assert!(!grapher.is_from_cache());
    }

    #[test]
    fn test_edges_land_inside_the_arena() {
        let (map, world) = arena();
        let mut grapher = MapGrapher::new(GrapherConfig::coarse()).unwrap();
        grapher.load_map(&map, &world);
        grapher.map_all(&world);

        let stats = grapher.stats();
        assert!(stats.mapped > 0);
        assert!(stats.culled >= 4);
        assert!(!grapher.graph().is_empty());

        // Nothing escapes the border walls
        let (lo, hi) = (-66, SIZE as i32 + 66);
        for (_, edge) in grapher.graph().iter() {
            assert!(edge.x >= lo && edge.x <= hi, "{:?}", edge);
            assert!(edge.y >= lo && edge.y <= hi, "{:?}", edge);
            assert!(edge.dist >= grapher.config().min_hop_distance);
        }

        // Straight across from the left wall to the right wall
        assert!(grapher
            .graph()
            .iter()
            .any(|(_, edge)| edge.x >= 399 && (edge.dist - 400.0).abs() < 2.0));
    }

    #[test]
    fn test_multi_cast_takes_nearest() {
        let (_, mut world) = arena();
        // Small block just above the centre line
        world
            .add_object(ObjectDesc::cuboid(
                ObjectKind::Obstacle { jumpable: true, collidable: true },
                Vec2::new(200.0, 212.0),
                Vec2::new(4.0, 4.0),
            ))
            .unwrap();
        let origin = Vec2::new(10.0, 200.0);

        let single = MapGrapher::new(GrapherConfig::coarse()).unwrap();
        let d = single.nearest_hit(&world, origin, 0.0, ObjectId(0)).unwrap();
        assert!((d - 390.0).abs() < 0.01);

        let multi = MapGrapher::new(GrapherConfig::coarse().with_multi_cast(true)).unwrap();
        let d = multi.nearest_hit(&world, origin, 0.0, ObjectId(0)).unwrap();
        assert!((d - 186.0).abs() < 0.01);
    }

    #[test]
    fn test_multi_cast_landing_stays_on_centre_ray() {
        let (map, mut world) = arena();
        world
            .add_object(ObjectDesc::cuboid(
                ObjectKind::Obstacle { jumpable: true, collidable: true },
                Vec2::new(200.0, 212.0),
                Vec2::new(4.0, 4.0),
            ))
            .unwrap();
        let origin = Vec2::new(10.0, 200.0);

        let mut grapher = MapGrapher::new(GrapherConfig::coarse().with_multi_cast(true)).unwrap();
        grapher.load_map(&map, &world);
        // Surface running straight up; its outside faces right
        grapher.map_point(&world, origin, 90.0, ObjectId(0));

        // The upper side ray clips the block, the centre ray flies past it
        let edge = grapher.graph().get(origin.x, origin.y, 0.0).unwrap();
        assert!(edge.dist < 200.0, "{:?}", edge);
        assert!((edge.x as f32 - (origin.x + edge.dist)).abs() <= 2.0, "{:?}", edge);
        assert!((edge.y - 200).abs() <= 3, "{:?}", edge);
    }

    #[test]
    fn test_rejects_invalid_config() {
        for config in [
            GrapherConfig::default().with_granularity(32),
            GrapherConfig { buffer_angle: 120.0, ..Default::default() },
        ] {
            assert!(matches!(
                MapGrapher::new(config),
                Err(crate::error::AiError::InvalidConfig(_))
            ));
        }
        assert_eq!(MapGrapher::default().config(), &GrapherConfig::default());
    }

    #[test]
    fn test_cache_short_circuits_mapping() {
        let dir = env::temp_dir().join(format!("drift_grapher_test_{}", std::process::id()));
        let (map, world) = arena();

        let mut first = MapGrapher::new(GrapherConfig::coarse())
            .unwrap()
            .with_cache(NavCache::new(&dir));
        first.load_map(&map, &world);
        first.map_all(&world);
        assert!(NavCache::new(&dir).exists("box"));

        let mut second = MapGrapher::new(GrapherConfig::coarse())
            .unwrap()
            .with_cache(NavCache::new(&dir));
        second.load_map(&map, &world);
        assert!(second.is_from_cache());
        assert!(second.is_done_mapping());
        assert_eq!(second.graph(), first.graph());

        // Different granularity ignores the cached file
        let mut third = MapGrapher::new(GrapherConfig::coarse().with_granularity(5))
            .unwrap()
            .with_cache(NavCache::new(&dir));
        third.load_map(&map, &world);
        assert!(!third.is_from_cache());
        assert_eq!(third.pending_objects(), 4);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
