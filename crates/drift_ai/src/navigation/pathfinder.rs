//! A* search over the jump graph
//!
//! All bookkeeping lives in a [`SearchState`] owned by a single call, so any
//! number of searches may run side by side over the same shared graph.

use super::intersect_map::{Intersect, SparseIntersectMap};
use drift_math::Vec2;
use drift_physics::{ObjectId, RayCaster, RayFilter};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A node counts as seeing the goal if its ray gets within this of it
const VISIBILITY_SLACK: f32 = 40.0;

/// Sight rays start this far from the node, off the surface it sits on
const SIGHT_RAY_OFFSET: f32 = 2.0;

/// A region the search prefers not to land in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvoidArea {
    pub center: Vec2,
    pub radius: f32,
    /// Extra cost for landing exactly on `center`
    pub weight: f32,
}

impl AvoidArea {
    /// Create a new avoid area
    pub fn new(center: Vec2, radius: f32, weight: f32) -> Self {
        Self { center, radius, weight }
    }

    /// Cost added for landing at `point`, falling off linearly to the rim
    pub fn penalty(&self, point: Vec2) -> f32 {
        if self.radius <= 0.0 {
            return 0.0;
        }
        ((self.radius - point.distance(self.center)) / self.radius * self.weight).max(0.0)
    }
}

/// What makes two graph nodes the same node during a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeIdentity {
    /// Landing coordinates
    #[default]
    Position,
    /// Edge length; distinct nodes with equal-length incoming edges merge.
    /// Kept so older bot behaviour can be reproduced.
    EdgeDistance,
}

/// Per-call search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Arrival radius around the goal
    pub tolerance: f32,
    pub avoid: Vec<AvoidArea>,
    pub identity: NodeIdentity,
    /// Give up after expanding this many nodes
    pub max_expansions: Option<usize>,
}

impl SearchOptions {
    /// Create options with an arrival radius
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            avoid: Vec::new(),
            identity: NodeIdentity::Position,
            max_expansions: None,
        }
    }

    /// Add an avoid area
    pub fn with_avoid_area(mut self, area: AvoidArea) -> Self {
        self.avoid.push(area);
        self
    }

    /// Set node identity
    pub fn with_identity(mut self, identity: NodeIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Set the expansion budget
    pub fn with_max_expansions(mut self, max: Option<usize>) -> Self {
        self.max_expansions = max;
        self
    }

    fn edge_cost(&self, next: &Intersect) -> f32 {
        let landing = next.position();
        next.dist + self.avoid.iter().map(|a| a.penalty(landing)).sum::<f32>()
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new(50.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Position(i32, i32),
    Distance(u32),
}

impl NodeKey {
    fn of(node: &Intersect, identity: NodeIdentity) -> Self {
        match identity {
            NodeIdentity::Position => NodeKey::Position(node.x, node.y),
            NodeIdentity::EdgeDistance => NodeKey::Distance(node.dist.to_bits()),
        }
    }
}

#[derive(Clone, Copy)]
struct OpenEntry {
    key: NodeKey,
    node: Intersect,
    f_score: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
    }
}

/// Scratch state of one search
#[derive(Default)]
struct SearchState {
    open: BinaryHeap<OpenEntry>,
    g_score: HashMap<NodeKey, f32>,
    came_from: HashMap<NodeKey, NodeKey>,
    nodes: HashMap<NodeKey, Intersect>,
    closed: HashSet<NodeKey>,
    expansions: usize,
}

impl SearchState {
    /// Walk `came_from` back to the start; `None` if the links loop
    fn reconstruct(&self, goal_key: NodeKey, goal: Intersect) -> Option<Vec<Intersect>> {
        let mut path = vec![goal];
        let mut current = goal_key;
        while let Some(&prev) = self.came_from.get(&current) {
            if path.len() > self.came_from.len() {
                return None;
            }
            path.push(*self.nodes.get(&prev)?);
            current = prev;
        }
        path.reverse();
        Some(path)
    }
}

/// Path search over a borrowed graph
pub struct Pathfinder<'a> {
    graph: &'a SparseIntersectMap,
}

impl<'a> Pathfinder<'a> {
    /// Create a new pathfinder
    pub fn new(graph: &'a SparseIntersectMap) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'a SparseIntersectMap {
        self.graph
    }

    /// Find a chain of jumps from `start` to within `options.tolerance` of `goal`
    ///
    /// The path starts with the start node itself, so the first jump to
    /// take is the second element. When `start` is already close enough the
    /// search succeeds with an empty path.
    pub fn find_path(&self, start: Vec2, goal: Vec2, options: &SearchOptions) -> Option<Vec<Intersect>> {
        self.search(start, goal, options, |node| {
            node.distance_to(goal) < options.tolerance
        })
    }

    /// Like [`find_path`](Self::find_path), but stops at the first node
    /// within tolerance that also has a clear line of sight to `goal`
    pub fn find_path_to_visibility(
        &self,
        start: Vec2,
        goal: Vec2,
        options: &SearchOptions,
        caster: &dyn RayCaster,
        ignore: Option<ObjectId>,
    ) -> Option<Vec<Intersect>> {
        let filter = RayFilter::default().ignoring_opt(ignore).solid_only();
        self.search(start, goal, options, |node| {
            let distance = node.distance_to(goal);
            if distance >= options.tolerance {
                return false;
            }
            if distance <= SIGHT_RAY_OFFSET {
                return true;
            }

            let direction = (goal - node.position()).normalize();
            let origin = node.position() + direction * SIGHT_RAY_OFFSET;
            match caster.cast_ray(origin, direction, distance, &filter) {
                Some(hit) => hit.distance + SIGHT_RAY_OFFSET >= distance - VISIBILITY_SLACK,
                None => true,
            }
        })
    }

    fn search(
        &self,
        start: Vec2,
        goal: Vec2,
        options: &SearchOptions,
        is_goal: impl Fn(&Intersect) -> bool,
    ) -> Option<Vec<Intersect>> {
        if start.distance(goal) <= options.tolerance {
            return Some(Vec::new());
        }

        let mut state = SearchState::default();
        let origin = Intersect::at(start, 0.0);
        let origin_key = NodeKey::of(&origin, options.identity);
        state.g_score.insert(origin_key, 0.0);
        state.nodes.insert(origin_key, origin);
        state.open.push(OpenEntry {
            key: origin_key,
            node: origin,
            f_score: origin.distance_to(goal),
        });

        let step = self.graph.angle_step();
        let buckets = (360.0 / step).round() as usize;

        while let Some(current) = state.open.pop() {
            if state.closed.contains(&current.key) {
                continue;
            }

            if is_goal(&current.node) {
                let path = state.reconstruct(current.key, current.node);
                if path.is_none() {
                    log::warn!("Path search produced a cyclic route to {:?}", goal);
                }
                return path;
            }

            state.closed.insert(current.key);
            state.expansions += 1;
            if let Some(max) = options.max_expansions {
                if state.expansions > max {
                    log::debug!("Path search to {:?} gave up after {} expansions", goal, max);
                    return None;
                }
            }

            let current_g = *state.g_score.get(&current.key).unwrap_or(&f32::MAX);
            let (x, y) = (current.node.x as f32, current.node.y as f32);

            for i in 0..buckets {
                let theta = (i as f32 + 0.5) * step;
                let Some(next) = self.graph.get(x, y, theta) else {
                    continue;
                };

                let next_key = NodeKey::of(&next, options.identity);
                if state.closed.contains(&next_key) {
                    continue;
                }

                let tentative_g = current_g + options.edge_cost(&next);
                let next_g = *state.g_score.get(&next_key).unwrap_or(&f32::MAX);
                if tentative_g < next_g {
                    state.came_from.insert(next_key, current.key);
                    state.g_score.insert(next_key, tentative_g);
                    state.nodes.insert(next_key, next);
                    state.open.push(OpenEntry {
                        key: next_key,
                        node: next,
                        f_score: tentative_g + next.distance_to(goal),
                    });
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_physics::{ObjectKind, RaycastHit};

    fn graph() -> SparseIntersectMap {
        SparseIntersectMap::new(5, 4096)
    }

    /// (0,0) -> (200,0) -> (200,300)
    fn chain() -> SparseIntersectMap {
        let mut g = graph();
        g.set(0.0, 0.0, 0.0, Intersect::new(200, 0, 200.0));
        g.set(200.0, 0.0, 90.0, Intersect::new(200, 300, 300.0));
        g
    }

    #[test]
    fn test_trivial_success_is_empty() {
        let g = graph();
        let finder = Pathfinder::new(&g);
        let path = finder.find_path(Vec2::ZERO, Vec2::new(5.0, 5.0), &SearchOptions::new(10.0));
        assert_eq!(path, Some(Vec::new()));
    }

    #[test]
    fn test_disconnected_goal() {
        let g = chain();
        let finder = Pathfinder::new(&g);
        let path = finder.find_path(Vec2::ZERO, Vec2::new(1000.0, 1000.0), &SearchOptions::new(10.0));
        assert!(path.is_none());
    }

    #[test]
    fn test_follows_chain() {
        let g = chain();
        let finder = Pathfinder::new(&g);
        let path = finder
            .find_path(Vec2::ZERO, Vec2::new(200.0, 300.0), &SearchOptions::new(10.0))
            .unwrap();

        assert_eq!(
            path,
            vec![
                Intersect::new(0, 0, 0.0),
                Intersect::new(200, 0, 200.0),
                Intersect::new(200, 300, 300.0),
            ]
        );
    }

    #[test]
    fn test_prefers_shorter_route() {
        let mut g = graph();
        g.set(0.0, 0.0, 0.0, Intersect::new(400, 0, 400.0));
        g.set(400.0, 0.0, 90.0, Intersect::new(400, 400, 400.0));
        g.set(0.0, 0.0, 45.0, Intersect::new(400, 400, 566.0));

        let finder = Pathfinder::new(&g);
        let path = finder
            .find_path(Vec2::ZERO, Vec2::new(400.0, 400.0), &SearchOptions::new(10.0))
            .unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1], Intersect::new(400, 400, 566.0));
    }

    #[test]
    fn test_avoid_area_reroutes() {
        let mut g = graph();
        g.set(0.0, 0.0, 0.0, Intersect::new(400, 0, 400.0));
        g.set(400.0, 0.0, 90.0, Intersect::new(400, 400, 400.0));
        g.set(0.0, 0.0, 90.0, Intersect::new(0, 400, 400.0));
        g.set(0.0, 400.0, 0.0, Intersect::new(400, 400, 400.0));

        let finder = Pathfinder::new(&g);
        let options = SearchOptions::new(10.0)
            .with_avoid_area(AvoidArea::new(Vec2::new(400.0, 0.0), 100.0, 1000.0));
        let path = finder.find_path(Vec2::ZERO, Vec2::new(400.0, 400.0), &options).unwrap();
        assert_eq!(path[1], Intersect::new(0, 400, 400.0));
    }

    #[test]
    fn test_avoid_penalty() {
        let area = AvoidArea::new(Vec2::ZERO, 100.0, 400.0);
        assert_eq!(area.penalty(Vec2::ZERO), 400.0);
        assert_eq!(area.penalty(Vec2::new(50.0, 0.0)), 200.0);
        assert_eq!(area.penalty(Vec2::new(150.0, 0.0)), 0.0);
    }

    #[test]
    fn test_expansion_budget() {
        let g = chain();
        let finder = Pathfinder::new(&g);
        let goal = Vec2::new(200.0, 300.0);

        let tight = SearchOptions::new(10.0).with_max_expansions(Some(1));
        assert!(finder.find_path(Vec2::ZERO, goal, &tight).is_none());

        let enough = SearchOptions::new(10.0).with_max_expansions(Some(2));
        assert!(finder.find_path(Vec2::ZERO, goal, &enough).is_some());
    }

    #[test]
    fn test_edge_distance_identity_merges_nodes() {
        let mut g = graph();
        g.set(0.0, 0.0, 0.0, Intersect::new(300, 0, 300.0));
        g.set(0.0, 0.0, 90.0, Intersect::new(0, 300, 300.0));
        g.set(0.0, 300.0, 0.0, Intersect::new(300, 300, 300.0));
        let goal = Vec2::new(300.0, 300.0);

        let finder = Pathfinder::new(&g);
        let by_position = finder.find_path(Vec2::ZERO, goal, &SearchOptions::new(10.0));
        assert_eq!(by_position.map(|p| p.len()), Some(3));

        let legacy = SearchOptions::new(10.0).with_identity(NodeIdentity::EdgeDistance);
        assert!(finder.find_path(Vec2::ZERO, goal, &legacy).is_none());
    }

    struct Clear;

    impl RayCaster for Clear {
        fn cast_ray(&self, _: Vec2, _: Vec2, _: f32, _: &RayFilter) -> Option<RaycastHit> {
            None
        }
    }

    struct Blocked;

    impl RayCaster for Blocked {
        fn cast_ray(&self, origin: Vec2, _: Vec2, _: f32, _: &RayFilter) -> Option<RaycastHit> {
            Some(RaycastHit {
                object: ObjectId(99),
                kind: ObjectKind::MapEdge,
                point: origin,
                distance: 1.0,
            })
        }
    }

    #[test]
    fn test_visibility_goal() {
        let g = chain();
        let finder = Pathfinder::new(&g);
        let goal = Vec2::new(200.0, 300.0);
        let options = SearchOptions::new(350.0);

        let seen = finder
            .find_path_to_visibility(Vec2::ZERO, goal, &options, &Clear, None)
            .unwrap();
        assert_eq!(seen.last(), Some(&Intersect::new(200, 0, 200.0)));

        let walked = finder
            .find_path_to_visibility(Vec2::ZERO, goal, &options, &Blocked, None)
            .unwrap();
        assert_eq!(walked.last(), Some(&Intersect::new(200, 300, 300.0)));
    }
}
