//! Jump navigation: graph storage, construction, caching and search

mod cache;
mod grapher;
mod intersect_map;
mod pathfinder;

pub use cache::NavCache;
pub use grapher::{MapGrapher, MapStats};
pub use intersect_map::{GridKey, Intersect, SparseIntersectMap, MAX_GRANULARITY};
pub use pathfinder::{AvoidArea, NodeIdentity, Pathfinder, SearchOptions};
