//! Sparse map of jump edges keyed by quantized position and launch angle

use crate::error::{AiError, Result};
use drift_math::{normalize_degrees, Vec2};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Number of angle steps in a full turn before granularity is applied
const ANGLE_STEPS: f32 = 8192.0;

/// Capacity of a bucket when its first entry arrives
const INITIAL_BUCKET_CAPACITY: usize = 32;

/// Fewest buckets a map is created with
const MIN_BUCKETS: usize = 16;

/// Coarsest granularity that still leaves two angle buckets per turn
pub const MAX_GRANULARITY: u32 = 12;

/// Where a jump lands and how far it travels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intersect {
    pub x: i32,
    pub y: i32,
    pub dist: f32,
}

impl Intersect {
    /// Create a new intersect
    pub fn new(x: i32, y: i32, dist: f32) -> Self {
        Self { x, y, dist }
    }

    /// Intersect at a world point, truncated to whole units
    pub fn at(point: Vec2, dist: f32) -> Self {
        Self::new(point.x as i32, point.y as i32, dist)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.position().distance(point)
    }
}

/// Quantized `(grid x, grid y, angle bucket)` key
pub type GridKey = (i32, i32, i32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Element {
    key: GridKey,
    value: Intersect,
}

/// Hash map from quantized `(x, y, theta)` to [`Intersect`]
///
/// Positions are bucketed into `2^granularity` unit cells and angles into
/// `2^granularity / 8192` of a turn. Exactly one entry exists per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseIntersectMap {
    granularity: u32,
    buckets: Vec<Vec<Element>>,
    len: usize,
}

impl SparseIntersectMap {
    /// Create a map sized for roughly `estimated_elements` entries
    ///
    /// Granularity is capped at [`MAX_GRANULARITY`].
    pub fn new(granularity: u32, estimated_elements: usize) -> Self {
        let bucket_count = (estimated_elements >> 5).max(MIN_BUCKETS);
        Self {
            granularity: granularity.min(MAX_GRANULARITY),
            buckets: vec![Vec::new(); bucket_count],
            len: 0,
        }
    }

    pub fn granularity(&self) -> u32 {
        self.granularity
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Edge length of a position cell in world units
    pub fn cell_size(&self) -> f32 {
        (1u32 << self.granularity) as f32
    }

    /// Width of an angle bucket in degrees
    pub fn angle_step(&self) -> f32 {
        (1u32 << self.granularity) as f32 * 360.0 / ANGLE_STEPS
    }

    /// Quantize a world position and an angle in degrees
    pub fn quantize(&self, x: f32, y: f32, theta: f32) -> GridKey {
        let g = self.granularity;
        let steps = (normalize_degrees(theta) / 360.0 * ANGLE_STEPS) as i32;
        ((x as i32) >> g, (y as i32) >> g, steps >> g)
    }

    fn bucket_index(&self, key: GridKey) -> usize {
        let mut hash = key.0 as i64 + key.1 as i64 + key.2 as i64;
        if hash < 0 {
            hash = -1 - hash;
        }
        (hash as usize) % self.buckets.len()
    }

    /// Store `value` for the cell containing `(x, y, theta)`, replacing any previous entry
    pub fn set(&mut self, x: f32, y: f32, theta: f32, value: Intersect) {
        let key = self.quantize(x, y, theta);
        let index = self.bucket_index(key);
        let bucket = &mut self.buckets[index];

        if let Some(element) = bucket.iter_mut().find(|e| e.key == key) {
            element.value = value;
            return;
        }

        if bucket.capacity() == 0 {
            bucket.reserve_exact(INITIAL_BUCKET_CAPACITY);
        }
        bucket.push(Element { key, value });
        self.len += 1;
    }

    /// Look up the entry for the cell containing `(x, y, theta)`
    pub fn get(&self, x: f32, y: f32, theta: f32) -> Option<Intersect> {
        let key = self.quantize(x, y, theta);
        self.buckets[self.bucket_index(key)]
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value)
    }

    pub fn contains(&self, x: f32, y: f32, theta: f32) -> bool {
        self.get(x, y, theta).is_some()
    }

    /// Iterate over every stored `(key, value)`
    pub fn iter(&self) -> impl Iterator<Item = (GridKey, Intersect)> + '_ {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter().map(|e| (e.key, e.value)))
    }

    /// Encode the map into `writer`
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    /// Decode a map previously written with [`write_to`](Self::write_to)
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let map: Self = bincode::deserialize_from(reader)?;
        map.check()?;
        Ok(map)
    }

    /// Reject decoded maps that would misbehave on lookup
    pub(crate) fn check(&self) -> Result<()> {
        if self.granularity > MAX_GRANULARITY {
            return Err(AiError::CacheMismatch(format!(
                "granularity {} is above {}",
                self.granularity, MAX_GRANULARITY
            )));
        }
        if self.buckets.is_empty() {
            return Err(AiError::CacheMismatch("graph has no buckets".to_string()));
        }
        let stored: usize = self.buckets.iter().map(Vec::len).sum();
        if stored != self.len {
            return Err(AiError::CacheMismatch(format!(
                "graph claims {} entries but holds {}",
                self.len, stored
            )));
        }
        Ok(())
    }
}

impl Default for SparseIntersectMap {
    fn default() -> Self {
        Self::new(5, 1_000_000)
    }
}
