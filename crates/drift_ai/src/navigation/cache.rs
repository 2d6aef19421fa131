//! On-disk cache of finished navigation maps, one file per arena
//!
//! Writes are atomic (temp file, then rename). A cache that cannot be read,
//! was written by another format version, was built with a different
//! granularity or decodes into a malformed graph is treated as absent by the
//! graph builder.

use super::intersect_map::SparseIntersectMap;
use crate::error::{AiError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File extension of cached maps
const EXTENSION: &str = "navgraph";

#[derive(Serialize, Deserialize)]
struct CachedGraph {
    version: u32,
    map_name: String,
    graph: SparseIntersectMap,
}

impl CachedGraph {
    const VERSION: u32 = 1;
}

/// Directory of cached navigation maps
#[derive(Debug, Clone)]
pub struct NavCache {
    dir: PathBuf,
}

impl NavCache {
    /// Create a cache rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache file for `map_name`
    pub fn path_for(&self, map_name: &str) -> PathBuf {
        let stem: String = map_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.{}", stem, EXTENSION))
    }

    pub fn exists(&self, map_name: &str) -> bool {
        self.path_for(map_name).exists()
    }

    /// Read the cached map for `map_name`, checking it was built with `granularity`
    pub fn load(&self, map_name: &str, granularity: u32) -> Result<SparseIntersectMap> {
        let path = self.path_for(map_name);
        let reader = BufReader::new(File::open(&path)?);
        let cached: CachedGraph = bincode::deserialize_from(reader)?;

        if cached.version != CachedGraph::VERSION {
            return Err(AiError::CacheVersion {
                expected: CachedGraph::VERSION,
                got: cached.version,
            });
        }
        if cached.map_name != map_name {
            return Err(AiError::CacheMismatch(format!(
                "file {:?} belongs to map '{}'",
                path, cached.map_name
            )));
        }
        if cached.graph.granularity() != granularity {
            return Err(AiError::CacheMismatch(format!(
                "granularity {} does not match {}",
                cached.graph.granularity(),
                granularity
            )));
        }
        cached.graph.check()?;

        log::info!(
            "Loaded navigation cache {:?}: {} entries",
            path,
            cached.graph.len()
        );
        Ok(cached.graph)
    }

    /// Write `graph` as the cached map for `map_name`
    pub fn store(&self, map_name: &str, graph: &SparseIntersectMap) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let final_path = self.path_for(map_name);
        let temp_path = final_path.with_extension(format!("{}.tmp", EXTENSION));

        let cached = CachedGraph {
            version: CachedGraph::VERSION,
            map_name: map_name.to_string(),
            graph: graph.clone(),
        };

        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            bincode::serialize_into(&mut writer, &cached)?;
            writer.flush()?;
        }

        // Atomic rename
        fs::rename(&temp_path, &final_path)?;

        log::info!(
            "Wrote navigation cache {:?}: {} entries",
            final_path,
            graph.len()
        );
        Ok(())
    }

    /// Delete the cached map for `map_name`, if any
    pub fn remove(&self, map_name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(map_name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
