//! Bins and categories

use super::environment::Subenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a category inside a [`FuzzyLogic`](super::FuzzyLogic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub(crate) usize);

/// Index of a bin inside its category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinId(pub(crate) usize);

/// One configured bin, as it appears in a fuzzy profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    pub name: String,
    pub start: f32,
    pub end: f32,
    /// Width of the linear ramps on either side; 0 is a hard step
    #[serde(default)]
    pub grade: f32,
}

impl BinSpec {
    /// Create a new bin spec
    pub fn new(name: impl Into<String>, start: f32, end: f32, grade: f32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            grade,
        }
    }
}

/// Trapezoidal membership function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f32,
    pub end: f32,
    pub grade_width: f32,
}

impl Bin {
    /// Create a new bin
    pub fn new(start: f32, end: f32, grade_width: f32) -> Self {
        Self {
            start,
            end,
            grade_width,
        }
    }

    /// Degree in `[0, 1]` to which `value` belongs to this bin
    pub fn membership(&self, value: f32) -> f32 {
        let grade = self.grade_width;
        if value >= self.start && value <= self.end {
            1.0
        } else if grade <= 0.0 {
            0.0
        } else if value > self.end {
            if value <= self.end + grade {
                (self.end + grade - value) / grade
            } else {
                0.0
            }
        } else if value >= self.start - grade {
            (value - self.start + grade) / grade
        } else {
            0.0
        }
    }
}

impl From<&BinSpec> for Bin {
    fn from(spec: &BinSpec) -> Self {
        Self::new(spec.start, spec.end, spec.grade)
    }
}

/// A named, ordered set of bins over one measured feature
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    bins: Vec<Bin>,
    bin_ids: HashMap<String, BinId>,
}

impl Category {
    /// Create an empty category
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bins: Vec::new(),
            bin_ids: HashMap::new(),
        }
    }

    /// Build a category from configured bins, in order
    pub fn from_specs(name: impl Into<String>, specs: &[BinSpec]) -> Self {
        let mut category = Self::new(name);
        for spec in specs {
            category.add_bin(&spec.name, Bin::from(spec));
        }
        category
    }

    /// Append a bin; a repeated name replaces the earlier bin
    pub fn add_bin(&mut self, name: &str, bin: Bin) -> BinId {
        if bin.start > bin.end {
            log::warn!(
                "Fuzzy bin {}.{} starts after it ends ({} > {})",
                self.name,
                name,
                bin.start,
                bin.end
            );
        }
        if bin.grade_width < 0.0 {
            log::warn!("Fuzzy bin {}.{} has a negative grade", self.name, name);
        }

        if let Some(&id) = self.bin_ids.get(name) {
            self.bins[id.0] = bin;
            return id;
        }

        let id = BinId(self.bins.len());
        self.bins.push(bin);
        self.bin_ids.insert(name.to_string(), id);
        id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a bin by name
    pub fn bin_id(&self, name: &str) -> Option<BinId> {
        self.bin_ids.get(name).copied()
    }

    pub fn bin(&self, id: BinId) -> Option<&Bin> {
        self.bins.get(id.0)
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Compute every bin's membership for every input stored in `subenv`
    pub fn apply(&self, subenv: Subenv<'_>) {
        let Subenv {
            category,
            inputs,
            memberships,
        } = subenv;

        let Some(inputs) = inputs else {
            return;
        };

        for (&entity, &value) in inputs {
            for (index, bin) in self.bins.iter().enumerate() {
                memberships.insert((category, entity, BinId(index)), bin.membership(value));
            }
        }
    }
}
