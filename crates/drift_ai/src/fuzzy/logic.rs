//! Category registry and evaluation driver

use super::category::{BinSpec, Category, CategoryId};
use super::environment::Environment;
use super::rule::Rule;
use crate::error::{AiError, Result};
use std::collections::HashMap;

/// Supplies the configured bins of a category
pub trait CategorySource {
    /// Ordered bins of `category` under `section`, if configured
    fn bins(&self, section: &str, category: &str) -> Option<&[BinSpec]>;
}

/// A set of loaded categories
///
/// Categories are loaded once at construction; afterwards the logic is only
/// read, by [`apply`](Self::apply) and by rule construction.
#[derive(Debug, Clone)]
pub struct FuzzyLogic {
    section: String,
    categories: Vec<Category>,
    ids: HashMap<String, CategoryId>,
}

impl FuzzyLogic {
    /// Create a logic that loads categories from `section` of a profile
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            categories: Vec::new(),
            ids: HashMap::new(),
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    /// Register a category; a repeated name replaces the earlier one in place
    pub fn add_category(&mut self, category: Category) -> CategoryId {
        if let Some(&id) = self.ids.get(category.name()) {
            self.categories[id.0] = category;
            return id;
        }
        let id = CategoryId(self.categories.len());
        self.ids.insert(category.name().to_string(), id);
        self.categories.push(category);
        id
    }

    /// Load one category from `source`
    pub fn load_category(&mut self, source: &dyn CategorySource, name: &str) -> Result<CategoryId> {
        let specs = source
            .bins(&self.section, name)
            .ok_or_else(|| AiError::MissingCategory {
                section: self.section.clone(),
                category: name.to_string(),
            })?;

        if specs.is_empty() {
            log::warn!("Fuzzy category {}.{} has no bins", self.section, name);
        }

        log::debug!("Loaded fuzzy category {}.{} ({} bins)", self.section, name, specs.len());
        Ok(self.add_category(Category::from_specs(name, specs)))
    }

    /// Load every category in `names`
    pub fn load_categories(&mut self, source: &dyn CategorySource, names: &[&str]) -> Result<()> {
        for name in names {
            self.load_category(source, name)?;
        }
        Ok(())
    }

    /// Look up a category by name
    pub fn category_id(&self, name: &str) -> Result<CategoryId> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| AiError::UnknownCategory(name.to_string()))
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(id.0)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Resolve a `(category, bin)` pair into a terminal rule
    pub fn make_terminal(&self, category: &str, bin: &str) -> Result<Rule> {
        let id = self.category_id(category)?;
        let bin_id = self.categories[id.0]
            .bin_id(bin)
            .ok_or_else(|| AiError::UnknownBin {
                category: category.to_string(),
                bin: bin.to_string(),
            })?;
        Ok(Rule::Terminal {
            category: id,
            bin: bin_id,
        })
    }

    /// Compute memberships for every input in `env`
    pub fn apply(&self, env: &mut Environment) {
        for (index, category) in self.categories.iter().enumerate() {
            category.apply(env.subenv(CategoryId(index)));
        }
    }
}
