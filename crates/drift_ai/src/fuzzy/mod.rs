//! Fuzzy inference
//!
//! Named categories of trapezoidal bins turn raw measurements into
//! membership degrees; rules combine memberships with min (and), max (or)
//! and complement (not).

mod category;
mod environment;
mod logic;
mod rule;

pub use category::{Bin, BinId, BinSpec, Category, CategoryId};
pub use environment::{EntityKey, Environment, Subenv};
pub use logic::{CategorySource, FuzzyLogic};
pub use rule::{term, Rule, RuleArena, RuleExpr, RuleId};
