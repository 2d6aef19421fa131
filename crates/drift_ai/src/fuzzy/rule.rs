//! Fuzzy rules: an expression builder and the arena they resolve into
//!
//! Rules are written as [`RuleExpr`] values using the `!`, `&` and `|`
//! operators over named terminals, then resolved once against a
//! [`FuzzyLogic`] into a [`RuleArena`] owned by whoever built them.
//!
//! ```ignore
//! let expr = !(term("can_see_player", "cant_see") & term("other_holding_gate", "not_holding"));
//! let dangerous = arena.build(&logic, &expr)?;
//! let value = arena.evaluate(dangerous, &env, EntityKey::player(4));
//! ```

use super::category::{BinId, CategoryId};
use super::environment::{EntityKey, Environment};
use super::logic::FuzzyLogic;
use crate::error::Result;
use std::ops::{BitAnd, BitOr, Not};

/// Unresolved rule expression over category and bin names
#[derive(Debug, Clone, PartialEq)]
pub enum RuleExpr {
    Term { category: String, bin: String },
    And(Box<RuleExpr>, Box<RuleExpr>),
    Or(Box<RuleExpr>, Box<RuleExpr>),
    Not(Box<RuleExpr>),
}

/// Terminal expression: membership of `category`'s `bin`
pub fn term(category: &str, bin: &str) -> RuleExpr {
    RuleExpr::Term {
        category: category.to_string(),
        bin: bin.to_string(),
    }
}

impl BitAnd for RuleExpr {
    type Output = RuleExpr;
    fn bitand(self, rhs: RuleExpr) -> RuleExpr {
        RuleExpr::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for RuleExpr {
    type Output = RuleExpr;
    fn bitor(self, rhs: RuleExpr) -> RuleExpr {
        RuleExpr::Or(Box::new(self), Box::new(rhs))
    }
}

impl Not for RuleExpr {
    type Output = RuleExpr;
    fn not(self) -> RuleExpr {
        RuleExpr::Not(Box::new(self))
    }
}

/// Handle to a node in a [`RuleArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

/// Resolved rule node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Terminal { category: CategoryId, bin: BinId },
    And(RuleId, RuleId),
    Or(RuleId, RuleId),
    Not(RuleId),
}

/// Flat storage for the rule trees of one owner
#[derive(Debug, Clone, Default)]
pub struct RuleArena {
    nodes: Vec<Rule>,
}

impl RuleArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolved node; children must already live in this arena
    pub fn push(&mut self, rule: Rule) -> RuleId {
        let id = RuleId(self.nodes.len() as u32);
        self.nodes.push(rule);
        id
    }

    /// Resolve `expr` against `logic` and store it, returning the root
    pub fn build(&mut self, logic: &FuzzyLogic, expr: &RuleExpr) -> Result<RuleId> {
        let rule = match expr {
            RuleExpr::Term { category, bin } => logic.make_terminal(category, bin)?,
            RuleExpr::And(lhs, rhs) => {
                let lhs = self.build(logic, lhs)?;
                let rhs = self.build(logic, rhs)?;
                Rule::And(lhs, rhs)
            }
            RuleExpr::Or(lhs, rhs) => {
                let lhs = self.build(logic, lhs)?;
                let rhs = self.build(logic, rhs)?;
                Rule::Or(lhs, rhs)
            }
            RuleExpr::Not(operand) => Rule::Not(self.build(logic, operand)?),
        };
        Ok(self.push(rule))
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluate the rule rooted at `id` for `entity`
    ///
    /// # Panics
    ///
    /// Panics if a terminal has no membership in `env`; the environment must be
    /// repopulated for every entity before rules are evaluated against it.
    pub fn evaluate(&self, id: RuleId, env: &Environment, entity: EntityKey) -> f32 {
        match self.nodes[id.0 as usize] {
            Rule::Terminal { category, bin } => {
                env.membership(category, entity, bin).unwrap_or_else(|| {
                    panic!(
                        "fuzzy environment has no membership for {:?}/{:?} of {:?}",
                        category, bin, entity
                    )
                })
            }
            Rule::And(lhs, rhs) => self
                .evaluate(lhs, env, entity)
                .min(self.evaluate(rhs, env, entity)),
            Rule::Or(lhs, rhs) => self
                .evaluate(lhs, env, entity)
                .max(self.evaluate(rhs, env, entity)),
            Rule::Not(operand) => 1.0 - self.evaluate(operand, env, entity),
        }
    }

    /// Like [`evaluate`](Self::evaluate) but `None` when a membership is missing
    pub fn try_evaluate(&self, id: RuleId, env: &Environment, entity: EntityKey) -> Option<f32> {
        match *self.nodes.get(id.0 as usize)? {
            Rule::Terminal { category, bin } => env.membership(category, entity, bin),
            Rule::And(lhs, rhs) => Some(
                self.try_evaluate(lhs, env, entity)?
                    .min(self.try_evaluate(rhs, env, entity)?),
            ),
            Rule::Or(lhs, rhs) => Some(
                self.try_evaluate(lhs, env, entity)?
                    .max(self.try_evaluate(rhs, env, entity)?),
            ),
            Rule::Not(operand) => Some(1.0 - self.try_evaluate(operand, env, entity)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;
    use crate::fuzzy::{Bin, Category};

    /// Two categories "a" and "b", each with one hard bin "on" covering [0, 1]
    fn setup(a: f32, b: f32) -> (FuzzyLogic, Environment) {
        let mut logic = FuzzyLogic::new("Test");
        for name in ["a", "b"] {
            let mut category = Category::new(name);
            category.add_bin("on", Bin::new(1.0, 1.0, 1.0));
            logic.add_category(category);
        }

        // Membership of "on" is the value itself for inputs in [0, 1]
        let mut env = Environment::new();
        env.set_input(logic.category_id("a").unwrap(), EntityKey(1), a);
        env.set_input(logic.category_id("b").unwrap(), EntityKey(1), b);
        logic.apply(&mut env);
        (logic, env)
    }

    fn eval(a: f32, b: f32, expr: RuleExpr) -> f32 {
        let (logic, env) = setup(a, b);
        let mut arena = RuleArena::new();
        let id = arena.build(&logic, &expr).unwrap();
        arena.evaluate(id, &env, EntityKey(1))
    }

    #[test]
    fn test_operators() {
        let grid = [0.0, 0.25, 0.5, 0.75, 1.0];
        for &a in &grid {
            for &b in &grid {
                assert_eq!(eval(a, b, term("a", "on") & term("b", "on")), a.min(b));
                assert_eq!(eval(a, b, term("a", "on") | term("b", "on")), a.max(b));
                assert_eq!(eval(a, b, !term("a", "on")), 1.0 - a);
            }
        }
    }

    #[test]
    fn test_de_morgan() {
        let grid = [0.0, 0.1, 0.3, 0.55, 0.8, 1.0];
        for &a in &grid {
            for &b in &grid {
                let lhs = eval(a, b, !(term("a", "on") & term("b", "on")));
                let rhs = eval(a, b, !term("a", "on") | !term("b", "on"));
                assert_eq!(lhs, rhs);
            }
        }
    }

    #[test]
    fn test_build_rejects_unknown_names() {
        let (logic, _) = setup(0.0, 0.0);
        let mut arena = RuleArena::new();
        assert!(matches!(
            arena.build(&logic, &term("nope", "on")),
            Err(AiError::UnknownCategory(_))
        ));
        assert!(matches!(
            arena.build(&logic, &(term("a", "on") & term("b", "off"))),
            Err(AiError::UnknownBin { .. })
        ));
    }

    #[test]
    fn test_try_evaluate_missing_entity() {
        let (logic, env) = setup(0.5, 0.5);
        let mut arena = RuleArena::new();
        let id = arena.build(&logic, &term("a", "on")).unwrap();
        assert_eq!(arena.try_evaluate(id, &env, EntityKey(1)), Some(0.5));
        assert_eq!(arena.try_evaluate(id, &env, EntityKey(2)), None);
    }

    #[test]
    #[should_panic(expected = "no membership")]
    fn test_evaluate_missing_entity_panics() {
        let (logic, env) = setup(0.5, 0.5);
        let mut arena = RuleArena::new();
        let id = arena.build(&logic, &term("a", "on")).unwrap();
        arena.evaluate(id, &env, EntityKey(99));
    }
}
