//! Drift AI - Fuzzy Bots for the Drift Arena
//!
//! Decision making and jump navigation for computer-controlled players in
//! a zero-gravity arena. Players cling to surfaces, push off to fly in a
//! straight line and shoot at each other while trying to capture the
//! opposing team's gate.
//!
//! # Features
//!
//! - Fuzzy categories with trapezoidal bins and rule trees over them
//! - Per-tick sensor readings keyed by player and by (player, weapon)
//! - Aggressive, Defensive and Seeking behavior states on a small FSM
//! - A sparse grid of precomputed jump landings, cached on disk
//! - A* over that grid, toward a point or toward visibility of one
//! - Bounded gun rotation turning decisions into controls
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   readings   ┌─────────────┐
//! │   Sensors    │ ───────────▶ │ Environment │
//! └──────────────┘              └─────────────┘
//!        ▲                             │ memberships
//!        │ rays                        ▼
//! ┌──────────────┐              ┌─────────────┐  Decision  ┌───────────────┐
//! │ PhysicsWorld │              │ StateMachine│ ─────────▶ │ AimController │
//! └──────────────┘              └─────────────┘            └───────────────┘
//!        │ surfaces                    │ paths
//!        ▼                             ▼
//! ┌──────────────┐   graph      ┌─────────────┐
//! │  MapGrapher  │ ───────────▶ │ Pathfinder  │
//! └──────────────┘              └─────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use drift_ai::prelude::*;
//!
//! let profile = FuzzyProfile::standard();
//! let brain = BotBrain::new(1, AiConfig::default(), &profile)?;
//! let mut bot = Bot::new(brain, AimConfig::default());
//!
//! let mut grapher = MapGrapher::new(GrapherConfig::default())?;
//! grapher.load_map(&snapshot.map, &world);
//! grapher.map_all(&world);
//!
//! let view = WorldView::new(&snapshot, &world).with_graph(Some(grapher.graph()));
//! let controls = bot.tick(&view, now_ms);
//! ```

pub mod agent;
pub mod aim;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod navigation;
pub mod sensors;
pub mod snapshot;
pub mod state_machine;
pub mod states;

#[cfg(test)]
pub(crate) mod test_support;

pub mod prelude {
    //! Common imports for driving bots
    pub use crate::agent::{populate_environment, Bot, BotBrain, WorldView};
    pub use crate::aim::{AimController, Controls};
    pub use crate::config::{AiConfig, AimConfig, FuzzyProfile, GrapherConfig, BOT_SECTION};
    pub use crate::error::{AiError, Result};
    pub use crate::fuzzy::{
        term, CategorySource, EntityKey, Environment, FuzzyLogic, RuleArena, RuleExpr, RuleId,
    };
    pub use crate::navigation::{
        AvoidArea, Intersect, MapGrapher, MapStats, NavCache, NodeIdentity, Pathfinder,
        SearchOptions, SparseIntersectMap,
    };
    pub use crate::sensors::Sensors;
    pub use crate::snapshot::{
        GameSnapshot, GateView, MapInfo, PlayerId, PlayerView, Team, WeaponId, WeaponView,
    };
    pub use crate::state_machine::{BotState, StateKind, StateMachine};
    pub use crate::states::{AgentMemory, AimReason, Decision, DecisionContext};
}

pub use prelude::*;
