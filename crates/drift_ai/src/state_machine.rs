//! Finite state machine over the bot's behavior states

use crate::error::{AiError, Result};
use crate::states::{Decision, DecisionContext};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Names of the behavior states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateKind {
    Aggressive,
    Defensive,
    Seeking,
}

impl StateKind {
    pub fn name(self) -> &'static str {
        match self {
            StateKind::Aggressive => "aggressive",
            StateKind::Defensive => "defensive",
            StateKind::Seeking => "seeking",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A behavior state
///
/// Each state owns its rules. `decide` runs once per tick while the state
/// is current and also settles which state should run next tick.
pub trait BotState {
    fn kind(&self) -> StateKind;

    /// Called when the machine switches into this state
    fn on_enter(&mut self) {}

    /// Pick target, weapon and aim for this tick
    fn decide(&mut self, cx: &mut DecisionContext<'_>) -> Decision;

    /// State to run next tick, as settled by the last `decide`
    fn next_state(&self) -> StateKind;
}

/// Finite State Machine
pub struct StateMachine {
    /// Registered states
    states: HashMap<StateKind, Box<dyn BotState>>,
    /// Current state
    current: StateKind,
    /// Previous state
    previous: Option<StateKind>,
}

impl StateMachine {
    /// Create a new state machine starting in `initial`
    pub fn new(states: Vec<Box<dyn BotState>>, initial: StateKind) -> Result<Self> {
        let states: HashMap<_, _> = states.into_iter().map(|s| (s.kind(), s)).collect();
        if !states.contains_key(&initial) {
            return Err(AiError::MissingState(initial.to_string()));
        }

        let mut fsm = Self {
            states,
            current: initial,
            previous: None,
        };
        if let Some(state) = fsm.states.get_mut(&initial) {
            state.on_enter();
        }
        Ok(fsm)
    }

    /// Create a state machine starting in a uniformly random registered state
    pub fn with_random_start<R: Rng>(states: Vec<Box<dyn BotState>>, rng: &mut R) -> Result<Self> {
        let mut kinds: Vec<StateKind> = states.iter().map(|s| s.kind()).collect();
        kinds.sort();
        kinds.dedup();
        let initial = *kinds
            .choose(rng)
            .ok_or_else(|| AiError::MissingState("<any>".to_string()))?;
        Self::new(states, initial)
    }

    /// Get current state
    pub fn current(&self) -> StateKind {
        self.current
    }

    /// Get previous state
    pub fn previous(&self) -> Option<StateKind> {
        self.previous
    }

    /// Check if in a specific state
    pub fn is_in(&self, state: StateKind) -> bool {
        self.current == state
    }

    /// Number of registered states
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Force transition to a state; unknown states are ignored
    pub fn force_transition(&mut self, to: StateKind) {
        let Some(state) = self.states.get_mut(&to) else {
            log::warn!("Ignoring transition to unregistered state {}", to);
            return;
        };
        log::debug!("Behavior state {} -> {}", self.current, to);
        state.on_enter();
        self.previous = Some(self.current);
        self.current = to;
    }

    /// Run the current state for one tick, then follow its transition
    pub fn update(&mut self, cx: &mut DecisionContext<'_>) -> Decision {
        let (decision, next) = match self.states.get_mut(&self.current) {
            Some(state) => {
                let decision = state.decide(cx);
                (decision, state.next_state())
            }
            None => (Decision::idle(cx.memory), self.current),
        };

        if next != self.current {
            self.force_transition(next);
        }
        decision
    }
}
