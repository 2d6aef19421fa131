//! Defensive: hang around our own gate and shoot whoever comes for it

use super::exprs::*;
use super::{
    jump_weight, pick_target, random_aim, AimBuckets, AimReason, BucketChoice, Decision,
    DecisionContext,
};
use crate::error::Result;
use crate::fuzzy::{term, FuzzyLogic, RuleArena, RuleId};
use crate::sensors::categories::*;
use crate::sensors::is_active;
use crate::snapshot::PlayerId;
use crate::state_machine::{BotState, StateKind};
use rand::Rng;

/// Per-mille chance per tick of going back on the attack once the gate is quiet
const CALM_RELEASE_CHANCE: u32 = 10;

struct Rules {
    dangerous: RuleId,
    can_target: RuleId,
    firing_importance: RuleId,
    run_away: RuleId,
    dont_jump: RuleId,
    jump_own_gate: RuleId,
    weapon_fitness: RuleId,
}

pub struct DefensiveState {
    rules: RuleArena,
    ids: Rules,
    next: StateKind,
}

impl DefensiveState {
    /// Build the rules against the categories loaded into `logic`
    pub fn new(logic: &FuzzyLogic) -> Result<Self> {
        let mut rules = RuleArena::new();
        let worth = || close_enough() | other_capturing();

        let ids = Rules {
            dangerous: rules.build(
                logic,
                &!(((term(CAN_SEE_PLAYER, "cant_see") & term(OTHER_HOLDING_GATE, "not_holding"))
                    & term(OTHER_CAN_SEE_ENEMY_GATE, "far_away"))
                    | other_frozen()),
            )?,
            can_target: rules.build(logic, &can_target(worth()))?,
            firing_importance: rules.build(logic, &firing_importance(worth()))?,
            run_away: rules.build(logic, &run_away())?,
            dont_jump: rules.build(logic, &dont_jump())?,
            jump_own_gate: rules.build(
                logic,
                &((term(CAN_SEE_PLAYER, "cant_see") & can_jump_soon())
                    & term(CAN_SEE_MY_GATE, "far_away")),
            )?,
            weapon_fitness: rules.build(logic, &weapon_fitness())?,
        };

        Ok(Self {
            rules,
            ids,
            next: StateKind::Defensive,
        })
    }

    fn buckets(&self, cx: &DecisionContext<'_>, target: PlayerId) -> AimBuckets {
        let eval = |rule| cx.eval(&self.rules, rule, target);
        let fire = (eval(self.ids.dangerous)
            * eval(self.ids.can_target)
            * eval(self.ids.firing_importance)
            * 100.0) as i32;
        AimBuckets {
            fire,
            jump: jump_weight(eval(self.ids.run_away), eval(self.ids.dont_jump), fire),
            goal: (eval(self.ids.jump_own_gate) * 100.0) as i32,
        }
    }

    fn return_to_gate(&self, cx: &mut DecisionContext<'_>) -> Decision {
        let Some(gate) = cx.gate_position(cx.me.team) else {
            return cx.decision(cx.memory.last_aim, AimReason::Jump);
        };

        let direct = cx.aim_at(gate);
        let aim = if cx.me.grabbing {
            cx.path_toward(gate, cx.config.goal_tolerance)
        } else {
            None
        };
        cx.decision(aim.unwrap_or(direct), AimReason::Jump)
    }

    fn transition(&self, cx: &mut DecisionContext<'_>) -> StateKind {
        let Some(own_gate) = cx.snapshot.gate(cx.me.team) else {
            return StateKind::Defensive;
        };
        let radius = cx.gate_radius();

        let threatened = cx.snapshot.opponents_of(cx.me.team).any(|enemy| {
            own_gate.is_engaged_by(enemy.id)
                || (is_active(enemy) && enemy.position.distance(own_gate.position) < radius)
        });

        if !threatened && cx.rng.gen_range(0..1000) < CALM_RELEASE_CHANCE {
            StateKind::Aggressive
        } else {
            StateKind::Defensive
        }
    }
}

impl BotState for DefensiveState {
    fn kind(&self) -> StateKind {
        StateKind::Defensive
    }

    fn on_enter(&mut self) {
        self.next = StateKind::Defensive;
    }

    fn decide(&mut self, cx: &mut DecisionContext<'_>) -> Decision {
        let scores: Vec<(PlayerId, f32)> = cx
            .snapshot
            .opponents_of(cx.me.team)
            .map(|p| {
                let danger = cx.eval(&self.rules, self.ids.dangerous, p.id);
                (p.id, danger * cx.eval(&self.rules, self.ids.can_target, p.id))
            })
            .collect();
        cx.memory.target = pick_target(scores, cx.rng).map(|(id, _)| id);
        cx.choose_weapon(&self.rules, self.ids.weapon_fitness);

        let buckets = cx
            .memory
            .target
            .map_or_else(AimBuckets::default, |target| self.buckets(cx, target));

        if cx.memory.released(cx.me.grabbing) {
            cx.memory.invalidate_path();
        }

        let decision = match cx.draw_bucket(&buckets) {
            BucketChoice::Idle => cx.idle(),
            BucketChoice::Fire => match cx.target() {
                Some(target) => cx.decision(cx.fire_at(target), AimReason::Fire),
                None => cx.idle(),
            },
            BucketChoice::Jump => {
                let aim = if cx.memory.aim_reason != AimReason::Jump {
                    random_aim(cx.rng)
                } else {
                    cx.memory.last_aim
                };
                cx.decision(aim, AimReason::Jump)
            }
            BucketChoice::Goal => self.return_to_gate(cx),
        };

        self.next = self.transition(cx);
        decision
    }

    fn next_state(&self) -> StateKind {
        self.next
    }
}
