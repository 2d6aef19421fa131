//! Aggressive: push for the enemy gate, shoot whoever threatens us on the way

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

struct Rules {
    dangerous: RuleId,
    can_target: RuleId,
    firing_importance: RuleId,
    run_away: RuleId,
    jump_at_gate: RuleId,
    dont_jump: RuleId,
    weapon_fitness: RuleId,
    /// Evaluated on allies: they are capturing while we are not
    holding_gate: RuleId,
}

pub struct AggressiveState {
    rules: RuleArena,
    ids: Rules,
    next: StateKind,
}

impl AggressiveState {
    /// Build the rules against the categories loaded into `logic`
    pub fn new(logic: &FuzzyLogic) -> Result<Self> {
        let mut rules = RuleArena::new();
        let worth = || close_enough() | (other_capturing() | gun_turned_near());

        let ids = Rules {
            dangerous: rules.build(
                logic,
                &!((term(CAN_SEE_PLAYER, "cant_see") & term(OTHER_HOLDING_GATE, "not_holding"))
                    | other_frozen()),
            )?,
            can_target: rules.build(logic, &can_target(worth()))?,
            firing_importance: rules.build(logic, &firing_importance(worth()))?,
            run_away: rules.build(logic, &run_away())?,
            jump_at_gate: rules.build(
                logic,
                &(can_jump_soon()
                    & (!(term(CAN_SEE_ENEMY_GATE, "far_away") | term(CAN_SEE_ENEMY_GATE, "touching"))
                        & (!term(CAN_SEE_ENEMY_GATE, "touching")
                            & term(HOLDING_GATE, "not_holding")))),
            )?,
            dont_jump: rules.build(logic, &dont_jump())?,
            weapon_fitness: rules.build(logic, &weapon_fitness())?,
            holding_gate: rules.build(logic, &(other_capturing() & !capturing_enemy_gate()))?,
        };

        Ok(Self {
            rules,
            ids,
            next: StateKind::Aggressive,
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
            goal: (eval(self.ids.jump_at_gate) * 100.0) as i32,
        }
    }

    /// Leave the current surface somewhere; sometimes toward the enemy gate
    fn explore(&self, cx: &mut DecisionContext<'_>) -> Decision {
        let gate = cx.gate_position(cx.me.team.other());
        let tolerance = cx.config.goal_tolerance;

        let aim = if cx.memory.aim_reason != AimReason::Jump {
            let toward_gate = cx.rng.gen_ratio(1, cx.config.gate_jump_odds.max(1));
            let aim = match gate {
                Some(gate) if toward_gate => cx.aim_at(gate),
                _ => random_aim(cx.rng),
            };
            match gate {
                Some(gate) if cx.me.grabbing => cx.path_toward(gate, tolerance).unwrap_or(aim),
                _ => aim,
            }
        } else if cx.me.grabbing && !cx.memory.path_found {
            gate.and_then(|gate| cx.path_toward(gate, tolerance))
                .unwrap_or(cx.memory.last_aim)
        } else {
            cx.memory.last_aim
        };

        cx.decision(aim, AimReason::Jump)
    }

    /// Head for the enemy gate along the navigation graph
    fn charge_gate(&self, cx: &mut DecisionContext<'_>) -> Decision {
        let Some(gate) = cx.gate_position(cx.me.team.other()) else {
            return cx.decision(cx.memory.last_aim, AimReason::Jump);
        };

        let direct = cx.aim_at(gate);
        // Follow the cached route while it lasts; straight at the gate only without one
        let aim = if cx.memory.path_found {
            cx.memory.path_aim()
        } else {
            cx.path_toward(gate, cx.config.goal_tolerance)
        };
        cx.decision(aim.unwrap_or(direct), AimReason::Jump)
    }

    fn transition(&self, cx: &mut DecisionContext<'_>) -> StateKind {
        let Some(own_gate) = cx.gate_position(cx.me.team) else {
            return StateKind::Aggressive;
        };
        let radius = cx.gate_radius();

        let mut enemy_active = false;
        let mut attackers = 0;
        for enemy in cx.snapshot.opponents_of(cx.me.team).filter(|p| is_active(p)) {
            enemy_active = true;
            if enemy.position.distance(own_gate) < radius {
                attackers += 1;
            }
        }

        let mut ally_capturing = false;
        let mut defenders = 0;
        for ally in cx.snapshot.teammates_of(cx.me.team, cx.me.id) {
            if cx.eval(&self.rules, self.ids.holding_gate, ally.id) > 0.5 {
                ally_capturing = true;
            }
            if ally.position.distance(own_gate) < radius {
                defenders += 1;
            }
        }

        if ally_capturing {
            return if enemy_active {
                StateKind::Seeking
            } else {
                StateKind::Defensive
            };
        }

        let pressure = attackers - defenders;
        if pressure > 0 && cx.rng.gen_range(0..1000) < pressure {
            StateKind::Defensive
        } else {
            StateKind::Aggressive
        }
    }
}

impl BotState for AggressiveState {
    fn kind(&self) -> StateKind {
        StateKind::Aggressive
    }

    fn on_enter(&mut self) {
        self.next = StateKind::Aggressive;
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

        // Replan once we have left the surface
        if cx.memory.released(cx.me.grabbing) {
            cx.memory.invalidate_path();
        }

        let decision = match cx.draw_bucket(&buckets) {
            BucketChoice::Idle => cx.idle(),
            BucketChoice::Fire => match cx.target() {
                Some(target) => cx.decision(cx.fire_at(target), AimReason::Fire),
                None => cx.idle(),
            },
            BucketChoice::Jump => self.explore(cx),
            BucketChoice::Goal => self.charge_gate(cx),
        };

        self.next = self.transition(cx);
        decision
    }

    fn next_state(&self) -> StateKind {
        self.next
    }
}
