//! Seeking: hunt down one enemy while an ally works on their gate

use super::exprs::*;
use super::{pick_target, random_aim, AimBuckets, AimReason, BucketChoice, Decision, DecisionContext};
use crate::error::Result;
use crate::fuzzy::{term, FuzzyLogic, RuleArena, RuleId};
use crate::sensors::categories::*;
use crate::snapshot::PlayerId;
use crate::state_machine::{BotState, StateKind};

/// Goodness multiplier that keeps the bot on its current target
const INCUMBENT_BONUS: f32 = 10.0;

struct Rules {
    good_target: RuleId,
    easy_target: RuleId,
    dangerous: RuleId,
    can_target: RuleId,
    firing_importance: RuleId,
    jump_at_enemy: RuleId,
    weapon_fitness: RuleId,
}

pub struct SeekingState {
    rules: RuleArena,
    ids: Rules,
    next: StateKind,
}

impl SeekingState {
    /// Build the rules against the categories loaded into `logic`
    pub fn new(logic: &FuzzyLogic) -> Result<Self> {
        let mut rules = RuleArena::new();
        let worth = || close_enough() | (other_capturing() | gun_turned_near());

        let ids = Rules {
            good_target: rules.build(logic, &!other_frozen())?,
            easy_target: rules.build(
                logic,
                &(term(OTHER_ENERGY_PERCENT, "almost_frozen") | term(OTHER_ENERGY_PERCENT, "damaged")),
            )?,
            dangerous: rules.build(
                logic,
                &(!term(OTHER_CAN_SEE_ENEMY_GATE, "far_away") | other_capturing()),
            )?,
            can_target: rules.build(logic, &can_target(worth()))?,
            firing_importance: rules.build(logic, &firing_importance(worth()))?,
            jump_at_enemy: rules.build(
                logic,
                &((can_jump_soon() & term(TIME_TO_IMPACT, "already_grabbing"))
                    & term(CAN_SEE_PLAYER, "cant_see")),
            )?,
            weapon_fitness: rules.build(logic, &weapon_fitness())?,
        };

        Ok(Self {
            rules,
            ids,
            next: StateKind::Seeking,
        })
    }

    fn score(&self, cx: &DecisionContext<'_>, player: PlayerId) -> f32 {
        let eval = |rule| cx.eval(&self.rules, rule, player);
        let mut good = eval(self.ids.good_target);
        if cx.memory.target == Some(player) {
            good *= INCUMBENT_BONUS;
        }
        good + good * (eval(self.ids.easy_target) + eval(self.ids.dangerous))
    }

    fn buckets(&self, cx: &DecisionContext<'_>, target: PlayerId) -> AimBuckets {
        let eval = |rule| cx.eval(&self.rules, rule, target);
        AimBuckets {
            fire: (eval(self.ids.good_target)
                * eval(self.ids.can_target)
                * eval(self.ids.firing_importance)
                * 100.0) as i32,
            jump: 0,
            goal: (eval(self.ids.jump_at_enemy) * 100.0) as i32,
        }
    }

    /// Jump somewhere the target can be seen from
    fn hunt(&self, cx: &mut DecisionContext<'_>) -> Decision {
        let Some(target) = cx.target() else {
            let aim = random_aim(cx.rng);
            return cx.decision(aim, AimReason::Jump);
        };

        let aim = if !cx.memory.path_found && cx.me.grabbing {
            cx.path_to_sight_of(target.position, cx.config.visibility_tolerance)
                .unwrap_or(cx.memory.last_aim)
        } else {
            cx.memory.last_aim
        };
        cx.decision(aim, AimReason::Jump)
    }

    fn transition(&self, cx: &DecisionContext<'_>) -> StateKind {
        let ally_capturing = cx.snapshot.gate(cx.me.team.other()).map_or(false, |gate| {
            cx.snapshot
                .teammates_of(cx.me.team, cx.me.id)
                .any(|ally| gate.is_engaged_by(ally.id))
        });

        if ally_capturing {
            StateKind::Seeking
        } else {
            StateKind::Aggressive
        }
    }
}

impl BotState for SeekingState {
    fn kind(&self) -> StateKind {
        StateKind::Seeking
    }

    fn on_enter(&mut self) {
        self.next = StateKind::Seeking;
    }

    fn decide(&mut self, cx: &mut DecisionContext<'_>) -> Decision {
        let scores: Vec<(PlayerId, f32)> = cx
            .snapshot
            .opponents_of(cx.me.team)
            .map(|p| (p.id, self.score(cx, p.id)))
            .collect();
        cx.memory.target = pick_target(scores, cx.rng)
            .filter(|&(_, score)| score > 0.0)
            .map(|(id, _)| id);
        cx.choose_weapon(&self.rules, self.ids.weapon_fitness);

        let buckets = cx
            .memory
            .target
            .map_or_else(AimBuckets::default, |target| self.buckets(cx, target));

        // Replan once we have caught a new surface
        if cx.memory.landed(cx.me.grabbing) {
            cx.memory.invalidate_path();
        }

        let decision = match cx.draw_bucket(&buckets) {
            BucketChoice::Idle => cx.idle(),
            BucketChoice::Fire => match cx.target() {
                Some(target) => cx.decision(cx.fire_at(target), AimReason::Fire),
                None => cx.idle(),
            },
            BucketChoice::Jump | BucketChoice::Goal => self.hunt(cx),
        };

        self.next = self.transition(cx);
        decision
    }

    fn next_state(&self) -> StateKind {
        self.next
    }
}
