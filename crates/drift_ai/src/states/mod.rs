//! Behavior states and the decision machinery they share
//!
//! Every state follows the same tick: pick a target among the opponents,
//! maybe switch weapons, then split its attention into aim buckets (fire,
//! jump, goal) and draw one of them. What differs per state is the rule set
//! and where "goal" points.

mod aggressive;
mod defensive;
mod seeking;

pub use aggressive::AggressiveState;
pub use defensive::DefensiveState;
pub use seeking::SeekingState;

use crate::config::AiConfig;
use crate::fuzzy::{EntityKey, Environment, RuleArena, RuleId};
use crate::navigation::{AvoidArea, Intersect, Pathfinder, SearchOptions, SparseIntersectMap};
use crate::snapshot::{GameSnapshot, PlayerId, PlayerView, Team, WeaponId};
use drift_math::{consts::PI, radians, Vec2};
use drift_physics::{RayCaster, RayFilter};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Fitness at or above which the equipped weapon is strongly preferred
const KEEP_WEAPON_FITNESS: f32 = 0.95;

/// Weight multiplier for keeping a fit weapon
const KEEP_WEAPON_BIAS: f32 = 50.0;

/// Fraction of the map diagonal that counts as "near a gate"
const GATE_RADIUS_FRACTION: f32 = 0.25;

/// Why the bot wants its gun pointed where it is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AimReason {
    #[default]
    DoNothing,
    Fire,
    Jump,
}

/// What a bot wants this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Desired gun rotation, radians
    pub aim: f32,
    pub reason: AimReason,
    pub weapon: WeaponId,
}

impl Decision {
    /// Keep the last aim and do nothing
    pub fn idle(memory: &AgentMemory) -> Self {
        Self {
            aim: memory.last_aim,
            reason: AimReason::DoNothing,
            weapon: memory.wanted_weapon.unwrap_or_default(),
        }
    }
}

/// Everything a bot remembers between ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentMemory {
    /// Aim of the previous decision
    pub last_aim: f32,
    /// Reason of the previous decision
    pub aim_reason: AimReason,
    pub wanted_weapon: Option<WeaponId>,
    pub last_action_ms: u64,
    pub last_weapon_switch_ms: Option<u64>,
    pub target: Option<PlayerId>,
    /// Anchor the cached path was planned from
    pub path_start: Vec2,
    pub path: Vec<Intersect>,
    /// The cached path is still the one to follow
    pub path_found: bool,
    pub was_grabbing: bool,
    /// Offset added to aim when firing
    pub aim_inaccuracy: f32,
}

impl AgentMemory {
    /// Cache a freshly found path; returns the aim toward its first jump
    pub fn adopt_path(&mut self, start: Vec2, path: Vec<Intersect>) -> Option<f32> {
        self.path_start = start;
        self.path = path;
        self.path_found = true;
        self.path_aim()
    }

    /// Aim toward the first jump of the cached path, if it has one
    pub fn path_aim(&self) -> Option<f32> {
        self.path
            .get(1)
            .map(|hop| self.path_start.angle_to(hop.position()))
    }

    pub fn invalidate_path(&mut self) {
        self.path_found = false;
    }

    /// Area around the launch point of the cached path
    pub fn avoid_area(&self, config: &AiConfig) -> Option<AvoidArea> {
        self.path.first().map(|node| {
            AvoidArea::new(node.position(), config.avoid_area_radius, config.avoid_area_weight)
        })
    }

    /// Let go of a surface since last tick
    pub fn released(&self, grabbing: bool) -> bool {
        self.was_grabbing && !grabbing
    }

    /// Caught a surface since last tick
    pub fn landed(&self, grabbing: bool) -> bool {
        !self.was_grabbing && grabbing
    }

    pub fn idle_expired(&self, now_ms: u64, allowed_idle_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_action_ms) > allowed_idle_ms
    }

    pub fn weapon_switch_allowed(&self, now_ms: u64, interval_ms: u64) -> bool {
        self.last_weapon_switch_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= interval_ms)
    }
}

// ==================== Aim buckets ====================

/// Integer weights of the three things a bot can do with its aim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AimBuckets {
    pub fire: i32,
    pub jump: i32,
    pub goal: i32,
}

/// Outcome of drawing from [`AimBuckets`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketChoice {
    Idle,
    Fire,
    Jump,
    Goal,
}

impl AimBuckets {
    /// Sum of all buckets, never below 1
    pub fn total(&self) -> i32 {
        (self.fire + self.jump + self.goal).max(1)
    }

    /// Select a bucket with `draw` in `[0, total)`
    ///
    /// Below `min_total` the bot idles, unless it has idled too long, in
    /// which case the slot right after the fire bucket is taken.
    pub fn choose(&self, idle_expired: bool, min_total: i32, draw: i32) -> BucketChoice {
        let slot = if self.total() < min_total {
            if !idle_expired {
                return BucketChoice::Idle;
            }
            self.fire + 1
        } else {
            draw
        };

        if slot < self.fire {
            BucketChoice::Fire
        } else if slot < self.fire + self.jump {
            BucketChoice::Jump
        } else {
            BucketChoice::Goal
        }
    }
}

// ==================== Weighted picks ====================

/// Integer weight of a weapon from its fitness
pub fn weapon_weight(fitness: f32, equipped: bool) -> u32 {
    let fitness = if equipped && fitness >= KEEP_WEAPON_FITNESS {
        fitness * KEEP_WEAPON_BIAS
    } else {
        fitness
    };
    (fitness * 100.0).round().max(0.0) as u32
}

/// Index whose cumulative weight range contains `draw`
pub fn pick_weighted(weights: &[u32], draw: u32) -> Option<usize> {
    let mut cumulative = 0u32;
    for (i, &weight) in weights.iter().enumerate() {
        cumulative += weight;
        if draw < cumulative {
            return Some(i);
        }
    }
    None
}

/// Highest scoring candidate; an exact tie replaces the incumbent on a coin flip
pub fn pick_target<R: Rng>(
    scores: impl IntoIterator<Item = (PlayerId, f32)>,
    rng: &mut R,
) -> Option<(PlayerId, f32)> {
    let mut best: Option<(PlayerId, f32)> = None;
    for (id, score) in scores {
        best = match best {
            None => Some((id, score)),
            Some((_, best_score)) if score > best_score => Some((id, score)),
            Some((_, best_score)) if score == best_score && rng.gen_bool(0.5) => Some((id, score)),
            keep => keep,
        };
    }
    best
}

/// Uniformly random whole-degree aim
pub fn random_aim<R: Rng>(rng: &mut R) -> f32 {
    radians(rng.gen_range(-180..180) as f32)
}

// ==================== Context ====================

/// Path queries on behalf of one bot
#[derive(Clone, Copy)]
pub struct Navigator<'a> {
    graph: Option<&'a SparseIntersectMap>,
    caster: &'a dyn RayCaster,
    probe_distance: f32,
    max_expansions: Option<usize>,
}

impl<'a> Navigator<'a> {
    /// Create a navigator; without a graph every search fails
    pub fn new(graph: Option<&'a SparseIntersectMap>, caster: &'a dyn RayCaster, config: &AiConfig) -> Self {
        Self {
            graph,
            caster,
            probe_distance: config.anchor_probe_distance,
            max_expansions: config.max_search_expansions,
        }
    }

    /// Surface point `me` is holding on to, or its position if nothing is in reach
    pub fn anchor(&self, me: &PlayerView) -> Vec2 {
        let filter = RayFilter::default()
            .ignoring(me.object)
            .solid_only()
            .static_only();

        (0..8)
            .filter_map(|i| {
                self.caster
                    .cast_ray_at(me.position, i as f32 * PI / 4.0, self.probe_distance, &filter)
            })
            .min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal))
            .map_or(me.position, |hit| hit.point)
    }

    fn options(&self, tolerance: f32, avoid: Option<AvoidArea>) -> SearchOptions {
        let options = SearchOptions::new(tolerance).with_max_expansions(self.max_expansions);
        match avoid {
            Some(area) => options.with_avoid_area(area),
            None => options,
        }
    }

    /// Path from the anchor of `me` to within `tolerance` of `goal`
    pub fn find_path(
        &self,
        me: &PlayerView,
        goal: Vec2,
        tolerance: f32,
        avoid: Option<AvoidArea>,
    ) -> Option<(Vec2, Vec<Intersect>)> {
        let graph = self.graph?;
        let start = self.anchor(me);
        Pathfinder::new(graph)
            .find_path(start, goal, &self.options(tolerance, avoid))
            .map(|path| (start, path))
    }

    /// Path from the anchor of `me` to a spot within `tolerance` that sees `goal`
    pub fn find_path_to_visibility(
        &self,
        me: &PlayerView,
        goal: Vec2,
        tolerance: f32,
        avoid: Option<AvoidArea>,
    ) -> Option<(Vec2, Vec<Intersect>)> {
        let graph = self.graph?;
        let start = self.anchor(me);
        Pathfinder::new(graph)
            .find_path_to_visibility(
                start,
                goal,
                &self.options(tolerance, avoid),
                self.caster,
                Some(me.object),
            )
            .map(|path| (start, path))
    }
}

/// What a state sees and may change while deciding
pub struct DecisionContext<'a> {
    pub me: &'a PlayerView,
    pub snapshot: &'a GameSnapshot,
    pub env: &'a Environment,
    pub config: &'a AiConfig,
    pub memory: &'a mut AgentMemory,
    pub rng: &'a mut StdRng,
    pub navigator: Navigator<'a>,
    pub now_ms: u64,
}

impl<'a> DecisionContext<'a> {
    /// Evaluate `rule` for a player
    pub fn eval(&self, rules: &RuleArena, rule: RuleId, player: PlayerId) -> f32 {
        rules.evaluate(rule, self.env, EntityKey::player(player))
    }

    /// The remembered target, if still in the game
    pub fn target(&self) -> Option<&'a PlayerView> {
        self.memory.target.and_then(|id| self.snapshot.player(id))
    }

    pub fn gate_position(&self, team: Team) -> Option<Vec2> {
        self.snapshot.gate(team).map(|gate| gate.position)
    }

    /// Aim straight at `point`
    pub fn aim_at(&self, point: Vec2) -> f32 {
        self.me.position.angle_to(point)
    }

    /// Aim at a target, off by the bot's current inaccuracy
    pub fn fire_at(&self, target: &PlayerView) -> f32 {
        self.aim_at(target.position) + self.memory.aim_inaccuracy
    }

    /// Radius around a gate within which players count as near it
    pub fn gate_radius(&self) -> f32 {
        self.snapshot.map.diagonal() * GATE_RADIUS_FRACTION
    }

    /// Draw a bucket, honoring the idle rules
    pub fn draw_bucket(&mut self, buckets: &AimBuckets) -> BucketChoice {
        let draw = self.rng.gen_range(0..buckets.total());
        let idle_expired = self
            .memory
            .idle_expired(self.now_ms, self.config.allowed_idle_ms);
        let choice = buckets.choose(idle_expired, self.config.min_action_total, draw);
        if choice != BucketChoice::Idle {
            self.memory.last_action_ms = self.now_ms;
        }
        choice
    }

    pub fn decision(&self, aim: f32, reason: AimReason) -> Decision {
        Decision {
            aim,
            reason,
            weapon: self.memory.wanted_weapon.unwrap_or(self.me.current_weapon),
        }
    }

    pub fn idle(&self) -> Decision {
        self.decision(self.memory.last_aim, AimReason::DoNothing)
    }

    /// Plan a path toward `goal`; the aim along its first jump on success
    pub fn path_toward(&mut self, goal: Vec2, tolerance: f32) -> Option<f32> {
        let avoid = self.memory.avoid_area(self.config);
        let (start, path) = self.navigator.find_path(self.me, goal, tolerance, avoid)?;
        self.memory.adopt_path(start, path)
    }

    /// Plan a path to a spot that sees `goal`; the aim along its first jump on success
    pub fn path_to_sight_of(&mut self, goal: Vec2, tolerance: f32) -> Option<f32> {
        let avoid = self.memory.avoid_area(self.config);
        let (start, path) = self
            .navigator
            .find_path_to_visibility(self.me, goal, tolerance, avoid)?;
        self.memory.adopt_path(start, path)
    }

    /// Re-evaluate the weapon choice against the current target
    ///
    /// Throttled to one switch per configured interval. Weights come from
    /// `fitness` evaluated for each (target, weapon) pair.
    pub fn choose_weapon(&mut self, rules: &RuleArena, fitness: RuleId) {
        let Some(target) = self.memory.target else {
            return;
        };
        if !self
            .memory
            .weapon_switch_allowed(self.now_ms, self.config.weapon_switch_interval_ms)
        {
            return;
        }

        let equipped = self.memory.wanted_weapon.unwrap_or(self.me.current_weapon);
        let weights: Vec<u32> = self
            .snapshot
            .weapons
            .iter()
            .map(|weapon| {
                let key = EntityKey::player_weapon(target, weapon.id);
                weapon_weight(rules.evaluate(fitness, self.env, key), weapon.id == equipped)
            })
            .collect();

        let total: u32 = weights.iter().sum();
        if total == 0 {
            return;
        }

        let draw = self.rng.gen_range(0..total);
        let Some(choice) = pick_weighted(&weights, draw).map(|i| self.snapshot.weapons[i].id) else {
            return;
        };

        if choice != equipped {
            log::debug!(
                "Bot {} switching weapon {} -> {}",
                self.me.id,
                equipped,
                choice
            );
            self.memory.last_weapon_switch_ms = Some(self.now_ms);
        }
        self.memory.wanted_weapon = Some(choice);
    }
}

// ==================== Shared rules ====================

/// Rule fragments the states assemble their trees from
pub(crate) mod exprs {
    use crate::fuzzy::{term, RuleExpr};
    use crate::sensors::categories::*;

    pub fn gun_ready() -> RuleExpr {
        term(GUN_COOLDOWN, "ready") | term(GUN_COOLDOWN, "almost_ready")
    }

    pub fn can_jump_soon() -> RuleExpr {
        term(TIME_TO_IMPACT, "already_grabbing") | term(TIME_TO_IMPACT, "nearly_landed")
    }

    pub fn nearly_frozen() -> RuleExpr {
        term(MY_ENERGY_PERCENT, "frozen") | term(MY_ENERGY_PERCENT, "almost_frozen")
    }

    /// We are on, or pulling at, the enemy gate
    pub fn capturing_enemy_gate() -> RuleExpr {
        term(CAN_SEE_ENEMY_GATE, "touching") | !term(HOLDING_GATE, "not_holding")
    }

    /// They are pulling at their enemy gate
    pub fn other_capturing() -> RuleExpr {
        !term(OTHER_HOLDING_GATE, "not_holding")
    }

    pub fn close_enough() -> RuleExpr {
        !term(DIST_TO_OTHER, "far_away")
    }

    pub fn gun_turned_near() -> RuleExpr {
        !term(GUN_ANGLE_TO_OTHER, "far_off")
    }

    pub fn visible() -> RuleExpr {
        !term(CAN_SEE_PLAYER, "cant_see")
    }

    pub fn other_frozen() -> RuleExpr {
        term(OTHER_ENERGY_PERCENT, "frozen")
    }

    /// Visible, worth shooting, gun ready
    pub fn can_target(worth: RuleExpr) -> RuleExpr {
        (visible() & worth) & gun_ready()
    }

    pub fn firing_importance(worth: RuleExpr) -> RuleExpr {
        (!nearly_frozen() & (gun_ready() & (capturing_enemy_gate() | worth)))
            & (capturing_enemy_gate() | (other_capturing() | !can_jump_soon()))
    }

    pub fn run_away() -> RuleExpr {
        can_jump_soon()
            & ((nearly_frozen() | (!gun_ready() | term(GUN_ANGLE_TO_OTHER, "far_off")))
                & term(OTHER_HOLDING_GATE, "not_holding"))
    }

    pub fn dont_jump() -> RuleExpr {
        (gun_ready() & !can_jump_soon()) | capturing_enemy_gate()
    }

    /// Freezes them outright, or at least briefly while they take our gate
    pub fn weapon_fitness() -> RuleExpr {
        (term(WEAP_DAMAGE_AT_PLAYER, "freeze") & gun_ready())
            | (other_capturing() & !term(WEAP_FREEZE_TIME, "none"))
    }
}

/// Jump weight from the run-away and stay-put rules, after the fire weight
pub(crate) fn jump_weight(run_away: f32, dont_jump: f32, fire: i32) -> i32 {
    let jump = (((run_away - dont_jump) * 100.0 - fire as f32 / 2.0) as i32).max(0);
    if jump == 0 && dont_jump <= 0.01 {
        // Nothing holds us here; wander
        30
    } else {
        jump
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_fire_bucket_takes_every_draw() {
        let buckets = AimBuckets { fire: 50, jump: 0, goal: 0 };
        for draw in 0..50 {
            assert_eq!(buckets.choose(false, 20, draw), BucketChoice::Fire);
        }
    }

    #[test]
    fn test_bucket_ranges() {
        let buckets = AimBuckets { fire: 10, jump: 20, goal: 30 };
        assert_eq!(buckets.total(), 60);
        assert_eq!(buckets.choose(false, 20, 9), BucketChoice::Fire);
        assert_eq!(buckets.choose(false, 20, 10), BucketChoice::Jump);
        assert_eq!(buckets.choose(false, 20, 29), BucketChoice::Jump);
        assert_eq!(buckets.choose(false, 20, 30), BucketChoice::Goal);
        assert_eq!(buckets.choose(false, 20, 59), BucketChoice::Goal);
    }

    #[test]
    fn test_low_total_idles_until_timer_expires() {
        let buckets = AimBuckets { fire: 5, jump: 5, goal: 5 };
        for draw in 0..15 {
            assert_eq!(buckets.choose(false, 20, draw), BucketChoice::Idle);
            assert_eq!(buckets.choose(true, 20, draw), BucketChoice::Jump);
        }

        let empty = AimBuckets::default();
        assert_eq!(empty.total(), 1);
        assert_eq!(empty.choose(false, 20, 0), BucketChoice::Idle);
        assert_eq!(empty.choose(true, 20, 0), BucketChoice::Goal);
    }

    #[test]
    fn test_weapon_weight_bias() {
        assert_eq!(weapon_weight(0.5, false), 50);
        assert_eq!(weapon_weight(0.5, true), 50);
        assert_eq!(weapon_weight(0.96, false), 96);
        assert_eq!(weapon_weight(1.0, true), 5000);
        assert_eq!(weapon_weight(0.0, true), 0);
    }

    #[test]
    fn test_pick_weighted() {
        let weights = [0, 30, 0, 70];
        assert_eq!(pick_weighted(&weights, 0), Some(1));
        assert_eq!(pick_weighted(&weights, 29), Some(1));
        assert_eq!(pick_weighted(&weights, 30), Some(3));
        assert_eq!(pick_weighted(&weights, 99), Some(3));
        assert_eq!(pick_weighted(&weights, 100), None);
        assert_eq!(pick_weighted(&[], 0), None);
    }

    #[test]
    fn test_pick_target() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(pick_target(Vec::new(), &mut rng), None);
        assert_eq!(
            pick_target(vec![(1, 0.2), (2, 0.9), (3, 0.5)], &mut rng),
            Some((2, 0.9))
        );
        // Zero scores still yield a target
        assert_eq!(pick_target(vec![(4, 0.0)], &mut rng), Some((4, 0.0)));
    }

    #[test]
    fn test_pick_target_tie_flips_coin() {
        let mut first = 0;
        let mut second = 0;
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            match pick_target(vec![(1, 0.5), (2, 0.5)], &mut rng) {
                Some((1, _)) => first += 1,
                Some((2, _)) => second += 1,
                other => panic!("unexpected pick {:?}", other),
            }
        }
        assert!(first > 0 && second > 0);
    }

    #[test]
    fn test_jump_weight() {
        assert_eq!(jump_weight(0.8, 0.2, 20), 50);
        assert_eq!(jump_weight(0.2, 0.8, 0), 0);
        assert_eq!(jump_weight(0.0, 0.0, 0), 30);
        assert_eq!(jump_weight(0.0, 0.0, 100), 30);
    }

    #[test]
    fn test_memory_timers() {
        let mut memory = AgentMemory::default();
        assert!(memory.weapon_switch_allowed(0, 3000));
        memory.last_weapon_switch_ms = Some(1000);
        assert!(!memory.weapon_switch_allowed(3999, 3000));
        assert!(memory.weapon_switch_allowed(4000, 3000));

        memory.last_action_ms = 1000;
        assert!(!memory.idle_expired(3000, 2000));
        assert!(memory.idle_expired(3001, 2000));
    }

    #[test]
    fn test_path_memory() {
        let mut memory = AgentMemory::default();
        assert_eq!(memory.avoid_area(&AiConfig::default()), None);

        let aim = memory.adopt_path(
            Vec2::new(0.0, 0.0),
            vec![Intersect::new(0, 0, 0.0), Intersect::new(0, 100, 100.0)],
        );
        assert!(memory.path_found);
        assert!((aim.unwrap() - PI / 2.0).abs() < 1e-5);
        assert_eq!(memory.avoid_area(&AiConfig::default()).unwrap().center, Vec2::ZERO);

        assert_eq!(memory.adopt_path(Vec2::ZERO, Vec::new()), None);
        memory.invalidate_path();
        assert!(!memory.path_found);

        memory.was_grabbing = true;
        assert!(memory.released(false));
        assert!(!memory.landed(true));
    }

    #[test]
    fn test_weapon_switch_is_throttled() {
        use crate::test_support::{Fixture, ENEMY};

        // A ready freezer beats the blaster outright
        let mut fixture = Fixture::duel().update_weapon(1, |w| w.with_cooldown(0));
        let mut rules = RuleArena::new();
        let fitness = rules.build(&fixture.logic, &exprs::weapon_fitness()).unwrap();
        fixture.memory.target = Some(ENEMY);

        fixture.with_context(|cx| cx.choose_weapon(&rules, fitness));
        assert_eq!(fixture.memory.wanted_weapon, Some(1));
        assert_eq!(fixture.memory.last_weapon_switch_ms, Some(1000));

        fixture.memory.wanted_weapon = Some(0);
        fixture.now_ms = 2000;
        fixture.with_context(|cx| cx.choose_weapon(&rules, fitness));
        assert_eq!(fixture.memory.wanted_weapon, Some(0));

        fixture.now_ms = 4000;
        fixture.with_context(|cx| cx.choose_weapon(&rules, fitness));
        assert_eq!(fixture.memory.wanted_weapon, Some(1));
        assert_eq!(fixture.memory.last_weapon_switch_ms, Some(4000));
    }

    #[test]
    fn test_no_weapon_choice_without_target() {
        use crate::test_support::Fixture;

        let mut fixture = Fixture::duel().update_weapon(1, |w| w.with_cooldown(0));
        let mut rules = RuleArena::new();
        let fitness = rules.build(&fixture.logic, &exprs::weapon_fitness()).unwrap();

        fixture.with_context(|cx| cx.choose_weapon(&rules, fitness));
        assert_eq!(fixture.memory.wanted_weapon, None);
        assert_eq!(fixture.memory.last_weapon_switch_ms, None);
    }
}
