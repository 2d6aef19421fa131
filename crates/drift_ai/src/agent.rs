//! One bot's tick: sense the world, fuzzify, let the current state decide

use crate::aim::{AimController, Controls};
use crate::config::{AiConfig, AimConfig, BOT_SECTION};
use crate::error::Result;
use crate::fuzzy::{CategorySource, EntityKey, Environment, FuzzyLogic};
use crate::navigation::SparseIntersectMap;
use crate::sensors::categories::*;
use crate::sensors::Sensors;
use crate::snapshot::{GameSnapshot, PlayerId, PlayerView};
use crate::state_machine::{BotState, StateKind, StateMachine};
use crate::states::{
    AgentMemory, AggressiveState, Decision, DecisionContext, DefensiveState, Navigator,
    SeekingState,
};
use drift_physics::RayCaster;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What a bot may look at during one tick
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub snapshot: &'a GameSnapshot,
    pub caster: &'a dyn RayCaster,
    /// Navigation graph, once one is available
    pub graph: Option<&'a SparseIntersectMap>,
}

impl<'a> WorldView<'a> {
    /// Create a view without a navigation graph
    pub fn new(snapshot: &'a GameSnapshot, caster: &'a dyn RayCaster) -> Self {
        Self {
            snapshot,
            caster,
            graph: None,
        }
    }

    /// Set the navigation graph
    pub fn with_graph(mut self, graph: Option<&'a SparseIntersectMap>) -> Self {
        self.graph = graph;
        self
    }
}

// ==================== Environment ====================

type Reading = (&'static str, f32);

fn record<'r>(
    logic: &FuzzyLogic,
    env: &mut Environment,
    key: EntityKey,
    readings: impl IntoIterator<Item = &'r Reading>,
) {
    for &(name, value) in readings {
        if let Ok(category) = logic.category_id(name) {
            env.set_input(category, key, value);
        }
    }
}

/// Rebuild `env` with every reading the rules refer to, from `me`'s point of view
///
/// Every other player gets a key; every (opponent, weapon) pair gets a key
/// with the weapon's own cooldown and damage readings.
pub fn populate_environment(
    logic: &FuzzyLogic,
    env: &mut Environment,
    sensors: &Sensors<'_>,
    me: &PlayerView,
) {
    env.clear();
    let snapshot = sensors.snapshot();

    let mine: [Reading; 8] = [
        (DIST_TO_MY_GATE, sensors.dist_to_own_gate(me)),
        (DIST_TO_ENEMY_GATE, sensors.dist_to_enemy_gate(me)),
        (HOLDING_GATE, sensors.holding_gate(me)),
        (MY_ENERGY_PERCENT, sensors.energy_percent(me)),
        (TIME_TO_IMPACT, sensors.time_to_impact(me)),
        (CAN_SEE_ENEMY_GATE, sensors.can_see_gate(me, me.team.other())),
        (CAN_SEE_MY_GATE, sensors.can_see_gate(me, me.team)),
        (GUN_COOLDOWN, sensors.gun_cooldown(me)),
    ];

    for other in snapshot.players.iter().filter(|p| p.id != me.id) {
        let theirs: [Reading; 10] = [
            (DIST_TO_OTHER, sensors.dist_between(me, other)),
            (OTHER_DIST_TO_ENEMY_GATE, sensors.dist_to_enemy_gate(other)),
            (OTHER_DIST_TO_OWN_GATE, sensors.dist_to_own_gate(other)),
            (OTHER_HOLDING_GATE, sensors.holding_gate(other)),
            (OTHER_ENERGY_PERCENT, sensors.energy_percent(other)),
            (GUN_ANGLE_TO_OTHER, sensors.gun_angle_to(me, other)),
            (OTHER_TIME_TO_IMPACT, sensors.time_to_impact(other)),
            (CAN_SEE_PLAYER, sensors.can_see_player(me, other)),
            (OTHER_CAN_SEE_ENEMY_GATE, sensors.can_see_gate(other, other.team.other())),
            (OTHER_CAN_SEE_OWN_GATE, sensors.can_see_gate(other, other.team)),
        ];
        record(logic, env, EntityKey::player(other.id), mine.iter().chain(&theirs));

        if other.team == me.team {
            continue;
        }
        for weapon in &snapshot.weapons {
            let armed: [Reading; 3] = [
                (GUN_COOLDOWN, weapon.cooldown_remaining_ms as f32),
                (WEAP_DAMAGE_AT_PLAYER, sensors.weapon_damage_ratio(weapon, me, other)),
                (WEAP_FREEZE_TIME, sensors.weapon_freeze_time(weapon)),
            ];
            // The weapon's cooldown overrides ours, so it goes last
            record(
                logic,
                env,
                EntityKey::player_weapon(other.id, weapon.id),
                mine.iter().chain(&theirs).chain(&armed),
            );
        }
    }

    logic.apply(env);
}

// ==================== BotBrain ====================

/// The decision-making half of a bot
pub struct BotBrain {
    player_id: PlayerId,
    config: AiConfig,
    logic: FuzzyLogic,
    env: Environment,
    fsm: StateMachine,
    memory: AgentMemory,
    rng: StdRng,
}

impl BotBrain {
    /// Create a brain for `player_id`, seeded from the OS
    pub fn new(player_id: PlayerId, config: AiConfig, profile: &dyn CategorySource) -> Result<Self> {
        Self::with_rng(player_id, config, profile, StdRng::from_entropy())
    }

    /// Create a brain whose every random choice follows `seed`
    pub fn with_seed(
        player_id: PlayerId,
        config: AiConfig,
        profile: &dyn CategorySource,
        seed: u64,
    ) -> Result<Self> {
        Self::with_rng(player_id, config, profile, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        player_id: PlayerId,
        config: AiConfig,
        profile: &dyn CategorySource,
        mut rng: StdRng,
    ) -> Result<Self> {
        let mut logic = FuzzyLogic::new(BOT_SECTION);
        logic.load_categories(profile, &ALL)?;

        let states: Vec<Box<dyn BotState>> = vec![
            Box::new(AggressiveState::new(&logic)?),
            Box::new(DefensiveState::new(&logic)?),
            Box::new(SeekingState::new(&logic)?),
        ];
        let fsm = StateMachine::with_random_start(states, &mut rng)?;
        log::debug!("Bot {} starts out {}", player_id, fsm.current());

        Ok(Self {
            player_id,
            config,
            logic,
            env: Environment::new(),
            fsm,
            memory: AgentMemory::default(),
            rng,
        })
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Current behavior state
    pub fn state(&self) -> StateKind {
        self.fsm.current()
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    /// Fuzzy environment of the last tick
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn logic(&self) -> &FuzzyLogic {
        &self.logic
    }

    /// Jump straight into a state
    pub fn force_state(&mut self, state: StateKind) {
        self.fsm.force_transition(state);
    }

    /// Decide what to do this tick
    ///
    /// A bot that is missing from the snapshot or frozen keeps its last aim
    /// and does nothing.
    pub fn update(&mut self, world: &WorldView<'_>, now_ms: u64) -> Decision {
        let Some(me) = world.snapshot.player(self.player_id) else {
            return Decision::idle(&self.memory);
        };
        if me.frozen {
            self.memory.was_grabbing = me.grabbing;
            return Decision::idle(&self.memory);
        }

        let sensors = Sensors::new(world.snapshot, world.caster, self.config.sight_distance);
        populate_environment(&self.logic, &mut self.env, &sensors, me);

        let mut cx = DecisionContext {
            me,
            snapshot: world.snapshot,
            env: &self.env,
            config: &self.config,
            memory: &mut self.memory,
            rng: &mut self.rng,
            navigator: Navigator::new(world.graph, world.caster, &self.config),
            now_ms,
        };
        let decision = self.fsm.update(&mut cx);

        self.memory.was_grabbing = me.grabbing;
        self.memory.last_aim = decision.aim;
        self.memory.aim_reason = decision.reason;
        decision
    }

    /// Pick a new aim error after a shot; faster aim changes miss more
    pub fn randomize_aim_inaccuracy(&mut self, aim_change: f32) {
        let spread =
            self.config.base_aim_uncertainty + aim_change.abs() * self.config.quick_aim_change_error;
        self.memory.aim_inaccuracy = if spread > 0.0 {
            self.rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
    }
}

// ==================== Bot ====================

/// A brain plus the hands that turn its decisions into controls
pub struct Bot {
    brain: BotBrain,
    aim: AimController,
}

impl Bot {
    /// Create a new bot
    pub fn new(brain: BotBrain, aim_config: AimConfig) -> Self {
        Self {
            brain,
            aim: AimController::new(aim_config),
        }
    }

    pub fn brain(&self) -> &BotBrain {
        &self.brain
    }

    pub fn brain_mut(&mut self) -> &mut BotBrain {
        &mut self.brain
    }

    /// Decide and translate into controls for this tick
    pub fn tick(&mut self, world: &WorldView<'_>, now_ms: u64) -> Controls {
        let decision = self.brain.update(world, now_ms);
        let Some(me) = world.snapshot.player(self.brain.player_id()) else {
            return Controls::default();
        };

        let controls = self.aim.translate(&decision, me);
        if controls.fire {
            self.brain.randomize_aim_inaccuracy(controls.aim_error);
        }
        controls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FuzzyProfile;
    use crate::fuzzy::CategoryId;
    use crate::test_support::{Fixture, ALLY, ENEMY, ME};
    use crate::states::AimReason;

    fn input(brain: &BotBrain, category: &str, key: EntityKey) -> Option<f32> {
        let id: CategoryId = brain.logic().category_id(category).ok()?;
        brain.environment().input(id, key)
    }

    fn brain(seed: u64) -> BotBrain {
        BotBrain::with_seed(ME, AiConfig::default(), &FuzzyProfile::standard(), seed).unwrap()
    }

    #[test]
    fn test_brain_requires_full_profile() {
        let empty = FuzzyProfile::default();
        assert!(BotBrain::with_seed(ME, AiConfig::default(), &empty, 1).is_err());
    }

    #[test]
    fn test_populates_player_and_weapon_keys() {
        let fixture = Fixture::duel().with_ally_capturing();
        let mut brain = brain(3);
        brain.update(&fixture.world_view(), fixture.now_ms);

        let enemy = EntityKey::player(ENEMY);
        assert_eq!(input(&brain, DIST_TO_OTHER, enemy), Some(300.0));
        assert_eq!(input(&brain, GUN_COOLDOWN, enemy), Some(0.0));
        assert_eq!(input(&brain, TIME_TO_IMPACT, enemy), Some(0.0));

        // Allies get player readings but no weapon pairs
        assert_eq!(input(&brain, OTHER_HOLDING_GATE, EntityKey::player(ALLY)), Some(0.5));
        assert_eq!(input(&brain, WEAP_FREEZE_TIME, EntityKey::player_weapon(ALLY, 1)), None);

        let freezer = EntityKey::player_weapon(ENEMY, 1);
        assert_eq!(input(&brain, GUN_COOLDOWN, freezer), Some(500.0));
        assert_eq!(input(&brain, WEAP_FREEZE_TIME, freezer), Some(4000.0));
        assert!(input(&brain, WEAP_DAMAGE_AT_PLAYER, freezer).unwrap() > 1.0);
        assert_eq!(input(&brain, DIST_TO_OTHER, freezer), Some(300.0));
    }

    #[test]
    fn test_missing_or_frozen_player_idles() {
        let fixture = Fixture::duel().update_me(|p| p.with_frozen(true));
        let mut brain = brain(5);
        let decision = brain.update(&fixture.world_view(), fixture.now_ms);
        assert_eq!(decision.reason, AimReason::DoNothing);

        let mut stranger =
            BotBrain::with_seed(99, AiConfig::default(), &FuzzyProfile::standard(), 5).unwrap();
        let decision = stranger.update(&fixture.world_view(), fixture.now_ms);
        assert_eq!(decision.reason, AimReason::DoNothing);
    }

    #[test]
    fn test_update_remembers_decision() {
        let fixture = Fixture::duel();
        let mut brain = brain(11);
        brain.memory.was_grabbing = false;

        let decision = brain.update(&fixture.world_view(), fixture.now_ms);
        assert_eq!(brain.memory().last_aim, decision.aim);
        assert_eq!(brain.memory().aim_reason, decision.reason);
        assert!(brain.memory().was_grabbing);
    }

    #[test]
    fn test_forced_state() {
        let mut brain = brain(13);
        brain.force_state(StateKind::Seeking);
        assert_eq!(brain.state(), StateKind::Seeking);
    }

    #[test]
    fn test_aim_inaccuracy_spread() {
        let mut brain = brain(17);
        for _ in 0..100 {
            brain.randomize_aim_inaccuracy(1.0);
            assert!(brain.memory().aim_inaccuracy.abs() <= 0.3 + 1e-6);
        }

        let mut steady = BotBrain::with_seed(ME, AiConfig::sharpshooter(), &FuzzyProfile::standard(), 1)
            .unwrap();
        steady.randomize_aim_inaccuracy(2.0);
        assert_eq!(steady.memory().aim_inaccuracy, 0.0);
    }

    #[test]
    fn test_bot_tick_fires_after_turning() {
        let fixture = Fixture::duel().update_me(|p| p.with_velocity(drift_math::Vec2::new(0.0, 50.0)));
        let brain = BotBrain::with_seed(ME, AiConfig::sharpshooter(), &FuzzyProfile::standard(), 21)
            .unwrap();
        let mut bot = Bot::new(brain, AimConfig::default());
        bot.brain_mut().force_state(StateKind::Aggressive);

        // Gun already points at the enemy, so the first tick can fire
        let controls = bot.tick(&fixture.world_view(), fixture.now_ms);
        assert!(controls.fire);
        assert!(!controls.jump);
    }
}
