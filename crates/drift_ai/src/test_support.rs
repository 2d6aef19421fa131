//! Small arena shared by the unit tests

use crate::agent::{populate_environment, WorldView};
use crate::config::{AiConfig, FuzzyProfile, BOT_SECTION};
use crate::fuzzy::{EntityKey, Environment, FuzzyLogic};
use crate::navigation::SparseIntersectMap;
use crate::sensors::categories::ALL;
use crate::sensors::Sensors;
use crate::snapshot::{GameSnapshot, GateView, MapInfo, PlayerId, PlayerView, Team, WeaponId, WeaponView};
use crate::states::{AgentMemory, DecisionContext, Navigator};
use drift_math::Vec2;
use drift_physics::{ObjectDesc, ObjectKind, ObjectShape, PhysicsWorld};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The bot under test, blue
pub const ME: PlayerId = 1;
/// Red, 300 units right of the bot
pub const ENEMY: PlayerId = 2;
/// Blue, only present when added
pub const ALLY: PlayerId = 3;

pub const ARENA_SIZE: f32 = 1000.0;
const PLAYER_RADIUS: f32 = 16.0;

pub struct Fixture {
    pub world: PhysicsWorld,
    pub snapshot: GameSnapshot,
    pub logic: FuzzyLogic,
    pub env: Environment,
    pub config: AiConfig,
    pub memory: AgentMemory,
    pub rng: StdRng,
    pub graph: Option<SparseIntersectMap>,
    pub now_ms: u64,
}

impl Fixture {
    /// Open arena, blue gate at the left edge, red gate at the right edge
    ///
    /// The bot grabs at (100, 500) with its gun pointing right at the enemy
    /// at (400, 500). Weapon 0 is a ready blaster, weapon 1 a cooling freezer.
    pub fn duel() -> Self {
        let mut world = PhysicsWorld::default();
        world.add_map_borders(ARENA_SIZE, ARENA_SIZE).unwrap();

        let mut snapshot = GameSnapshot::new(MapInfo::new("duel", ARENA_SIZE, ARENA_SIZE));
        for (team, x) in [(Team::Blue, 10.0), (Team::Red, ARENA_SIZE - 10.0)] {
            let position = Vec2::new(x, 500.0);
            let object = world
                .add_object(ObjectDesc::cuboid(
                    ObjectKind::Gate { team: team.index() },
                    position,
                    Vec2::new(10.0, 40.0),
                ))
                .unwrap();
            snapshot.gates.push(GateView::new(team, object, position));
        }
        snapshot.weapons = vec![
            WeaponView::new(0, "blaster", 10.0, 2000.0),
            WeaponView::new(1, "freezer", 200.0, 2000.0)
                .with_freeze_time(4000)
                .with_cooldown(500),
        ];

        let mut logic = FuzzyLogic::new(BOT_SECTION);
        logic
            .load_categories(&FuzzyProfile::standard(), &ALL)
            .unwrap();

        let fixture = Self {
            world,
            snapshot,
            logic,
            env: Environment::new(),
            config: AiConfig::default(),
            memory: AgentMemory::default(),
            rng: StdRng::seed_from_u64(42),
            graph: None,
            now_ms: 1000,
        };
        fixture
            .with_player(ME, Team::Blue, Vec2::new(100.0, 500.0))
            .with_player(ENEMY, Team::Red, Vec2::new(400.0, 500.0))
    }

    /// Add a grabbing, healthy player
    pub fn with_player(mut self, id: PlayerId, team: Team, position: Vec2) -> Self {
        let object = self
            .world
            .add_object(ObjectDesc::new(
                ObjectKind::Player { player_id: id },
                ObjectShape::Ball { radius: PLAYER_RADIUS },
                position,
            ))
            .unwrap();
        self.snapshot
            .players
            .push(PlayerView::new(id, team, object, position));
        self.refresh();
        self
    }

    pub fn without_player(mut self, id: PlayerId) -> Self {
        if let Some(index) = self.snapshot.players.iter().position(|p| p.id == id) {
            let player = self.snapshot.players.remove(index);
            self.world.remove_object(player.object).unwrap();
        }
        self.refresh();
        self
    }

    /// Replace a player; its body follows the new position
    pub fn update_player(mut self, id: PlayerId, f: impl FnOnce(PlayerView) -> PlayerView) -> Self {
        let index = self
            .snapshot
            .players
            .iter()
            .position(|p| p.id == id)
            .expect("no such fixture player");
        let updated = f(self.snapshot.players[index].clone());
        self.world
            .set_object_position(updated.object, updated.position)
            .unwrap();
        self.snapshot.players[index] = updated;
        self.refresh();
        self
    }

    pub fn update_me(self, f: impl FnOnce(PlayerView) -> PlayerView) -> Self {
        self.update_player(ME, f)
    }

    pub fn update_weapon(mut self, id: WeaponId, f: impl FnOnce(WeaponView) -> WeaponView) -> Self {
        if let Some(weapon) = self.snapshot.weapons.iter_mut().find(|w| w.id == id) {
            *weapon = f(weapon.clone());
        }
        self.refresh();
        self
    }

    /// Blue ally halfway through capturing the red gate
    pub fn with_ally_capturing(self) -> Self {
        self.with_player(ALLY, Team::Blue, Vec2::new(900.0, 200.0))
            .with_gate_engaged(Team::Red, ALLY)
    }

    pub fn with_gate_engaged(mut self, team: Team, player: PlayerId) -> Self {
        if let Some(gate) = self.snapshot.gates.iter_mut().find(|g| g.team == team) {
            gate.engaging.push(player);
            gate.progress = 0.5;
        }
        self.refresh();
        self
    }

    /// Overwrite one raw reading of `player` and recompute memberships
    pub fn set_input(&mut self, player: PlayerId, category: &str, value: f32) {
        let id = self.logic.category_id(category).unwrap();
        self.env.set_input(id, EntityKey::player(player), value);
        self.logic.apply(&mut self.env);
    }

    pub fn world_view(&self) -> WorldView<'_> {
        WorldView::new(&self.snapshot, &self.world).with_graph(self.graph.as_ref())
    }

    /// Run `f` with a decision context for the bot
    pub fn with_context<T>(&mut self, f: impl FnOnce(&mut DecisionContext<'_>) -> T) -> T {
        let me = self.snapshot.player(ME).expect("fixture has no bot");
        let mut cx = DecisionContext {
            me,
            snapshot: &self.snapshot,
            env: &self.env,
            config: &self.config,
            memory: &mut self.memory,
            rng: &mut self.rng,
            navigator: Navigator::new(self.graph.as_ref(), &self.world, &self.config),
            now_ms: self.now_ms,
        };
        f(&mut cx)
    }

    fn refresh(&mut self) {
        let Some(me) = self.snapshot.player(ME) else {
            return;
        };
        let sensors = Sensors::new(&self.snapshot, &self.world, self.config.sight_distance);
        populate_environment(&self.logic, &mut self.env, &sensors, me);
    }
}
