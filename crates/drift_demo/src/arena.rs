//! A tiny headless match: straight-line flight, hitscan guns, gate pulling

use drift_ai::{
    AiConfig, AimConfig, Bot, BotBrain, FuzzyProfile, GameSnapshot, GateView, GrapherConfig,
    MapGrapher, MapInfo, NavCache, PlayerId, PlayerView, StateKind, Team, WeaponId, WeaponView,
    WorldView,
};
use drift_math::{consts::PI, Vec2};
use drift_physics::{
    ObjectDesc, ObjectId, ObjectKind, ObjectShape, PhysicsError, PhysicsWorld, RayCaster,
    RayFilter,
};
use std::collections::HashMap;
use std::error::Error;

pub const ARENA_WIDTH: f32 = 1600.0;
pub const ARENA_HEIGHT: f32 = 1200.0;

const PLAYER_RADIUS: f32 = 16.0;
/// World units per second after pushing off
const JUMP_SPEED: f32 = 600.0;
/// Grabbing this close to an enemy gate pulls on it
const GATE_REACH: f32 = 60.0;
const CAPTURE_MS: f32 = 5000.0;
/// Freeze applied when energy runs out to a weapon that does not freeze
const KNOCKOUT_MS: u64 = 3000;
const SHOT_COOLDOWN_MS: u64 = 400;
/// Surfaces graphed per frame while the navigation map is built
const OBJECTS_PER_FRAME: usize = 1;

struct Slot {
    bot: Bot,
    armory: Vec<WeaponView>,
    last_state: StateKind,
}

/// Everything in one running match
pub struct Match {
    world: PhysicsWorld,
    snapshot: GameSnapshot,
    grapher: MapGrapher,
    slots: Vec<Slot>,
    thaw_at: HashMap<PlayerId, u64>,
    scores: HashMap<Team, u32>,
    now_ms: u64,
}

fn armory() -> Vec<WeaponView> {
    vec![
        WeaponView::new(0, "blaster", 25.0, 1500.0),
        WeaponView::new(1, "freezer", 120.0, 900.0).with_freeze_time(4000),
    ]
}

impl Match {
    /// Build the arena and seat two bots per team
    pub fn new(seed: u64, cache: Option<NavCache>) -> Result<Self, Box<dyn Error>> {
        let mut world = PhysicsWorld::default();
        world.add_map_borders(ARENA_WIDTH, ARENA_HEIGHT)?;

        let pillars = [
            (Vec2::new(800.0, 600.0), Vec2::new(80.0, 80.0)),
            (Vec2::new(450.0, 250.0), Vec2::new(120.0, 20.0)),
            (Vec2::new(1150.0, 950.0), Vec2::new(120.0, 20.0)),
        ];
        for (center, half_extents) in pillars {
            world.add_object(ObjectDesc::cuboid(
                ObjectKind::Obstacle { jumpable: true, collidable: true },
                center,
                half_extents,
            ))?;
        }

        let mut snapshot = GameSnapshot::new(MapInfo::new("demo_arena", ARENA_WIDTH, ARENA_HEIGHT));
        for (team, x) in [(Team::Blue, 10.0), (Team::Red, ARENA_WIDTH - 10.0)] {
            let position = Vec2::new(x, ARENA_HEIGHT / 2.0);
            let object = world.add_object(ObjectDesc::cuboid(
                ObjectKind::Gate { team: team.index() },
                position,
                Vec2::new(10.0, 50.0),
            ))?;
            snapshot.gates.push(GateView::new(team, object, position));
        }

        // Everyone starts holding on to their side wall
        let (left, right) = (PLAYER_RADIUS, ARENA_WIDTH - PLAYER_RADIUS);
        let seats = [
            (1, Team::Blue, Vec2::new(left, 300.0)),
            (2, Team::Blue, Vec2::new(left, 900.0)),
            (3, Team::Red, Vec2::new(right, 300.0)),
            (4, Team::Red, Vec2::new(right, 900.0)),
        ];
        let profile = FuzzyProfile::standard();
        let mut slots = Vec::with_capacity(seats.len());
        for (id, team, position) in seats {
            let object = world.add_object(ObjectDesc::new(
                ObjectKind::Player { player_id: id },
                ObjectShape::Ball { radius: PLAYER_RADIUS },
                position,
            ))?;
            snapshot
                .players
                .push(PlayerView::new(id, team, object, position).with_gun_rotation(team_facing(team)));

            let brain = BotBrain::with_seed(id, AiConfig::default(), &profile, seed.wrapping_mul(31) + id as u64)?;
            let last_state = brain.state();
            log::info!("Bot {} joins {:?} as {}", id, team, last_state);
            slots.push(Slot {
                bot: Bot::new(brain, AimConfig::default()),
                armory: armory(),
                last_state,
            });
        }

        let mut grapher = MapGrapher::new(GrapherConfig::default())?;
        if let Some(cache) = cache {
            grapher = grapher.with_cache(cache);
        }
        grapher.load_map(&snapshot.map, &world);

        Ok(Self {
            world,
            snapshot,
            grapher,
            slots,
            thaw_at: HashMap::new(),
            scores: HashMap::new(),
            now_ms: 0,
        })
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advance the match by one frame
    pub fn step(&mut self, dt_ms: u64) -> Result<(), PhysicsError> {
        self.now_ms += dt_ms;

        if !self.grapher.is_done_mapping() && self.grapher.do_mapping(&self.world, OBJECTS_PER_FRAME) {
            log::info!(
                "Navigation ready after {} ms ({} edges, {} surfaces)",
                self.now_ms,
                self.grapher.graph().len(),
                self.grapher.stats().objects
            );
        }

        self.thaw();
        for index in 0..self.slots.len() {
            self.tick_bot(index, dt_ms);
        }
        self.fly(dt_ms)?;
        self.pull_gates(dt_ms);
        Ok(())
    }

    /// Log scores and what every bot is up to
    pub fn report(&self) {
        log::info!(
            "[{:>6} ms] blue {} - red {}",
            self.now_ms,
            self.scores.get(&Team::Blue).copied().unwrap_or(0),
            self.scores.get(&Team::Red).copied().unwrap_or(0)
        );
        for slot in &self.slots {
            let id = slot.bot.brain().player_id();
            let Some(player) = self.snapshot.player(id) else {
                continue;
            };
            log::info!(
                "  bot {} {:<10} at ({:>6.0}, {:>6.0}) energy {:>3}{}",
                id,
                slot.bot.brain().state(),
                player.position.x,
                player.position.y,
                player.energy,
                if player.frozen { " frozen" } else { "" }
            );
        }
    }

    // ==================== Bots ====================

    fn tick_bot(&mut self, index: usize, dt_ms: u64) {
        let slot = &mut self.slots[index];
        for weapon in &mut slot.armory {
            weapon.cooldown_remaining_ms = weapon.cooldown_remaining_ms.saturating_sub(dt_ms);
        }
        self.snapshot.weapons = slot.armory.clone();

        let graph = if self.grapher.is_done_mapping() {
            Some(self.grapher.graph())
        } else {
            None
        };
        let view = WorldView::new(&self.snapshot, &self.world).with_graph(graph);
        let controls = slot.bot.tick(&view, self.now_ms);

        let id = slot.bot.brain().player_id();
        let state = slot.bot.brain().state();
        if state != slot.last_state {
            log::info!("Bot {}: {} -> {}", id, slot.last_state, state);
            slot.last_state = state;
        }

        let Some(me) = self.snapshot.players.iter_mut().find(|p| p.id == id) else {
            return;
        };
        if me.frozen {
            return;
        }

        me.gun_rotation = controls.aim;
        if let Some(weapon) = controls.weapon {
            log::debug!("Bot {} draws weapon {}", id, weapon);
            me.current_weapon = weapon;
        }
        if controls.jump && me.grabbing {
            me.velocity = Vec2::from_angle(controls.aim) * JUMP_SPEED;
            me.grabbing = false;
        }
        if controls.fire {
            let (object, origin, weapon) = (me.object, me.position, me.current_weapon);
            self.fire(index, id, object, origin, controls.aim, weapon);
        }
    }

    fn fire(&mut self, index: usize, shooter: PlayerId, object: ObjectId, origin: Vec2, aim: f32, weapon: WeaponId) {
        let Some(weapon) = self.slots[index].armory.iter_mut().find(|w| w.id == weapon) else {
            return;
        };
        if weapon.cooldown_remaining_ms > 0 {
            return;
        }
        weapon.cooldown_remaining_ms = SHOT_COOLDOWN_MS;
        let weapon = weapon.clone();

        let filter = RayFilter::default().ignoring(object).solid_only();
        let Some(hit) = self.world.cast_ray_at(origin, aim, weapon.range, &filter) else {
            return;
        };
        let ObjectKind::Player { player_id } = hit.kind else {
            return;
        };
        let Some(victim) = self.snapshot.players.iter_mut().find(|p| p.id == player_id) else {
            return;
        };
        if victim.frozen {
            return;
        }

        victim.energy -= weapon.damage_at(hit.distance).round() as i32;
        let freeze_ms = if weapon.freeze_time_ms > 0 {
            Some(weapon.freeze_time_ms)
        } else if victim.energy <= 0 {
            Some(KNOCKOUT_MS)
        } else {
            None
        };
        if let Some(freeze_ms) = freeze_ms {
            victim.frozen = true;
            victim.energy = victim.energy.max(0);
            self.thaw_at.insert(player_id, self.now_ms + freeze_ms);
            log::info!("Bot {} froze bot {} with the {}", shooter, player_id, weapon.name);
        }
    }

    // ==================== World ====================

    fn thaw(&mut self) {
        let now = self.now_ms;
        for player in self.snapshot.players.iter_mut().filter(|p| p.frozen) {
            if self.thaw_at.get(&player.id).map_or(true, |&at| now >= at) {
                player.frozen = false;
                player.energy = PlayerView::MAX_ENERGY;
                self.thaw_at.remove(&player.id);
            }
        }
    }

    /// Move drifting players; they grab whatever they run into
    fn fly(&mut self, dt_ms: u64) -> Result<(), PhysicsError> {
        let seconds = dt_ms as f32 / 1000.0;
        for player in self.snapshot.players.iter_mut().filter(|p| !p.grabbing) {
            let step = player.velocity * seconds;
            let length = step.length();
            if length <= f32::EPSILON {
                continue;
            }

            let direction = step / length;
            let filter = RayFilter::default()
                .ignoring(player.object)
                .solid_only()
                .static_only();
            match self.world.cast_ray(player.position, direction, length + PLAYER_RADIUS, &filter) {
                Some(hit) => {
                    player.position = hit.point - direction * PLAYER_RADIUS;
                    player.velocity = Vec2::ZERO;
                    player.grabbing = true;
                }
                None => player.position += step,
            }
            self.world.set_object_position(player.object, player.position)?;
        }
        Ok(())
    }

    fn pull_gates(&mut self, dt_ms: u64) {
        let players = &self.snapshot.players;
        for gate in &mut self.snapshot.gates {
            gate.engaging = players
                .iter()
                .filter(|p| {
                    p.team != gate.team
                        && p.grabbing
                        && !p.frozen
                        && p.position.distance(gate.position) < GATE_REACH
                })
                .map(|p| p.id)
                .collect();

            if gate.engaging.is_empty() {
                gate.progress = 0.0;
                continue;
            }

            gate.progress += dt_ms as f32 / CAPTURE_MS;
            if gate.progress >= 1.0 {
                let scorer = gate.team.other();
                *self.scores.entry(scorer).or_default() += 1;
                log::info!("{:?} captured the {:?} gate ({:?})", scorer, gate.team, gate.engaging);
                gate.progress = 0.0;
            }
        }
    }
}

/// Gun rotation pointing into the arena from a team's side
fn team_facing(team: Team) -> f32 {
    match team {
        Team::Blue => 0.0,
        Team::Red => PI,
    }
}
