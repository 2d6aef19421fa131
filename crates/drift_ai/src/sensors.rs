//! Measurements the bots feed into their fuzzy categories
//!
//! Everything here is a read-only query over the snapshot plus ray casts
//! against the collision world. Missing references measure as neutral
//! values (zero distance, not visible) instead of failing.

use crate::snapshot::{GameSnapshot, PlayerView, Team, WeaponView};
use drift_math::{angle_difference, Vec2};
use drift_physics::{RayCaster, RayFilter};

/// Names of the measured categories
pub mod categories {
    pub const DIST_TO_OTHER: &str = "dist_to_other";
    pub const DIST_TO_MY_GATE: &str = "dist_to_my_gate";
    pub const DIST_TO_ENEMY_GATE: &str = "dist_to_enemy_gate";
    pub const OTHER_DIST_TO_ENEMY_GATE: &str = "other_dist_to_enemy_gate";
    pub const OTHER_DIST_TO_OWN_GATE: &str = "other_dist_to_own_gate";
    pub const HOLDING_GATE: &str = "holding_gate";
    pub const OTHER_HOLDING_GATE: &str = "other_holding_gate";
    pub const MY_ENERGY_PERCENT: &str = "my_energy_percent";
    pub const OTHER_ENERGY_PERCENT: &str = "other_energy_percent";
    pub const GUN_COOLDOWN: &str = "gun_cooldown";
    pub const GUN_ANGLE_TO_OTHER: &str = "gun_angle_to_other";
    pub const TIME_TO_IMPACT: &str = "time_to_impact";
    pub const OTHER_TIME_TO_IMPACT: &str = "other_time_to_impact";
    pub const CAN_SEE_PLAYER: &str = "can_see_player";
    pub const CAN_SEE_ENEMY_GATE: &str = "can_see_enemy_gate";
    pub const CAN_SEE_MY_GATE: &str = "can_see_my_gate";
    pub const OTHER_CAN_SEE_ENEMY_GATE: &str = "other_can_see_enemy_gate";
    pub const OTHER_CAN_SEE_OWN_GATE: &str = "other_can_see_own_gate";
    pub const WEAP_DAMAGE_AT_PLAYER: &str = "weap_damage_at_player";
    pub const WEAP_FREEZE_TIME: &str = "weap_freeze_time";

    /// Every category a bot loads
    pub const ALL: [&str; 20] = [
        DIST_TO_OTHER,
        DIST_TO_MY_GATE,
        DIST_TO_ENEMY_GATE,
        OTHER_DIST_TO_ENEMY_GATE,
        OTHER_DIST_TO_OWN_GATE,
        HOLDING_GATE,
        OTHER_HOLDING_GATE,
        MY_ENERGY_PERCENT,
        OTHER_ENERGY_PERCENT,
        GUN_COOLDOWN,
        GUN_ANGLE_TO_OTHER,
        TIME_TO_IMPACT,
        OTHER_TIME_TO_IMPACT,
        CAN_SEE_PLAYER,
        CAN_SEE_ENEMY_GATE,
        CAN_SEE_MY_GATE,
        OTHER_CAN_SEE_ENEMY_GATE,
        OTHER_CAN_SEE_OWN_GATE,
        WEAP_DAMAGE_AT_PLAYER,
        WEAP_FREEZE_TIME,
    ];
}

/// Value reported for anything that cannot be seen or reached
pub const NOT_VISIBLE: f32 = f32::MAX;

/// A player that can still fight
pub fn is_active(player: &PlayerView) -> bool {
    !player.frozen && !player.invisible
}

/// Sensor queries for one tick
pub struct Sensors<'a> {
    snapshot: &'a GameSnapshot,
    caster: &'a dyn RayCaster,
    sight_distance: f32,
}

impl<'a> Sensors<'a> {
    /// Create sensors over a snapshot
    pub fn new(snapshot: &'a GameSnapshot, caster: &'a dyn RayCaster, sight_distance: f32) -> Self {
        Self {
            snapshot,
            caster,
            sight_distance,
        }
    }

    pub fn snapshot(&self) -> &'a GameSnapshot {
        self.snapshot
    }

    pub fn dist_between(&self, a: &PlayerView, b: &PlayerView) -> f32 {
        a.position.distance(b.position)
    }

    fn dist_to_gate(&self, player: &PlayerView, team: Team) -> f32 {
        self.snapshot
            .gate(team)
            .map_or(0.0, |gate| player.position.distance(gate.position))
    }

    pub fn dist_to_own_gate(&self, player: &PlayerView) -> f32 {
        self.dist_to_gate(player, player.team)
    }

    pub fn dist_to_enemy_gate(&self, player: &PlayerView) -> f32 {
        self.dist_to_gate(player, player.team.other())
    }

    /// Capture progress of the enemy gate if `player` is pulling on it, else 0
    pub fn holding_gate(&self, player: &PlayerView) -> f32 {
        match self.snapshot.gate(player.team.other()) {
            Some(gate) if gate.is_engaged_by(player.id) => gate.progress,
            _ => 0.0,
        }
    }

    pub fn energy_percent(&self, player: &PlayerView) -> f32 {
        player.energy.max(0) as f32 / PlayerView::MAX_ENERGY as f32
    }

    /// Remaining cooldown of `player`'s current weapon, ms
    pub fn gun_cooldown(&self, player: &PlayerView) -> f32 {
        self.snapshot
            .weapon(player.current_weapon)
            .map_or(0.0, |w| w.cooldown_remaining_ms as f32)
    }

    /// Absolute angle between `player`'s gun and the direction to `other`
    pub fn gun_angle_to(&self, player: &PlayerView, other: &PlayerView) -> f32 {
        let wanted = player.position.angle_to(other.position);
        angle_difference(player.gun_rotation, wanted).abs()
    }

    /// Seconds until `player` lands, 0 when grabbing
    pub fn time_to_impact(&self, player: &PlayerView) -> f32 {
        if player.grabbing {
            return 0.0;
        }
        let speed = player.velocity.length();
        if speed <= f32::EPSILON {
            return NOT_VISIBLE;
        }

        let filter = RayFilter::default().ignoring(player.object).solid_only();
        match self
            .caster
            .cast_ray(player.position, player.velocity, self.sight_distance, &filter)
        {
            Some(hit) => hit.distance / speed,
            None => NOT_VISIBLE,
        }
    }

    /// Distance to `other` if nothing blocks the line of sight
    pub fn can_see_player(&self, player: &PlayerView, other: &PlayerView) -> f32 {
        if other.invisible {
            return NOT_VISIBLE;
        }
        self.line_of_sight(player, other.position, |hit| hit == other.object)
    }

    /// Distance to `team`'s gate if nothing blocks the line of sight
    pub fn can_see_gate(&self, player: &PlayerView, team: Team) -> f32 {
        match self.snapshot.gate(team) {
            Some(gate) => self.line_of_sight(player, gate.position, |hit| hit == gate.object),
            None => NOT_VISIBLE,
        }
    }

    fn line_of_sight(
        &self,
        player: &PlayerView,
        target: Vec2,
        is_target: impl Fn(drift_physics::ObjectId) -> bool,
    ) -> f32 {
        let filter = RayFilter::default().ignoring(player.object).solid_only();
        match self
            .caster
            .cast_ray(player.position, target - player.position, self.sight_distance, &filter)
        {
            Some(hit) if is_target(hit.object) => hit.distance,
            _ => NOT_VISIBLE,
        }
    }

    /// Damage `weapon` would do at `target` relative to the target's energy
    pub fn weapon_damage_ratio(&self, weapon: &WeaponView, shooter: &PlayerView, target: &PlayerView) -> f32 {
        let damage = weapon.damage_at(shooter.position.distance(target.position));
        damage / target.energy.max(1) as f32
    }

    pub fn weapon_freeze_time(&self, weapon: &WeaponView) -> f32 {
        weapon.freeze_time_ms as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{GateView, MapInfo};
    use approx::assert_relative_eq;
    use drift_physics::{ObjectDesc, ObjectKind, ObjectShape, PhysicsWorld};

    struct Arena {
        world: PhysicsWorld,
        snapshot: GameSnapshot,
    }

    fn arena() -> Arena {
        let mut world = PhysicsWorld::default();
        world.add_map_borders(1000.0, 1000.0).unwrap();
        let wall = ObjectKind::Obstacle { jumpable: true, collidable: true };
        world
            .add_object(ObjectDesc::cuboid(wall, Vec2::new(500.0, 700.0), Vec2::new(20.0, 100.0)))
            .unwrap();

        let mut snapshot = GameSnapshot::new(MapInfo::new("sensors", 1000.0, 1000.0));
        let mut add_player = |id, team, pos: Vec2| {
            let object = world
                .add_object(ObjectDesc::new(
                    ObjectKind::Player { player_id: id },
                    ObjectShape::Ball { radius: 10.0 },
                    pos,
                ))
                .unwrap();
            PlayerView::new(id, team, object, pos)
        };
        let me = add_player(1, Team::Blue, Vec2::new(100.0, 700.0));
        let blocked = add_player(2, Team::Red, Vec2::new(900.0, 700.0));
        let open = add_player(3, Team::Red, Vec2::new(100.0, 300.0));
        snapshot.players = vec![me, blocked, open];

        let gate = world
            .add_object(ObjectDesc::cuboid(
                ObjectKind::Gate { team: Team::Red.index() },
                Vec2::new(990.0, 100.0),
                Vec2::new(10.0, 40.0),
            ))
            .unwrap();
        snapshot
            .gates
            .push(GateView::new(Team::Red, gate, Vec2::new(990.0, 100.0)));

        Arena { world, snapshot }
    }

    #[test]
    fn test_line_of_sight() {
        let a = arena();
        let sensors = Sensors::new(&a.snapshot, &a.world, 5000.0);
        let me = &a.snapshot.players[0];

        assert_eq!(sensors.can_see_player(me, &a.snapshot.players[1]), NOT_VISIBLE);
        assert_relative_eq!(
            sensors.can_see_player(me, &a.snapshot.players[2]),
            390.0,
            epsilon = 0.01
        );
        assert!(sensors.can_see_gate(me, Team::Red) < NOT_VISIBLE);
        assert_eq!(sensors.can_see_gate(me, Team::Blue), NOT_VISIBLE);
    }

    #[test]
    fn test_distances_and_gate_hold() {
        let mut a = arena();
        a.snapshot.gates[0].engaging.push(1);
        a.snapshot.gates[0].progress = 0.25;
        let sensors = Sensors::new(&a.snapshot, &a.world, 5000.0);
        let me = &a.snapshot.players[0];

        assert_eq!(sensors.dist_to_own_gate(me), 0.0);
        assert!(sensors.dist_to_enemy_gate(me) > 800.0);
        assert_eq!(sensors.holding_gate(me), 0.25);
        assert_eq!(sensors.holding_gate(&a.snapshot.players[2]), 0.0);
        assert_eq!(sensors.dist_between(me, &a.snapshot.players[2]), 400.0);
    }

    #[test]
    fn test_time_to_impact() {
        let a = arena();
        let sensors = Sensors::new(&a.snapshot, &a.world, 5000.0);
        let me = a.snapshot.players[0].clone();
        assert_eq!(sensors.time_to_impact(&me), 0.0);

        // Flying left at 100 u/s toward the wall at x = 0
        let flying = me.clone().with_velocity(Vec2::new(-100.0, 0.0));
        assert_relative_eq!(sensors.time_to_impact(&flying), 1.0, epsilon = 1e-3);

        let drifting = me.with_velocity(Vec2::ZERO);
        assert_eq!(sensors.time_to_impact(&drifting), NOT_VISIBLE);
    }

    #[test]
    fn test_gun_angle_and_energy() {
        let a = arena();
        let sensors = Sensors::new(&a.snapshot, &a.world, 5000.0);
        let me = a.snapshot.players[0].clone().with_gun_rotation(0.0).with_energy(25);
        let target = &a.snapshot.players[2];

        // Target is straight down (-PI/2)
        assert_relative_eq!(
            sensors.gun_angle_to(&me, target),
            std::f32::consts::FRAC_PI_2,
            epsilon = 1e-5
        );
        assert_eq!(sensors.energy_percent(&me), 0.25);
        assert_eq!(sensors.energy_percent(&me.clone().with_energy(-5)), 0.0);
    }

    #[test]
    fn test_weapon_measures() {
        let a = arena();
        let sensors = Sensors::new(&a.snapshot, &a.world, 5000.0);
        let me = &a.snapshot.players[0];
        let target = a.snapshot.players[2].clone().with_energy(20);
        let weapon = WeaponView::new(1, "freezer", 40.0, 800.0).with_freeze_time(1500);

        assert_relative_eq!(sensors.weapon_damage_ratio(&weapon, me, &target), 1.0);
        assert_eq!(sensors.weapon_freeze_time(&weapon), 1500.0);
        assert_eq!(sensors.gun_cooldown(me), 0.0);
    }
}
