//! Read-only view of the game state handed to the bots each tick

use drift_math::Vec2;
use drift_physics::ObjectId;
use serde::{Deserialize, Serialize};

pub type PlayerId = u32;
pub type WeaponId = u32;

/// Team of a player or gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    /// The opposing team
    pub fn other(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }

    /// Index used to tag the team's gate in the collision world
    pub fn index(self) -> u8 {
        match self {
            Team::Blue => 0,
            Team::Red => 1,
        }
    }
}

/// One player as the bots see it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    /// Body in the collision world
    pub object: ObjectId,
    pub team: Team,
    pub position: Vec2,
    /// World units per second
    pub velocity: Vec2,
    /// Body rotation, radians
    pub rotation: f32,
    /// Gun rotation, radians
    pub gun_rotation: f32,
    pub energy: i32,
    pub frozen: bool,
    pub invisible: bool,
    /// Holding onto a surface
    pub grabbing: bool,
    pub current_weapon: WeaponId,
}

impl PlayerView {
    /// Energy of a fully healthy player
    pub const MAX_ENERGY: i32 = 100;

    /// Create a healthy, stationary, grabbing player
    pub fn new(id: PlayerId, team: Team, object: ObjectId, position: Vec2) -> Self {
        Self {
            id,
            object,
            team,
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            gun_rotation: 0.0,
            energy: Self::MAX_ENERGY,
            frozen: false,
            invisible: false,
            grabbing: true,
            current_weapon: 0,
        }
    }

    /// Set velocity; a moving player is not grabbing
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self.grabbing = false;
        self
    }

    /// Set energy
    pub fn with_energy(mut self, energy: i32) -> Self {
        self.energy = energy;
        self
    }

    /// Set frozen
    pub fn with_frozen(mut self, frozen: bool) -> Self {
        self.frozen = frozen;
        self
    }

    /// Set gun rotation
    pub fn with_gun_rotation(mut self, radians: f32) -> Self {
        self.gun_rotation = radians;
        self
    }

    /// Set current weapon
    pub fn with_weapon(mut self, weapon: WeaponId) -> Self {
        self.current_weapon = weapon;
        self
    }
}

/// One of the local armory's weapons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponView {
    pub id: WeaponId,
    pub name: String,
    pub cooldown_remaining_ms: u64,
    /// Energy removed at point blank
    pub damage: f32,
    /// Damage falls off linearly to zero here
    pub range: f32,
    /// How long a hit freezes the victim
    pub freeze_time_ms: u64,
}

impl WeaponView {
    /// Create a ready weapon
    pub fn new(id: WeaponId, name: impl Into<String>, damage: f32, range: f32) -> Self {
        Self {
            id,
            name: name.into(),
            cooldown_remaining_ms: 0,
            damage,
            range,
            freeze_time_ms: 0,
        }
    }

    /// Set freeze time
    pub fn with_freeze_time(mut self, ms: u64) -> Self {
        self.freeze_time_ms = ms;
        self
    }

    /// Set remaining cooldown
    pub fn with_cooldown(mut self, ms: u64) -> Self {
        self.cooldown_remaining_ms = ms;
        self
    }

    /// Damage dealt to something `distance` away
    pub fn damage_at(&self, distance: f32) -> f32 {
        if self.range <= 0.0 || distance >= self.range {
            return 0.0;
        }
        self.damage * (1.0 - distance.max(0.0) / self.range)
    }
}

/// A team's gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateView {
    pub team: Team,
    pub object: ObjectId,
    pub position: Vec2,
    /// Capture progress in `[0, 1]`
    pub progress: f32,
    /// Players currently pulling on this gate
    pub engaging: Vec<PlayerId>,
}

impl GateView {
    /// Create an idle gate
    pub fn new(team: Team, object: ObjectId, position: Vec2) -> Self {
        Self {
            team,
            object,
            position,
            progress: 0.0,
            engaging: Vec::new(),
        }
    }

    pub fn is_engaged_by(&self, player: PlayerId) -> bool {
        self.engaging.contains(&player)
    }
}

/// Arena metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    pub name: String,
    pub width: f32,
    pub height: f32,
}

impl MapInfo {
    /// Create map info
    pub fn new(name: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    pub fn diagonal(&self) -> f32 {
        Vec2::new(self.width, self.height).length()
    }
}

/// Everything a bot may look at during one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub map: MapInfo,
    pub players: Vec<PlayerView>,
    /// The local armory
    pub weapons: Vec<WeaponView>,
    pub gates: Vec<GateView>,
}

impl GameSnapshot {
    /// Create an empty snapshot of `map`
    pub fn new(map: MapInfo) -> Self {
        Self {
            map,
            players: Vec::new(),
            weapons: Vec::new(),
            gates: Vec::new(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn weapon(&self, id: WeaponId) -> Option<&WeaponView> {
        self.weapons.iter().find(|w| w.id == id)
    }

    /// The gate belonging to `team`
    pub fn gate(&self, team: Team) -> Option<&GateView> {
        self.gates.iter().find(|g| g.team == team)
    }

    /// Players on the team opposing `team`
    pub fn opponents_of(&self, team: Team) -> impl Iterator<Item = &PlayerView> {
        self.players.iter().filter(move |p| p.team != team)
    }

    /// Players on `team` other than `exclude`
    pub fn teammates_of(&self, team: Team, exclude: PlayerId) -> impl Iterator<Item = &PlayerView> {
        self.players
            .iter()
            .filter(move |p| p.team == team && p.id != exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_other() {
        assert_eq!(Team::Blue.other(), Team::Red);
        assert_eq!(Team::Red.other().index(), 0);
    }

    #[test]
    fn test_damage_falloff() {
        let weapon = WeaponView::new(1, "cannon", 80.0, 400.0);
        assert_eq!(weapon.damage_at(0.0), 80.0);
        assert_eq!(weapon.damage_at(200.0), 40.0);
        assert_eq!(weapon.damage_at(400.0), 0.0);
        assert_eq!(weapon.damage_at(900.0), 0.0);
    }

    #[test]
    fn test_snapshot_lookups() {
        let mut snapshot = GameSnapshot::new(MapInfo::new("test", 300.0, 400.0));
        snapshot.players.push(PlayerView::new(1, Team::Blue, ObjectId(10), Vec2::ZERO));
        snapshot.players.push(PlayerView::new(2, Team::Blue, ObjectId(11), Vec2::ZERO));
        snapshot.players.push(PlayerView::new(3, Team::Red, ObjectId(12), Vec2::ZERO));
        snapshot.gates.push(GateView::new(Team::Red, ObjectId(20), Vec2::X));

        assert_eq!(snapshot.map.diagonal(), 500.0);
        assert_eq!(snapshot.player(3).unwrap().team, Team::Red);
        assert!(snapshot.player(4).is_none());
        assert_eq!(snapshot.gate(Team::Red).unwrap().object, ObjectId(20));
        assert!(snapshot.gate(Team::Blue).is_none());
        assert_eq!(snapshot.opponents_of(Team::Blue).count(), 1);
        assert_eq!(snapshot.teammates_of(Team::Blue, 1).count(), 1);
    }
}
