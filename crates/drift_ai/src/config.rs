//! Bot, navigation and fuzzy-profile configuration

use crate::error::{AiError, Result};
use crate::fuzzy::{BinSpec, CategorySource};
use crate::navigation::MAX_GRANULARITY;
use crate::sensors::categories as cat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Decision timing and tuning for a bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Minimum time between two weapon switches
    pub weapon_switch_interval_ms: u64,

    /// How long a bot may sit idle before it is pushed into jumping
    pub allowed_idle_ms: u64,

    /// Bucket total below which the bot prefers doing nothing
    pub min_action_total: i32,

    /// Arrival radius for paths toward gates
    pub goal_tolerance: f32,

    /// Sight radius for paths toward a visible target
    pub visibility_tolerance: f32,

    /// Radius of the area around the previous launch point the search avoids
    pub avoid_area_radius: f32,

    /// Cost added at the centre of that area
    pub avoid_area_weight: f32,

    /// Aim jitter when the gun barely moved
    pub base_aim_uncertainty: f32,

    /// Extra aim jitter per radian of aim change
    pub quick_aim_change_error: f32,

    /// Reach of the probes that find the surface a bot is holding
    pub anchor_probe_distance: f32,

    /// A fresh exploratory jump aims at the gate one time in this many
    pub gate_jump_odds: u32,

    /// Range of sight and impact rays
    pub sight_distance: f32,

    /// Node expansion budget per path search
    pub max_search_expansions: Option<usize>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            weapon_switch_interval_ms: 3000,
            allowed_idle_ms: 2000,
            min_action_total: 20,
            goal_tolerance: 50.0,
            visibility_tolerance: 200.0,
            avoid_area_radius: 150.0,
            avoid_area_weight: 400.0,
            base_aim_uncertainty: 0.2,
            quick_aim_change_error: 0.1,
            anchor_probe_distance: 64.0,
            gate_jump_odds: 5,
            sight_distance: 5000.0,
            max_search_expansions: Some(20_000),
        }
    }
}

impl AiConfig {
    /// Parse from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the weapon switch interval
    pub fn with_weapon_switch_interval(mut self, ms: u64) -> Self {
        self.weapon_switch_interval_ms = ms;
        self
    }

    /// Set the allowed idle time
    pub fn with_allowed_idle(mut self, ms: u64) -> Self {
        self.allowed_idle_ms = ms;
        self
    }

    /// Bots that never miss
    pub fn sharpshooter() -> Self {
        Self {
            base_aim_uncertainty: 0.0,
            quick_aim_change_error: 0.0,
            ..Default::default()
        }
    }
}

/// Navigation graph construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrapherConfig {
    /// log2 of the position cell size; angle buckets scale with it
    pub granularity: u32,

    /// Expected number of edges, used to size the hash table
    pub estimated_size: usize,

    /// Degrees next to each surface tangent that are never launched along
    pub buffer_angle: f32,

    /// Cast three parallel rays per candidate instead of one
    pub multi_cast: bool,

    /// Sideways offset of the outer rays
    pub multi_cast_width: f32,

    /// Jumps shorter than this are not recorded
    pub min_hop_distance: f32,

    /// Longest jump considered
    pub max_ray_distance: f32,
}

impl Default for GrapherConfig {
    fn default() -> Self {
        Self {
            granularity: 5,
            estimated_size: 1_000_000,
            buffer_angle: 5.0,
            multi_cast: true,
            multi_cast_width: 12.0,
            min_hop_distance: 40.0,
            max_ray_distance: 1.0e5,
        }
    }
}

impl GrapherConfig {
    /// Coarse, single-ray mapping for quick previews and tests
    pub fn coarse() -> Self {
        Self {
            granularity: 6,
            estimated_size: 65_536,
            multi_cast: false,
            ..Default::default()
        }
    }

    /// Set granularity
    pub fn with_granularity(mut self, granularity: u32) -> Self {
        self.granularity = granularity;
        self
    }

    /// Enable or disable multi-casting
    pub fn with_multi_cast(mut self, multi_cast: bool) -> Self {
        self.multi_cast = multi_cast;
        self
    }

    /// Check the configuration for obviously broken values
    pub fn validate(&self) -> Result<()> {
        if self.granularity > MAX_GRANULARITY {
            return Err(AiError::InvalidConfig(format!(
                "granularity must be at most {}, got {}",
                MAX_GRANULARITY, self.granularity
            )));
        }
        if !(0.0..90.0).contains(&self.buffer_angle) {
            return Err(AiError::InvalidConfig(format!(
                "buffer angle must be in [0, 90) degrees, got {}",
                self.buffer_angle
            )));
        }
        if !(self.max_ray_distance > 0.0) {
            return Err(AiError::InvalidConfig(format!(
                "max ray distance must be positive, got {}",
                self.max_ray_distance
            )));
        }
        if !(self.min_hop_distance >= 0.0) || !(self.multi_cast_width >= 0.0) {
            return Err(AiError::InvalidConfig(format!(
                "hop distance and multi-cast width must not be negative, got {} and {}",
                self.min_hop_distance, self.multi_cast_width
            )));
        }
        Ok(())
    }
}

/// Gun turning settings for the input translator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    /// Largest aim change per tick, radians
    pub max_aim_velocity: f32,

    /// Aim counts as on target within this many radians
    pub aim_tolerance: f32,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            max_aim_velocity: 0.03,
            aim_tolerance: 0.01,
        }
    }
}

/// Section of the profile the bots read
pub const BOT_SECTION: &str = "bot";

/// Bins per category per section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuzzyProfile {
    pub sections: BTreeMap<String, BTreeMap<String, Vec<BinSpec>>>,
}

impl CategorySource for FuzzyProfile {
    fn bins(&self, section: &str, category: &str) -> Option<&[BinSpec]> {
        self.sections
            .get(section)?
            .get(category)
            .map(Vec::as_slice)
    }
}

impl FuzzyProfile {
    /// Parse from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON profile from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the bins of one category
    pub fn set_bins(&mut self, section: &str, category: &str, bins: Vec<BinSpec>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(category.to_string(), bins);
    }

    /// The stock tuning for every category the bots measure
    ///
    /// Units: world units for distances, milliseconds for cooldowns and
    /// freeze times, seconds for time to impact, radians for gun angles,
    /// fractions for energy and gate progress. Unseen things measure
    /// `f32::MAX`.
    pub fn standard() -> Self {
        let far = f32::MAX;
        let b = BinSpec::new;
        let mut profile = Self::default();
        let mut set = |category: &str, bins: Vec<BinSpec>| profile.set_bins(BOT_SECTION, category, bins);

        let distance = || {
            vec![
                b("near", 0.0, 200.0, 100.0),
                b("medium", 300.0, 700.0, 150.0),
                b("far_away", 900.0, far, 200.0),
            ]
        };
        set(cat::DIST_TO_OTHER, distance());
        set(cat::DIST_TO_MY_GATE, distance());
        set(cat::DIST_TO_ENEMY_GATE, distance());
        set(cat::OTHER_DIST_TO_ENEMY_GATE, distance());
        set(cat::OTHER_DIST_TO_OWN_GATE, distance());

        let holding = || vec![b("not_holding", 0.0, 0.0, 0.05), b("holding", 0.05, 1.0, 0.05)];
        set(cat::HOLDING_GATE, holding());
        set(cat::OTHER_HOLDING_GATE, holding());

        let energy = || {
            vec![
                b("frozen", 0.0, 0.0, 0.05),
                b("almost_frozen", 0.05, 0.2, 0.1),
                b("damaged", 0.3, 0.7, 0.1),
                b("healthy", 0.8, 1.0, 0.1),
            ]
        };
        set(cat::MY_ENERGY_PERCENT, energy());
        set(cat::OTHER_ENERGY_PERCENT, energy());

        set(
            cat::GUN_COOLDOWN,
            vec![
                b("ready", 0.0, 0.0, 0.0),
                b("almost_ready", 1.0, 300.0, 200.0),
                b("cooling", 500.0, far, 200.0),
            ],
        );
        set(
            cat::GUN_ANGLE_TO_OTHER,
            vec![
                b("on_target", 0.0, 0.1, 0.1),
                b("near", 0.3, 0.6, 0.2),
                b("far_off", 0.8, 4.0, 0.3),
            ],
        );

        let impact = || {
            vec![
                b("already_grabbing", 0.0, 0.0, 0.0),
                b("nearly_landed", 0.001, 0.5, 0.5),
                b("drifting", 1.0, far, 0.5),
            ]
        };
        set(cat::TIME_TO_IMPACT, impact());
        set(cat::OTHER_TIME_TO_IMPACT, impact());

        set(
            cat::CAN_SEE_PLAYER,
            vec![b("visible", 0.0, 1000.0, 300.0), b("cant_see", 1500.0, far, 300.0)],
        );

        let gate_sight = || {
            vec![
                b("touching", 0.0, 40.0, 30.0),
                b("near", 80.0, 400.0, 100.0),
                b("far_away", 2000.0, far, 500.0),
            ]
        };
        set(cat::CAN_SEE_ENEMY_GATE, gate_sight());
        set(cat::CAN_SEE_MY_GATE, gate_sight());
        set(cat::OTHER_CAN_SEE_ENEMY_GATE, gate_sight());
        set(cat::OTHER_CAN_SEE_OWN_GATE, gate_sight());

        set(
            cat::WEAP_DAMAGE_AT_PLAYER,
            vec![
                b("none", 0.0, 0.0, 0.05),
                b("some", 0.1, 0.7, 0.2),
                b("freeze", 1.0, far, 0.3),
            ],
        );
        set(
            cat::WEAP_FREEZE_TIME,
            vec![
                b("none", 0.0, 0.0, 0.0),
                b("short", 1.0, 2000.0, 500.0),
                b("long", 3000.0, far, 1000.0),
            ],
        );

        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::categories::ALL;

    #[test]
    fn test_standard_profile_covers_every_category() {
        let profile = FuzzyProfile::standard();
        for name in ALL {
            assert!(
                profile.bins(BOT_SECTION, name).is_some(),
                "missing category {}",
                name
            );
        }
    }

    #[test]
    fn test_profile_json_round_trip() {
        let profile = FuzzyProfile::standard();
        let json = profile.to_json_string().unwrap();
        let parsed = FuzzyProfile::from_json_str(&json).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_profile_from_json() {
        let json = r#"{
            "sections": {
                "bot": {
                    "gun_cooldown": [
                        { "name": "ready", "start": 0.0, "end": 0.0 },
                        { "name": "almost_ready", "start": 1.0, "end": 100.0, "grade": 50.0 }
                    ]
                }
            }
        }"#;
        let profile = FuzzyProfile::from_json_str(json).unwrap();
        let bins = profile.bins("bot", "gun_cooldown").unwrap();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].grade, 0.0);
        assert_eq!(bins[1].grade, 50.0);
        assert!(profile.bins("bot", "dist_to_other").is_none());
    }

    #[test]
    fn test_grapher_config_validation() {
        assert!(GrapherConfig::default().validate().is_ok());
        assert!(GrapherConfig::coarse().validate().is_ok());
        assert!(GrapherConfig::default()
            .with_granularity(MAX_GRANULARITY)
            .validate()
            .is_ok());

        let broken = [
            GrapherConfig::default().with_granularity(32),
            GrapherConfig { buffer_angle: 90.0, ..Default::default() },
            GrapherConfig { max_ray_distance: 0.0, ..Default::default() },
            GrapherConfig { min_hop_distance: -1.0, ..Default::default() },
            GrapherConfig { multi_cast_width: f32::NAN, ..Default::default() },
        ];
        for config in broken {
            assert!(
                matches!(config.validate(), Err(AiError::InvalidConfig(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn test_ai_config_partial_json() {
        let config = AiConfig::from_json_str(r#"{ "allowed_idle_ms": 500 }"#).unwrap();
        assert_eq!(config.allowed_idle_ms, 500);
        assert_eq!(config.min_action_total, 20);
        assert!(AiConfig::from_json_str("{ nope").is_err());
    }
}
