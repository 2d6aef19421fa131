//! Turning decisions into gun rotation, fire and jump triggers

use crate::config::AimConfig;
use crate::snapshot::{PlayerView, WeaponId};
use crate::states::{AimReason, Decision};
use drift_math::{angle_difference, clamp, normalize_radians};

/// Inputs for one player for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Controls {
    /// Gun rotation, radians
    pub aim: f32,
    pub aim_changed: bool,
    pub fire: bool,
    pub jump: bool,
    /// Weapon to switch to, if not the one equipped
    pub weapon: Option<WeaponId>,
    /// How far the gun still is from the wanted aim
    pub aim_error: f32,
}

/// Rotates the gun toward the wanted aim at a bounded speed
#[derive(Debug, Clone, Default)]
pub struct AimController {
    config: AimConfig,
    current_aim: Option<f32>,
}

impl AimController {
    /// Create a new aim controller
    pub fn new(config: AimConfig) -> Self {
        Self {
            config,
            current_aim: None,
        }
    }

    /// Current gun rotation, once the first tick has run
    pub fn current_aim(&self) -> Option<f32> {
        self.current_aim
    }

    pub fn translate(&mut self, decision: &Decision, me: &PlayerView) -> Controls {
        let current = *self.current_aim.get_or_insert(me.gun_rotation);
        if me.frozen {
            return Controls {
                aim: current,
                ..Default::default()
            };
        }

        let tolerance = self.config.aim_tolerance;
        let step = self.config.max_aim_velocity;

        let diff = angle_difference(current, decision.aim);
        let (aim, aim_changed) = if diff.abs() > tolerance {
            (normalize_radians(current + clamp(diff, -step, step)), true)
        } else {
            (current, false)
        };
        self.current_aim = Some(aim);

        let aim_error = angle_difference(aim, decision.aim).abs();
        let on_target = aim_error <= tolerance;

        Controls {
            aim,
            aim_changed,
            fire: on_target && decision.reason == AimReason::Fire,
            jump: on_target && decision.reason == AimReason::Jump && me.grabbing,
            weapon: (decision.weapon != me.current_weapon).then_some(decision.weapon),
            aim_error,
        }
    }
}
