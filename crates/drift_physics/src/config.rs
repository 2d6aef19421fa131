//! Collision world configuration

use serde::{Deserialize, Serialize};

/// Collision world configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Thickness of the walls created by `add_map_borders`
    pub border_thickness: f32,

    /// Upper bound applied to every ray query
    pub max_ray_distance: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            border_thickness: 64.0,
            max_ray_distance: 1.0e6,
        }
    }
}

impl PhysicsConfig {
    /// Set border thickness
    pub fn with_border_thickness(mut self, thickness: f32) -> Self {
        self.border_thickness = thickness;
        self
    }

    /// Set maximum ray distance
    pub fn with_max_ray_distance(mut self, distance: f32) -> Self {
        self.max_ray_distance = distance;
        self
    }

    /// Check the configuration for obviously broken values
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.border_thickness > 0.0) {
            return Err(crate::PhysicsError::InvalidConfig(format!(
                "border thickness must be positive, got {}",
                self.border_thickness
            )));
        }
        if !(self.max_ray_distance > 0.0) {
            return Err(crate::PhysicsError::InvalidConfig(format!(
                "max ray distance must be positive, got {}",
                self.max_ray_distance
            )));
        }
        Ok(())
    }
}
