//! # drift_math - 2D Math for the Drift Arena
//!
//! Vector and angle helpers shared by the physics and AI crates. Angles
//! handed to the navigation map are in degrees; everything the bots
//! produce (aim, gun rotation) is in radians.

pub mod vector;

pub use vector::*;

/// Common math constants
pub mod consts {
    pub const PI: f32 = core::f32::consts::PI;
    pub const TAU: f32 = PI * 2.0;
    pub const FRAC_PI_2: f32 = PI / 2.0;
    pub const DEG_TO_RAD: f32 = PI / 180.0;
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
    pub const EPSILON: f32 = 1e-6;
}

/// Convert degrees to radians
#[inline]
pub fn radians(degrees: f32) -> f32 {
    degrees * consts::DEG_TO_RAD
}

/// Convert radians to degrees
#[inline]
pub fn degrees(radians: f32) -> f32 {
    radians * consts::RAD_TO_DEG
}

/// Wrap an angle in degrees into `[0, 360)`
#[inline]
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Wrap an angle in radians into `(-PI, PI]`
#[inline]
pub fn normalize_radians(radians: f32) -> f32 {
    let wrapped = (radians + consts::PI).rem_euclid(consts::TAU) - consts::PI;
    if wrapped <= -consts::PI { wrapped + consts::TAU } else { wrapped }
}

/// Signed shortest rotation (radians) that turns `from` onto `to`
#[inline]
pub fn angle_difference(from: f32, to: f32) -> f32 {
    normalize_radians(to - from)
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp value between min and max
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value < min { min }
    else if value > max { max }
    else { value }
}

pub mod prelude {
    pub use crate::vector::Vec2;
    pub use crate::{
        angle_difference, clamp, degrees, lerp, normalize_degrees, normalize_radians, radians,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(45.0), 45.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
    }

    #[test]
    fn test_angle_difference_short_way() {
        let d = angle_difference(radians(170.0), radians(-170.0));
        assert_relative_eq!(d, radians(20.0), epsilon = 1e-5);
        let d = angle_difference(radians(-170.0), radians(170.0));
        assert_relative_eq!(d, radians(-20.0), epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_radians_range() {
        for step in -20..20 {
            let a = normalize_radians(step as f32 * 0.7);
            assert!(a > -consts::PI - consts::EPSILON && a <= consts::PI + consts::EPSILON);
        }
    }
}
