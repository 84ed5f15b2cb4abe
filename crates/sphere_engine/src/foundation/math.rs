//! Math utilities and types
//!
//! Provides the fundamental math types for simulation on a sphere. Everything
//! runs in double precision: positions are derived from rotations of a unit
//! pole, and single precision drifts visibly after a few thousand ticks.

pub use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector2, Vector3};

/// 2D vector type (projected outlines)
pub type Vec2 = Vector2<f64>;

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// Unit quaternion type for rotations
pub type Quat = UnitQuaternion<f64>;

/// Reference pole. Every entity position is `orientation * UP`, scaled by the
/// sphere radius.
pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Local forward direction in the tangent plane at [`UP`]
pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

/// Tolerance below which vectors are treated as zero length
pub const EPSILON: f64 = 1e-9;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f64 = std::f64::consts::PI;

    /// 2 * Pi
    pub const TAU: f64 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f64 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f64 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * constants::RAD_TO_DEG
    }

    /// Wrap an angle into `(-PI, PI]`
    pub fn wrap_half_circle(angle: f64) -> f64 {
        let wrapped = (angle + constants::PI).rem_euclid(constants::TAU) - constants::PI;
        if wrapped == -constants::PI {
            constants::PI
        } else {
            wrapped
        }
    }

    /// Check that every component of a vector is finite
    pub fn is_finite_vec(v: &Vec3) -> bool {
        v.iter().all(|c| c.is_finite())
    }

    /// Unit vector for a latitude/longitude pair (radians).
    ///
    /// Latitude is measured from the equator towards `+Y`, longitude from `+Z`
    /// towards `+X`.
    pub fn lat_lng_to_unit(lat: f64, lng: f64) -> Vec3 {
        Vec3::new(lat.cos() * lng.sin(), lat.sin(), lat.cos() * lng.cos())
    }

    /// Inverse of [`lat_lng_to_unit`]
    pub fn unit_to_lat_lng(v: &Vec3) -> (f64, f64) {
        let n = v.normalize();
        (n.y.clamp(-1.0, 1.0).asin(), n.x.atan2(n.z))
    }
}

#[cfg(test)]
mod tests {
    use super::constants::PI;
    use super::utils::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_half_circle() {
        assert_relative_eq!(wrap_half_circle(0.25), 0.25);
        assert_relative_eq!(wrap_half_circle(PI + 0.5), -PI + 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_half_circle(-PI - 0.5), PI - 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_half_circle(-PI), PI);
    }

    #[test]
    fn test_lat_lng_round_trip() {
        let v = lat_lng_to_unit(deg_to_rad(30.0), deg_to_rad(-120.0));
        assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
        let (lat, lng) = unit_to_lat_lng(&v);
        assert_relative_eq!(rad_to_deg(lat), 30.0, epsilon = 1e-9);
        assert_relative_eq!(rad_to_deg(lng), -120.0, epsilon = 1e-9);
    }
}
