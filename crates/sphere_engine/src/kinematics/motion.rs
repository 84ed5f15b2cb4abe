//! Motion state for entities that travel on the sphere
//!
//! Holds an orientation and a world-space angular velocity. Every mutation
//! goes through a method that re-applies the speed clamp, so callers cannot
//! leave an entity faster than its kind allows.

use super::spherical;
use crate::foundation::math::{utils, Quat, Vec3};

/// Orientation plus angular velocity of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalMotion {
    orientation: Quat,
    angular_velocity: Vec3,
    max_speed: f64,
}

impl SphericalMotion {
    /// Create a motion state at the pole, at rest
    pub fn new(max_speed: f64) -> Self {
        Self {
            orientation: Quat::identity(),
            angular_velocity: Vec3::zeros(),
            max_speed: max_speed.max(0.0),
        }
    }

    /// Create a motion state with an initial orientation
    pub fn with_orientation(orientation: Quat, max_speed: f64) -> Self {
        Self {
            orientation,
            ..Self::new(max_speed)
        }
    }

    /// Current orientation
    pub fn orientation(&self) -> &Quat {
        &self.orientation
    }

    /// Current world-space angular velocity (rad/s)
    pub fn angular_velocity(&self) -> &Vec3 {
        &self.angular_velocity
    }

    /// Current angular speed (rad/s)
    pub fn speed(&self) -> f64 {
        self.angular_velocity.norm()
    }

    /// Speed limit for this entity
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Unit direction from the sphere center to the entity
    pub fn direction(&self) -> Vec3 {
        spherical::rotate_up(&self.orientation)
    }

    /// Position on a sphere of `radius`
    pub fn position(&self, radius: f64) -> Vec3 {
        self.direction() * radius
    }

    /// Replace the orientation
    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation;
    }

    /// Place the entity over `target` (any non-zero vector)
    pub fn look_at(&mut self, target: &Vec3) {
        self.orientation = spherical::orientation_for(target);
    }

    /// Replace the angular velocity (clamped)
    pub fn set_angular_velocity(&mut self, angular_velocity: Vec3) {
        self.angular_velocity = spherical::clamp_speed(&angular_velocity, self.max_speed);
    }

    /// Set motion from a local heading and speed (clamped)
    pub fn set_heading(&mut self, local_heading: f64, speed: f64) {
        let omega = spherical::heading_to_angular_velocity(&self.orientation, local_heading, speed);
        self.set_angular_velocity(omega);
    }

    /// Change the speed limit and re-clamp the current velocity
    pub fn set_max_speed(&mut self, max_speed: f64) {
        self.max_speed = max_speed.max(0.0);
        self.angular_velocity = spherical::clamp_speed(&self.angular_velocity, self.max_speed);
    }

    /// Spin in place about the local up axis
    pub fn turn(&mut self, delta: f64) {
        self.orientation = spherical::turn(&self.orientation, delta);
    }

    /// Stop moving
    pub fn halt(&mut self) {
        self.angular_velocity = Vec3::zeros();
    }

    /// Advance by `dt` seconds
    pub fn integrate(&mut self, dt: f64) {
        self.orientation = spherical::integrate(&self.orientation, &self.angular_velocity, dt);
        self.angular_velocity = spherical::clamp_speed(&self.angular_velocity, self.max_speed);
    }

    /// Whether orientation and velocity hold only finite numbers
    pub fn is_finite(&self) -> bool {
        self.orientation.coords.iter().all(|c| c.is_finite())
            && utils::is_finite_vec(&self.angular_velocity)
    }

    /// Back to the pole, at rest
    pub fn reset(&mut self) {
        self.orientation = Quat::identity();
        self.angular_velocity = Vec3::zeros();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::UP;
    use approx::assert_relative_eq;

    #[test]
    fn test_velocity_is_clamped_on_every_mutation() {
        let mut motion = SphericalMotion::new(1.5);
        motion.set_angular_velocity(Vec3::new(0.0, 0.0, 10.0));
        assert_relative_eq!(motion.speed(), 1.5, epsilon = 1e-12);

        motion.set_heading(0.3, 4.0);
        assert_relative_eq!(motion.speed(), 1.5, epsilon = 1e-12);

        motion.set_max_speed(0.5);
        assert_relative_eq!(motion.speed(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_integrate_moves_off_pole() {
        let mut motion = SphericalMotion::new(10.0);
        motion.set_heading(0.0, 1.0);
        motion.integrate(0.5);

        let position = motion.position(5.0);
        assert_relative_eq!(position.norm(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(position.normalize().dot(&UP), 0.5f64.cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_reset_returns_to_pole() {
        let mut motion = SphericalMotion::new(2.0);
        motion.look_at(&Vec3::new(1.0, 0.0, 0.0));
        motion.set_heading(1.0, 1.0);
        motion.reset();
        assert_eq!(motion.direction(), UP);
        assert_eq!(motion.speed(), 0.0);
    }
}
