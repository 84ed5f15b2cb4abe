//! Rotation-based motion on the surface of a sphere
//!
//! An entity never stores a free position vector. Its position is the
//! reference pole [`UP`] rotated by the entity's orientation, so moving along
//! a great circle is nothing more than composing rotations.

use crate::foundation::math::{utils, Quat, Unit, Vec3, EPSILON, FORWARD, UP};

/// Build an orientation from yaw (about Y), pitch (about X) and roll (about Z).
///
/// Applied right to left: roll, then pitch, then yaw.
pub fn from_yaw_pitch_roll(yaw: f64, pitch: f64, roll: f64) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), yaw)
        * Quat::from_axis_angle(&Vec3::x_axis(), pitch)
        * Quat::from_axis_angle(&Vec3::z_axis(), roll)
}

/// Rotate the reference pole by `orientation`
pub fn rotate_up(orientation: &Quat) -> Vec3 {
    orientation * UP
}

/// Yaw and pitch that carry [`UP`] onto `target`.
///
/// Exact for every direction except the antipode of `UP`, where yaw is
/// undefined. Directions with yaw and pitch both near 20 degrees lose a few
/// digits to the `asin`/`atan2` pair.
pub fn yaw_pitch_for(target: &Vec3) -> (f64, f64) {
    let d = target.normalize() - UP;
    let yaw = d.x.atan2(d.z);
    let dist = d.norm();
    let horizontal = (d.x * d.x + d.z * d.z).sqrt();
    let pitch = (dist / 2.0).clamp(-1.0, 1.0).asin() - d.y.atan2(horizontal);
    (yaw, pitch)
}

/// Orientation whose pole lands on `target`
pub fn orientation_for(target: &Vec3) -> Quat {
    let (yaw, pitch) = yaw_pitch_for(target);
    from_yaw_pitch_roll(yaw, pitch, 0.0)
}

/// Orientation for a latitude/longitude pair in radians
pub fn from_lat_lng(lat: f64, lng: f64) -> Quat {
    orientation_for(&utils::lat_lng_to_unit(lat, lng))
}

/// Unit point reached by yawing to `direction` and then travelling an arc of
/// `distance` radians away from the pole.
pub fn point_at(direction: f64, distance: f64) -> Vec3 {
    let rotation = from_yaw_pitch_roll(
        utils::wrap_half_circle(direction),
        utils::wrap_half_circle(distance),
        0.0,
    );
    rotate_up(&rotation).normalize()
}

/// Advance `orientation` by the world-space angular velocity `omega` over `dt`
/// seconds.
///
/// The increment is applied on the left. Multiplying on the right would treat
/// `omega` as a body-space vector and send the entity along the wrong great
/// circle.
pub fn integrate(orientation: &Quat, omega: &Vec3, dt: f64) -> Quat {
    let speed = omega.norm();
    if speed < EPSILON {
        return *orientation;
    }
    let axis = Unit::new_unchecked(omega / speed);
    let delta = Quat::from_axis_angle(&axis, speed * dt);
    let mut next = delta * orientation;
    next.renormalize();
    next
}

/// Angular velocity that moves an entity forward along `local_heading` at
/// `speed` radians per second.
///
/// `local_heading` is measured about the entity's own up axis from its local
/// forward direction. A heading parallel to the pole has no defined great
/// circle and yields the zero vector.
pub fn heading_to_angular_velocity(orientation: &Quat, local_heading: f64, speed: f64) -> Vec3 {
    let world_up = rotate_up(orientation);
    let local_forward = Quat::from_axis_angle(&Vec3::y_axis(), local_heading) * FORWARD;
    let world_heading = orientation * local_forward;

    let cross = world_up.cross(&world_heading);
    let length = cross.norm();
    if length < EPSILON {
        return Vec3::zeros();
    }
    cross / length * speed
}

/// Body-space yaw: spin the entity about its own up axis without moving it
pub fn turn(orientation: &Quat, delta: f64) -> Quat {
    orientation * Quat::from_axis_angle(&Vec3::y_axis(), delta)
}

/// Arc length between two points on a sphere of `radius`
pub fn great_circle_distance(a: &Vec3, b: &Vec3, radius: f64) -> f64 {
    let cos = a.normalize().dot(&b.normalize()).clamp(-1.0, 1.0);
    cos.acos() * radius
}

/// Clamp the magnitude of an angular velocity into `[0, max_speed]`
pub fn clamp_speed(omega: &Vec3, max_speed: f64) -> Vec3 {
    let speed = omega.norm();
    let max_speed = max_speed.max(0.0);
    if speed > max_speed && speed > 0.0 {
        omega * (max_speed / speed)
    } else {
        *omega
    }
}
