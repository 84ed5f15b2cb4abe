//! Spherical kinematics
//!
//! Positions are rotations of a fixed pole; velocities are world-space
//! angular velocity vectors.

pub mod spherical;
pub mod motion;

pub use motion::SphericalMotion;
pub use spherical::{
    clamp_speed, from_lat_lng, from_yaw_pitch_roll, great_circle_distance,
    heading_to_angular_velocity, integrate, orientation_for, point_at, rotate_up, turn,
    yaw_pitch_for,
};
