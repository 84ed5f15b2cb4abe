//! Primitive bounding volumes
//!
//! Bounding spheres are used by the collision broad phase and by the
//! footprint index to approximate hex cells.

use crate::foundation::math::Vec3;
use serde::{Deserialize, Serialize};

/// A bounding sphere for overlap tests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f64,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere centered on `center` that holds every point
    pub fn enclosing(center: Vec3, points: &[Vec3]) -> Self {
        let radius = points
            .iter()
            .map(|p| (p - center).norm())
            .fold(0.0, f64::max);
        Self { center, radius }
    }

    /// Check if this sphere intersects with another (touching counts)
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let distance_squared = (self.center - other.center).norm_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared <= radius_sum * radius_sum
    }

    /// Whether `other` lies entirely inside this sphere
    pub fn contains_sphere(&self, other: &BoundingSphere) -> bool {
        (self.center - other.center).norm() + other.radius <= self.radius
    }

    /// Whether `point` lies inside or on this sphere
    pub fn contains_point(&self, point: &Vec3) -> bool {
        (self.center - point).norm_squared() <= self.radius * self.radius
    }

    /// Get the penetration depth if intersecting (0.0 if not intersecting)
    pub fn penetration_depth(&self, other: &BoundingSphere) -> f64 {
        let distance = (self.center - other.center).norm();
        let radius_sum = self.radius + other.radius;
        if distance < radius_sum {
            radius_sum - distance
        } else {
            0.0
        }
    }
}
