//! Shape outlines for the narrow phase
//!
//! Outlines are stored in model space as `(x, z)` offsets in the tangent
//! plane at the reference pole, measured in world units. They are lifted onto
//! the sphere with the entity's orientation only when a pair is tested, and
//! the lifted copy is cached for the rest of the tick.

use super::polygon::{GeometryError, Polygon};
use crate::ecs::EntityHandle;
use crate::foundation::math::{Quat, Vec2, Vec3, EPSILON, FORWARD, UP};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifies one outline of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeTag(pub u32);

impl ShapeTag {
    /// Main hull outline
    pub const HULL: ShapeTag = ShapeTag(0);
}

/// Model-space outline (MODEL SPACE, transformed per test)
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    tag: ShapeTag,
    points: Vec<Vec2>,
}

impl Outline {
    /// Build an outline; the points must form a valid polygon
    pub fn new(tag: ShapeTag, points: Vec<Vec2>) -> Result<Self, GeometryError> {
        let polygon = Polygon::new(points)?;
        Ok(Self {
            tag,
            points: polygon.points().to_vec(),
        })
    }

    /// Dart-shaped hull pointing along local forward, `size` from center to tip
    pub fn ship(size: f64) -> Self {
        let points = [(0.0, 1.0), (-0.6, -0.8), (0.0, -0.4), (0.6, -0.8)]
            .iter()
            .map(|(x, z)| Vec2::new(x * size, z * size))
            .collect();
        Self { tag: ShapeTag::HULL, points }
    }

    /// Irregular octagon with outer radius `size`
    pub fn rock(size: f64) -> Self {
        const RADII: [f64; 8] = [1.0, 0.8, 0.95, 0.75, 1.0, 0.85, 0.9, 0.7];
        let step = std::f64::consts::TAU / RADII.len() as f64;
        let points = RADII
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let angle = step * i as f64;
                Vec2::new(angle.sin() * r * size, angle.cos() * r * size)
            })
            .collect();
        Self { tag: ShapeTag::HULL, points }
    }

    /// Shape tag
    pub fn tag(&self) -> ShapeTag {
        self.tag
    }

    /// Model-space vertices as `(x, z)`
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Largest distance of a vertex from the model origin
    pub fn bounding_radius(&self) -> f64 {
        self.points.iter().map(Vec2::norm).fold(0.0, f64::max)
    }

    /// Lift onto a sphere of `radius` under `orientation`
    pub fn to_world(&self, orientation: &Quat, radius: f64) -> WorldOutline {
        let points = self
            .points
            .iter()
            .map(|p| orientation * Vec3::new(p.x, radius, p.y).normalize() * radius)
            .collect();
        WorldOutline { tag: self.tag, points }
    }
}

/// World-space outline (temporary, for testing only)
#[derive(Debug, Clone, PartialEq)]
pub struct WorldOutline {
    tag: ShapeTag,
    points: Vec<Vec3>,
}

impl WorldOutline {
    /// Shape tag
    pub fn tag(&self) -> ShapeTag {
        self.tag
    }

    /// Vertices on the sphere surface
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Gnomonic projection onto the plane tangent at `center` (unit vector)
    pub fn project(&self, frame: &ProjectionFrame) -> Result<Polygon, GeometryError> {
        let points = self
            .points
            .iter()
            .map(|p| frame.project(p))
            .collect::<Result<Vec<_>, _>>()?;
        Polygon::new(points)
    }
}

/// Tangent-plane basis for a gnomonic projection
#[derive(Debug, Clone, Copy)]
pub struct ProjectionFrame {
    center: Vec3,
    e1: Vec3,
    e2: Vec3,
}

impl ProjectionFrame {
    /// Frame tangent at the normalized mean of the given points
    pub fn around(points: impl IntoIterator<Item = Vec3>) -> Result<Self, GeometryError> {
        let sum = points.into_iter().fold(Vec3::zeros(), |acc, p| acc + p.normalize());
        let length = sum.norm();
        if !(length > EPSILON) {
            return Err(GeometryError::BehindHorizon);
        }
        let center = sum / length;
        let reference = if center.dot(&UP).abs() < 0.9 { UP } else { FORWARD };
        let e1 = center.cross(&reference).normalize();
        let e2 = center.cross(&e1);
        Ok(Self { center, e1, e2 })
    }

    /// Tangent point of the frame
    pub fn center(&self) -> &Vec3 {
        &self.center
    }

    /// Project one point; points on or past the horizon fail
    pub fn project(&self, point: &Vec3) -> Result<Vec2, GeometryError> {
        let unit = point.normalize();
        let depth = unit.dot(&self.center);
        if !(depth > EPSILON) {
            return Err(GeometryError::BehindHorizon);
        }
        Ok(Vec2::new(unit.dot(&self.e1) / depth, unit.dot(&self.e2) / depth))
    }
}

/// Project two outlines into one shared plane
pub fn project_pair(a: &WorldOutline, b: &WorldOutline) -> Result<(Polygon, Polygon), GeometryError> {
    let frame = ProjectionFrame::around(a.points.iter().chain(b.points.iter()).copied())?;
    Ok((a.project(&frame)?, b.project(&frame)?))
}

/// Per-tick cache of lifted outlines keyed by entity and shape tag.
///
/// Entries describe one tick's geometry only; [`OutlineCache::begin_tick`]
/// must run before any lookup in a new tick.
#[derive(Debug, Default)]
pub struct OutlineCache {
    entries: HashMap<(EntityHandle, ShapeTag), WorldOutline>,
    hits: u64,
    misses: u64,
}

impl OutlineCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry from the previous tick
    pub fn begin_tick(&mut self) {
        self.entries.clear();
    }

    /// Lifted outline for `handle`, computed on first use this tick
    pub fn get_or_lift(
        &mut self,
        handle: EntityHandle,
        outline: &Outline,
        orientation: &Quat,
        radius: f64,
    ) -> &WorldOutline {
        let key = (handle, outline.tag());
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.entries
            .entry(key)
            .or_insert_with(|| outline.to_world(orientation, radius))
    }

    /// Outline lifted earlier this tick
    pub fn get(&self, handle: EntityHandle, tag: ShapeTag) -> Option<&WorldOutline> {
        self.entries.get(&(handle, tag))
    }

    /// Entries cached this tick
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lifetime `(hits, misses)`
    pub fn counters(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
