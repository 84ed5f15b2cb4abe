//! Planar polygons and polygon clipping
//!
//! Narrow-phase shapes are simple polygons in a 2D projection plane. Two
//! polygons are compared by clipping one against the other with the
//! Greiner-Hormann algorithm and by an even-odd point-in-polygon test.
//!
//! The clipper does not try to recover from degenerate input. A vertex lying
//! on the other polygon's boundary, or two edges overlapping along a line,
//! produces [`GeometryError::Degenerate`]. [`polygons_intersect`] answers
//! those cases with a contact test instead, so exactly coincident outlines
//! still overlap.

use crate::foundation::math::{Vec2, EPSILON};
use thiserror::Error;

/// Geometry errors raised by polygon construction and clipping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A polygon needs at least three vertices
    #[error("Polygon has {0} vertices, at least 3 are required")]
    TooFewVertices(usize),

    /// A vertex holds NaN or infinity
    #[error("Polygon vertex {0} is not finite")]
    NonFinite(usize),

    /// All vertices are (nearly) collinear
    #[error("Polygon has zero area")]
    ZeroArea,

    /// Input the clipper cannot handle without perturbation
    #[error("Degenerate polygon configuration: {0}")]
    Degenerate(&'static str),

    /// A point could not be projected into the comparison plane
    #[error("Point is on or behind the projection horizon")]
    BehindHorizon,

    /// The clip traversal did not close
    #[error("Polygon clip traversal did not terminate")]
    TraversalFailed,
}

/// A simple polygon, implicitly closed
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    /// Build a polygon from its vertices. A repeated closing vertex is
    /// dropped.
    pub fn new(mut points: Vec<Vec2>) -> Result<Self, GeometryError> {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 3 {
            return Err(GeometryError::TooFewVertices(points.len()));
        }
        if let Some(index) = points.iter().position(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(GeometryError::NonFinite(index));
        }
        let polygon = Self { points };
        if polygon.signed_area().abs() <= EPSILON {
            return Err(GeometryError::ZeroArea);
        }
        Ok(polygon)
    }

    /// Vertices in order
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed polygon
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area, positive for counter-clockwise winding
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        let twice: f64 = (0..n)
            .map(|i| cross(&self.points[i], &self.points[(i + 1) % n]))
            .sum();
        twice * 0.5
    }

    /// Unsigned area
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Even-odd ray casting test
    pub fn contains_point(&self, point: &Vec2) -> bool {
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (pi, pj) = (&self.points[i], &self.points[j]);
            if (pi.y > point.y) != (pj.y > point.y) {
                let x = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
                if point.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Whether every vertex of `other` is inside this polygon
    pub fn contains_polygon(&self, other: &Polygon) -> bool {
        other.points.iter().all(|p| self.contains_point(p))
    }

    /// Regions where this polygon and `other` overlap
    pub fn intersection(&self, other: &Polygon) -> Result<Vec<Polygon>, GeometryError> {
        Clipper::new(self, other)?.intersection(self, other)
    }
}

/// Narrow-phase overlap rule.
///
/// True when clipping yields exactly one region, or when one polygon lies
/// entirely inside the other. When the clipper reports touching or shared
/// boundaries, any contact counts as overlap.
pub fn polygons_intersect(a: &Polygon, b: &Polygon) -> Result<bool, GeometryError> {
    match a.intersection(b) {
        Ok(regions) if regions.len() == 1 => Ok(true),
        Ok(_) => Ok(b.contains_polygon(a) || a.contains_polygon(b)),
        Err(GeometryError::Degenerate(reason)) => {
            log::trace!("Clip degenerate ({reason}); falling back to contact test");
            Ok(in_contact(a, b))
        }
        Err(err) => Err(err),
    }
}

/// Whether two polygons share any point, boundaries included
fn in_contact(a: &Polygon, b: &Polygon) -> bool {
    if a.points.iter().any(|p| b.contains_point(p)) || b.points.iter().any(|p| a.contains_point(p)) {
        return true;
    }
    edges(a).any(|(p0, p1)| {
        edges(b).any(|(q0, q1)| !matches!(edge_intersection(p0, p1, q0, q1), Ok(EdgeHit::Miss)))
    })
}

fn edges<'a>(polygon: &'a Polygon) -> impl Iterator<Item = (&'a Vec2, &'a Vec2)> + 'a {
    let n = polygon.points.len();
    (0..n).map(move |i| (&polygon.points[i], &polygon.points[(i + 1) % n]))
}

fn cross(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Vertex of a Greiner-Hormann list
#[derive(Debug, Clone)]
struct Node {
    point: Vec2,
    next: usize,
    prev: usize,
    intersect: bool,
    entry: bool,
    neighbor: Option<usize>,
    alpha: f64,
    visited: bool,
}

impl Node {
    fn vertex(point: Vec2) -> Self {
        Self {
            point,
            next: 0,
            prev: 0,
            intersect: false,
            entry: false,
            neighbor: None,
            alpha: 0.0,
            visited: false,
        }
    }
}

/// Both vertex lists live in one arena and link by index
struct Clipper {
    nodes: Vec<Node>,
    subject: Vec<usize>,
    clip: Vec<usize>,
}

enum EdgeHit {
    Miss,
    Cross { alpha_s: f64, alpha_c: f64, point: Vec2 },
}

impl Clipper {
    fn new(subject: &Polygon, clip: &Polygon) -> Result<Self, GeometryError> {
        let mut clipper = Self {
            nodes: Vec::with_capacity(subject.len() + clip.len()),
            subject: Vec::new(),
            clip: Vec::new(),
        };
        clipper.subject = clipper.push_ring(subject.points());
        clipper.clip = clipper.push_ring(clip.points());
        clipper.insert_intersections()?;
        Ok(clipper)
    }

    fn push_ring(&mut self, points: &[Vec2]) -> Vec<usize> {
        let start = self.nodes.len();
        let n = points.len();
        for (i, p) in points.iter().enumerate() {
            let mut node = Node::vertex(*p);
            node.next = start + (i + 1) % n;
            node.prev = start + (i + n - 1) % n;
            self.nodes.push(node);
        }
        (start..start + n).collect()
    }

    fn insert_intersections(&mut self) -> Result<(), GeometryError> {
        let ns = self.subject.len();
        let nc = self.clip.len();
        for i in 0..ns {
            let (s0, s1) = (self.subject[i], self.subject[(i + 1) % ns]);
            for j in 0..nc {
                let (c0, c1) = (self.clip[j], self.clip[(j + 1) % nc]);
                let hit = edge_intersection(
                    &self.nodes[s0].point,
                    &self.nodes[s1].point,
                    &self.nodes[c0].point,
                    &self.nodes[c1].point,
                )?;
                if let EdgeHit::Cross { alpha_s, alpha_c, point } = hit {
                    let si = self.insert_between(s0, s1, point, alpha_s);
                    let ci = self.insert_between(c0, c1, point, alpha_c);
                    self.nodes[si].neighbor = Some(ci);
                    self.nodes[ci].neighbor = Some(si);
                }
            }
        }
        Ok(())
    }

    /// Insert an intersection node between two original vertices, ordered by
    /// its edge parameter.
    fn insert_between(&mut self, from: usize, to: usize, point: Vec2, alpha: f64) -> usize {
        let mut cursor = from;
        loop {
            let next = self.nodes[cursor].next;
            if next == to || self.nodes[next].alpha > alpha {
                break;
            }
            cursor = next;
        }

        let index = self.nodes.len();
        let next = self.nodes[cursor].next;
        self.nodes.push(Node {
            point,
            next,
            prev: cursor,
            intersect: true,
            entry: false,
            neighbor: None,
            alpha,
            visited: false,
        });
        self.nodes[cursor].next = index;
        self.nodes[next].prev = index;
        index
    }

    fn mark_entries(&mut self, ring_start: usize, other: &Polygon) {
        let mut entry = !other.contains_point(&self.nodes[ring_start].point);
        let mut cursor = ring_start;
        loop {
            if self.nodes[cursor].intersect {
                self.nodes[cursor].entry = entry;
                entry = !entry;
            }
            cursor = self.nodes[cursor].next;
            if cursor == ring_start {
                break;
            }
        }
    }

    fn intersection(mut self, subject: &Polygon, clip: &Polygon) -> Result<Vec<Polygon>, GeometryError> {
        let subject_start = self.subject[0];
        let clip_start = self.clip[0];
        self.mark_entries(subject_start, clip);
        self.mark_entries(clip_start, subject);

        let budget = self.nodes.len() * 2 + 4;
        let mut regions = Vec::new();

        while let Some(start) = self.first_unvisited(subject_start) {
            let mut points = Vec::new();
            let mut current = start;
            let mut steps = 0usize;

            while !self.nodes[current].visited {
                self.nodes[current].visited = true;
                let neighbor = self.nodes[current].neighbor.ok_or(GeometryError::TraversalFailed)?;
                self.nodes[neighbor].visited = true;
                points.push(self.nodes[current].point);

                let forward = self.nodes[current].entry;
                let mut cursor = current;
                loop {
                    cursor = if forward { self.nodes[cursor].next } else { self.nodes[cursor].prev };
                    steps += 1;
                    if steps > budget {
                        return Err(GeometryError::TraversalFailed);
                    }
                    if self.nodes[cursor].intersect {
                        break;
                    }
                    points.push(self.nodes[cursor].point);
                }
                current = self.nodes[cursor].neighbor.ok_or(GeometryError::TraversalFailed)?;
            }

            match Polygon::new(points) {
                Ok(region) => regions.push(region),
                Err(GeometryError::ZeroArea | GeometryError::TooFewVertices(_)) => {
                    return Err(GeometryError::Degenerate("clip produced a sliver"));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(regions)
    }

    fn first_unvisited(&self, ring_start: usize) -> Option<usize> {
        let mut cursor = ring_start;
        loop {
            let node = &self.nodes[cursor];
            if node.intersect && !node.visited {
                return Some(cursor);
            }
            cursor = node.next;
            if cursor == ring_start {
                return None;
            }
        }
    }
}

fn edge_intersection(p0: &Vec2, p1: &Vec2, q0: &Vec2, q1: &Vec2) -> Result<EdgeHit, GeometryError> {
    let d1 = p1 - p0;
    let d2 = q1 - q0;
    let offset = q0 - p0;
    let denom = cross(&d1, &d2);
    let scale = d1.norm() * d2.norm();

    if denom.abs() <= EPSILON * scale {
        // Parallel; only a problem if the edges share a line and overlap
        if cross(&offset, &d1).abs() > EPSILON * d1.norm() * offset.norm().max(1.0) {
            return Ok(EdgeHit::Miss);
        }
        let len2 = d1.norm_squared();
        let t0 = offset.dot(&d1) / len2;
        let t1 = (q1 - p0).dot(&d1) / len2;
        let (lo, hi) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
        if hi >= -EPSILON && lo <= 1.0 + EPSILON {
            return Err(GeometryError::Degenerate("collinear overlapping edges"));
        }
        return Ok(EdgeHit::Miss);
    }

    let alpha_s = cross(&offset, &d2) / denom;
    let alpha_c = cross(&offset, &d1) / denom;
    let strictly_inside = |t: f64| t > EPSILON && t < 1.0 - EPSILON;
    let within = |t: f64| (-EPSILON..=1.0 + EPSILON).contains(&t);

    if strictly_inside(alpha_s) && strictly_inside(alpha_c) {
        Ok(EdgeHit::Cross {
            alpha_s,
            alpha_c,
            point: p0 + d1 * alpha_s,
        })
    } else if within(alpha_s) && within(alpha_c) {
        Err(GeometryError::Degenerate("vertex on edge"))
    } else {
        Ok(EdgeHit::Miss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::new(vec![
            Vec2::new(x, y),
            Vec2::new(x + size, y),
            Vec2::new(x + size, y + size),
            Vec2::new(x, y + size),
        ])
        .unwrap()
    }

    #[test]
    fn test_construction_rejects_bad_input() {
        assert_eq!(
            Polygon::new(vec![Vec2::zeros(), Vec2::new(1.0, 0.0)]),
            Err(GeometryError::TooFewVertices(2))
        );
        assert_eq!(
            Polygon::new(vec![Vec2::zeros(), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)]),
            Err(GeometryError::ZeroArea)
        );
        assert_eq!(
            Polygon::new(vec![Vec2::zeros(), Vec2::new(f64::NAN, 0.0), Vec2::new(0.0, 1.0)]),
            Err(GeometryError::NonFinite(1))
        );
    }

    #[test]
    fn test_closing_vertex_is_dropped() {
        let poly = Polygon::new(vec![
            Vec2::zeros(),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::zeros(),
        ])
        .unwrap();
        assert_eq!(poly.len(), 3);
        assert_relative_eq!(poly.signed_area(), 0.5);
    }

    #[test]
    fn test_point_in_polygon_even_odd() {
        // Concave "C" shape
        let c = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 2.0),
            Vec2::new(3.0, 2.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(0.0, 3.0),
        ])
        .unwrap();
        assert!(c.contains_point(&Vec2::new(0.5, 1.5)));
        assert!(!c.contains_point(&Vec2::new(2.0, 1.5)));
        assert!(!c.contains_point(&Vec2::new(-1.0, 1.5)));
    }

    #[test]
    fn test_overlapping_squares_clip_to_one_region() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 1.0, 2.0);
        let regions = a.intersection(&b).unwrap();
        assert_eq!(regions.len(), 1);
        assert_relative_eq!(regions[0].area(), 1.0, epsilon = 1e-12);
        assert!(polygons_intersect(&a, &b).unwrap());
    }

    #[test]
    fn test_clip_is_winding_independent() {
        let a = square(0.0, 0.0, 2.0);
        let mut reversed = square(1.0, 0.5, 2.0).points().to_vec();
        reversed.reverse();
        let b = Polygon::new(reversed).unwrap();
        let regions = a.intersection(&b).unwrap();
        assert_eq!(regions.len(), 1);
        assert_relative_eq!(regions[0].area(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_disjoint_polygons() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(5.0, 5.0, 1.0);
        assert!(a.intersection(&b).unwrap().is_empty());
        assert!(!polygons_intersect(&a, &b).unwrap());
    }

    #[test]
    fn test_containment_counts_as_intersection() {
        let outer = square(0.0, 0.0, 10.0);
        let inner = square(4.0, 4.0, 1.0);
        assert!(outer.intersection(&inner).unwrap().is_empty());
        assert!(polygons_intersect(&outer, &inner).unwrap());
        assert!(polygons_intersect(&inner, &outer).unwrap());
    }

    #[test]
    fn test_two_regions_do_not_count() {
        // A "U" cut by a bar across both arms gives two separate regions
        let u = Polygon::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(2.0, 3.0),
            Vec2::new(2.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 3.0),
            Vec2::new(0.0, 3.0),
        ])
        .unwrap();
        let bar = Polygon::new(vec![
            Vec2::new(-0.5, 2.0),
            Vec2::new(3.5, 2.0),
            Vec2::new(3.5, 2.5),
            Vec2::new(-0.5, 2.5),
        ])
        .unwrap();
        assert_eq!(u.intersection(&bar).unwrap().len(), 2);
        assert!(!polygons_intersect(&u, &bar).unwrap());
    }

    #[test]
    fn test_shared_edge_is_degenerate_but_in_contact() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(1.0, 0.0, 1.0);
        assert!(matches!(a.intersection(&b), Err(GeometryError::Degenerate(_))));
        assert!(polygons_intersect(&a, &b).unwrap());
    }

    #[test]
    fn test_coincident_polygons_intersect() {
        let a = square(0.0, 0.0, 1.0);
        let b = a.clone();
        assert!(matches!(a.intersection(&b), Err(GeometryError::Degenerate(_))));
        assert!(polygons_intersect(&a, &b).unwrap());
        assert!(polygons_intersect(&b, &a).unwrap());
    }

    #[test]
    fn test_crossing_bars_in_contact() {
        let horizontal = Polygon::new(vec![
            Vec2::new(-2.0, -0.5),
            Vec2::new(2.0, -0.5),
            Vec2::new(2.0, 0.5),
            Vec2::new(-2.0, 0.5),
        ])
        .unwrap();
        let vertical = Polygon::new(vec![
            Vec2::new(-0.5, -2.0),
            Vec2::new(0.5, -2.0),
            Vec2::new(0.5, 2.0),
            Vec2::new(-0.5, 2.0),
        ])
        .unwrap();
        let apart = square(5.0, 5.0, 1.0);
        assert!(in_contact(&horizontal, &vertical));
        assert!(!in_contact(&horizontal, &apart));
    }

    #[test]
    fn test_vertex_on_edge_is_degenerate() {
        let a = square(0.0, 0.0, 2.0);
        let tri = Polygon::new(vec![
            Vec2::new(1.0, 2.0),
            Vec2::new(2.0, 4.0),
            Vec2::new(0.0, 4.0),
        ])
        .unwrap();
        assert!(matches!(a.intersection(&tri), Err(GeometryError::Degenerate(_))));
        assert!(polygons_intersect(&a, &tri).unwrap());
    }
}
