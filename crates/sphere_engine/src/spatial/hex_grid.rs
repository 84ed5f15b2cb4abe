//! Hierarchical hexagonal tessellation of the sphere
//!
//! Cells are the Voronoi regions of a geodesic lattice on the icosahedron.
//! At resolution `r` every icosahedron face carries a triangular lattice of
//! frequency `n(r)`; lattice points are projected radially onto the unit
//! sphere. Every cell is a hexagon except the twelve pentagons sitting on the
//! icosahedron vertices.
//!
//! The frequency grows by roughly `sqrt(7)` per resolution step, so each step
//! multiplies the cell count by about seven. Resolution 0 has 92 cells.
//!
//! A lattice point shared by several faces (on an icosahedron edge or corner)
//! has a single canonical [`CellId`], so ids compare equal no matter which face
//! produced them.

use crate::foundation::math::{Vec3, EPSILON, FORWARD, UP};
use nalgebra::Matrix3;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Finest supported resolution
pub const MAX_RESOLUTION: u8 = 12;

const WALK_LIMIT: usize = 256;

/// Spatial index errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpatialError {
    /// Resolution above [`MAX_RESOLUTION`]
    #[error("Resolution {resolution} is out of range (max {max})")]
    ResolutionOutOfRange {
        /// Requested resolution
        resolution: u8,
        /// Finest resolution supported
        max: u8,
    },

    /// Id that names no lattice point
    #[error("Invalid cell id {0}")]
    InvalidCell(CellId),

    /// Text that is not a cell id
    #[error("Cannot parse cell id '{0}'")]
    Parse(String),

    /// Position that is not a finite, non-zero vector
    #[error("Position is not a finite non-zero vector")]
    InvalidPosition,

    /// Footprint radius that is negative or not finite
    #[error("Footprint radius is not a finite non-negative number")]
    InvalidRadius,
}

/// Lattice point class of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKind {
    /// Icosahedron corner (pentagon)
    Vertex(u8),
    /// Point on the icosahedron edge `lo`-`hi`, `t` steps from `lo`
    Edge {
        /// Lower corner index
        lo: u8,
        /// Higher corner index
        hi: u8,
        /// Steps from `lo`
        t: u32,
    },
    /// Point inside `face` with lattice weights `a`, `b` (the third is implied)
    Face {
        /// Face index
        face: u8,
        /// First lattice weight
        a: u32,
        /// Second lattice weight
        b: u32,
    },
}

/// Identifier of one cell at one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    resolution: u8,
    kind: CellKind,
}

impl CellId {
    /// Resolution of the cell
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    /// Lattice class of the cell
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// Whether the cell is one of the twelve pentagons
    pub fn is_pentagon(&self) -> bool {
        matches!(self.kind, CellKind::Vertex(_))
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CellKind::Vertex(v) => write!(f, "r{}:v{}", self.resolution, v),
            CellKind::Edge { lo, hi, t } => write!(f, "r{}:e{}-{}:{}", self.resolution, lo, hi, t),
            CellKind::Face { face, a, b } => write!(f, "r{}:f{}:{}-{}", self.resolution, face, a, b),
        }
    }
}

impl FromStr for CellId {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = || SpatialError::Parse(s.to_string());
        let rest = s.strip_prefix('r').ok_or_else(parse_error)?;
        let (resolution, body) = rest.split_once(':').ok_or_else(parse_error)?;
        let resolution: u8 = resolution.parse().map_err(|_| parse_error())?;

        let kind = if let Some(v) = body.strip_prefix('v') {
            CellKind::Vertex(v.parse().map_err(|_| parse_error())?)
        } else if let Some(edge) = body.strip_prefix('e') {
            let (ends, t) = edge.split_once(':').ok_or_else(parse_error)?;
            let (lo, hi) = ends.split_once('-').ok_or_else(parse_error)?;
            CellKind::Edge {
                lo: lo.parse().map_err(|_| parse_error())?,
                hi: hi.parse().map_err(|_| parse_error())?,
                t: t.parse().map_err(|_| parse_error())?,
            }
        } else if let Some(face) = body.strip_prefix('f') {
            let (face, weights) = face.split_once(':').ok_or_else(parse_error)?;
            let (a, b) = weights.split_once('-').ok_or_else(parse_error)?;
            CellKind::Face {
                face: face.parse().map_err(|_| parse_error())?,
                a: a.parse().map_err(|_| parse_error())?,
                b: b.parse().map_err(|_| parse_error())?,
            }
        } else {
            return Err(parse_error());
        };
        Ok(CellId { resolution, kind })
    }
}

/// One face-local view of a lattice point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LatticePoint {
    face: u8,
    weights: [u32; 3],
}

/// Lattice frequency at `resolution`
pub fn frequency(resolution: u8) -> u32 {
    (12.0 * 7f64.powi(i32::from(resolution))).sqrt().round() as u32
}

/// Number of cells covering the sphere at `resolution`
pub fn cell_count(resolution: u8) -> u64 {
    let n = u64::from(frequency(resolution));
    10 * n * n + 2
}

/// Geodesic hex grid over the unit sphere
#[derive(Debug, Clone)]
pub struct HexGrid {
    vertices: [Vec3; 12],
    faces: Vec<[u8; 3]>,
    /// Inverse of the matrix whose columns are a face's corners
    inverses: Vec<Option<Matrix3<f64>>>,
}

impl Default for HexGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl HexGrid {
    /// Build the base icosahedron
    pub fn new() -> Self {
        let phi = (1.0 + 5f64.sqrt()) / 2.0;
        let raw = [
            (-1.0, phi, 0.0),
            (1.0, phi, 0.0),
            (-1.0, -phi, 0.0),
            (1.0, -phi, 0.0),
            (0.0, -1.0, phi),
            (0.0, 1.0, phi),
            (0.0, -1.0, -phi),
            (0.0, 1.0, -phi),
            (phi, 0.0, -1.0),
            (phi, 0.0, 1.0),
            (-phi, 0.0, -1.0),
            (-phi, 0.0, 1.0),
        ];
        let vertices = raw.map(|(x, y, z)| Vec3::new(x, y, z).normalize());

        let edge = (0..12)
            .flat_map(|i| (i + 1..12).map(move |j| (i, j)))
            .map(|(i, j)| (vertices[i] - vertices[j]).norm())
            .fold(f64::INFINITY, f64::min);
        let adjacent = |i: usize, j: usize| ((vertices[i] - vertices[j]).norm() - edge).abs() < 1e-6;

        let mut faces = Vec::with_capacity(20);
        for i in 0..12 {
            for j in i + 1..12 {
                for k in j + 1..12 {
                    if adjacent(i, j) && adjacent(j, k) && adjacent(i, k) {
                        let normal = (vertices[j] - vertices[i]).cross(&(vertices[k] - vertices[i]));
                        // Counter-clockwise seen from outside
                        let face = if normal.dot(&vertices[i]) > 0.0 { [i, j, k] } else { [i, k, j] };
                        faces.push(face.map(|v| v as u8));
                    }
                }
            }
        }

        let inverses = faces
            .iter()
            .map(|f| {
                Matrix3::from_columns(&[
                    vertices[f[0] as usize],
                    vertices[f[1] as usize],
                    vertices[f[2] as usize],
                ])
                .try_inverse()
            })
            .collect();

        log::debug!("Built hex grid base with {} faces", faces.len());
        Self { vertices, faces, inverses }
    }

    fn check_resolution(resolution: u8) -> Result<(), SpatialError> {
        if resolution > MAX_RESOLUTION {
            return Err(SpatialError::ResolutionOutOfRange {
                resolution,
                max: MAX_RESOLUTION,
            });
        }
        Ok(())
    }

    /// Cell whose center is nearest to `position` (any non-zero vector)
    pub fn cell_containing(&self, position: &Vec3, resolution: u8) -> Result<CellId, SpatialError> {
        Self::check_resolution(resolution)?;
        let norm = position.norm();
        if !(norm.is_finite() && norm > EPSILON) {
            return Err(SpatialError::InvalidPosition);
        }
        let target = position / norm;
        let n = frequency(resolution);

        let (face, bary) = self.locate_face(&target).ok_or(SpatialError::InvalidPosition)?;
        let x = bary[0] * f64::from(n);
        let y = bary[1] * f64::from(n);

        let mut best: Option<(CellId, f64)> = None;
        for a in [x.floor(), x.floor() + 1.0] {
            for b in [y.floor(), y.floor() + 1.0] {
                let c = f64::from(n) - a - b;
                if a < 0.0 || b < 0.0 || c < 0.0 {
                    continue;
                }
                let point = LatticePoint {
                    face,
                    weights: [a as u32, b as u32, c as u32],
                };
                let score = self.point_position(&point).dot(&target);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((self.canonical(resolution, &point), score));
                }
            }
        }
        let (mut current, mut score) = best.ok_or(SpatialError::InvalidPosition)?;

        // Greedy walk on the neighbor graph towards the nearest center
        for _ in 0..WALK_LIMIT {
            let mut improved = false;
            for neighbor in self.neighbors(current)? {
                let s = self.cell_center(neighbor)?.dot(&target);
                if s > score + EPSILON * EPSILON {
                    current = neighbor;
                    score = s;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
        Ok(current)
    }

    /// Unit vector at the center of `cell`
    pub fn cell_center(&self, cell: CellId) -> Result<Vec3, SpatialError> {
        let point = self
            .representations(cell)?
            .into_iter()
            .next()
            .ok_or(SpatialError::InvalidCell(cell))?;
        Ok(self.point_position(&point))
    }

    /// Cells sharing an edge with `cell`, sorted by id
    pub fn neighbors(&self, cell: CellId) -> Result<Vec<CellId>, SpatialError> {
        let resolution = cell.resolution;
        let mut found = Vec::with_capacity(6);
        for point in self.representations(cell)? {
            for from in 0..3 {
                if point.weights[from] == 0 {
                    continue;
                }
                for to in 0..3 {
                    if to == from {
                        continue;
                    }
                    let mut weights = point.weights;
                    weights[from] -= 1;
                    weights[to] += 1;
                    let id = self.canonical(resolution, &LatticePoint { face: point.face, weights });
                    if id != cell && !found.contains(&id) {
                        found.push(id);
                    }
                }
            }
        }
        found.sort_unstable();
        Ok(found)
    }

    /// Every cell within `k` neighbor steps of `cell`, `cell` first, then by
    /// ring distance
    pub fn k_ring(&self, cell: CellId, k: u32) -> Result<Vec<CellId>, SpatialError> {
        let mut seen = HashSet::from([cell]);
        let mut ring = vec![cell];
        let mut queue = VecDeque::from([(cell, 0u32)]);
        while let Some((current, distance)) = queue.pop_front() {
            if distance == k {
                continue;
            }
            for neighbor in self.neighbors(current)? {
                if seen.insert(neighbor) {
                    ring.push(neighbor);
                    queue.push_back((neighbor, distance + 1));
                }
            }
        }
        Ok(ring)
    }

    /// Boundary vertices of `cell` on the unit sphere, counter-clockwise seen
    /// from outside
    pub fn cell_boundary(&self, cell: CellId) -> Result<Vec<Vec3>, SpatialError> {
        let center = self.cell_center(cell)?;
        let reference = if center.dot(&UP).abs() < 0.9 { UP } else { FORWARD };
        let e1 = reference.cross(&center).normalize();
        let e2 = center.cross(&e1);

        let mut around: Vec<(f64, Vec3)> = self
            .neighbors(cell)?
            .into_iter()
            .map(|id| self.cell_center(id))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|p| (p.dot(&e2).atan2(p.dot(&e1)), p))
            .collect();
        around.sort_by(|a, b| a.0.total_cmp(&b.0));

        let count = around.len();
        let boundary = (0..count)
            .map(|i| {
                let a = around[i].1;
                let b = around[(i + 1) % count].1;
                let corner = (a - center).cross(&(b - center)).normalize();
                if corner.dot(&center) < 0.0 {
                    -corner
                } else {
                    corner
                }
            })
            .collect();
        Ok(boundary)
    }

    /// Cell one resolution coarser whose center is nearest to this one's
    pub fn parent(&self, cell: CellId) -> Result<Option<CellId>, SpatialError> {
        if cell.resolution == 0 {
            return Ok(None);
        }
        let center = self.cell_center(cell)?;
        self.cell_containing(&center, cell.resolution - 1).map(Some)
    }

    /// Every cell at `resolution`. Only sensible for coarse resolutions.
    pub fn cells(&self, resolution: u8) -> Result<Vec<CellId>, SpatialError> {
        Self::check_resolution(resolution)?;
        let n = frequency(resolution);
        let mut cells = HashSet::new();
        for face in 0..self.faces.len() as u8 {
            for a in 0..=n {
                for b in 0..=n - a {
                    let point = LatticePoint {
                        face,
                        weights: [a, b, n - a - b],
                    };
                    cells.insert(self.canonical(resolution, &point));
                }
            }
        }
        let mut cells: Vec<_> = cells.into_iter().collect();
        cells.sort_unstable();
        Ok(cells)
    }

    fn point_position(&self, point: &LatticePoint) -> Vec3 {
        let face = self.faces[point.face as usize];
        let sum = (0..3).fold(Vec3::zeros(), |acc, i| {
            acc + self.vertices[face[i] as usize] * f64::from(point.weights[i])
        });
        sum.normalize()
    }

    /// Face whose cone holds `direction`, with normalized barycentric weights
    fn locate_face(&self, direction: &Vec3) -> Option<(u8, [f64; 3])> {
        let mut best: Option<(u8, [f64; 3], f64)> = None;
        for (index, inverse) in self.inverses.iter().enumerate() {
            let Some(inverse) = inverse else { continue };
            let lambda = inverse * direction;
            let sum = lambda.x + lambda.y + lambda.z;
            if sum <= 0.0 {
                continue;
            }
            let bary = [lambda.x / sum, lambda.y / sum, lambda.z / sum];
            let worst = bary.iter().copied().fold(f64::INFINITY, f64::min);
            if best.map_or(true, |(_, _, w)| worst > w) {
                best = Some((index as u8, bary, worst));
            }
        }
        best.map(|(face, bary, _)| (face, bary))
    }

    fn canonical(&self, resolution: u8, point: &LatticePoint) -> CellId {
        let face = self.faces[point.face as usize];
        let occupied: Vec<usize> = (0..3).filter(|&i| point.weights[i] > 0).collect();
        let kind = match occupied.as_slice() {
            [i] => CellKind::Vertex(face[*i]),
            [i, j] => {
                let (lo_slot, hi_slot) = if face[*i] < face[*j] { (*i, *j) } else { (*j, *i) };
                CellKind::Edge {
                    lo: face[lo_slot],
                    hi: face[hi_slot],
                    t: point.weights[hi_slot],
                }
            }
            _ => CellKind::Face {
                face: point.face,
                a: point.weights[0],
                b: point.weights[1],
            },
        };
        CellId { resolution, kind }
    }

    /// Every face-local view of a cell's lattice point
    fn representations(&self, cell: CellId) -> Result<Vec<LatticePoint>, SpatialError> {
        Self::check_resolution(cell.resolution)?;
        let n = frequency(cell.resolution);
        let invalid = || SpatialError::InvalidCell(cell);
        let slot_of = |face: &[u8; 3], vertex: u8| face.iter().position(|&v| v == vertex);

        let points: Vec<LatticePoint> = match cell.kind {
            CellKind::Vertex(v) => self
                .faces
                .iter()
                .enumerate()
                .filter_map(|(index, face)| {
                    let slot = slot_of(face, v)?;
                    let mut weights = [0; 3];
                    weights[slot] = n;
                    Some(LatticePoint { face: index as u8, weights })
                })
                .collect(),
            CellKind::Edge { lo, hi, t } => {
                if lo >= hi || t == 0 || t >= n {
                    return Err(invalid());
                }
                self.faces
                    .iter()
                    .enumerate()
                    .filter_map(|(index, face)| {
                        let lo_slot = slot_of(face, lo)?;
                        let hi_slot = slot_of(face, hi)?;
                        let mut weights = [0; 3];
                        weights[lo_slot] = n - t;
                        weights[hi_slot] = t;
                        Some(LatticePoint { face: index as u8, weights })
                    })
                    .collect()
            }
            CellKind::Face { face, a, b } => {
                if face as usize >= self.faces.len() || a == 0 || b == 0 || a + b >= n {
                    return Err(invalid());
                }
                vec![LatticePoint {
                    face,
                    weights: [a, b, n - a - b],
                }]
            }
        };

        if points.is_empty() {
            return Err(invalid());
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils::lat_lng_to_unit;
    use approx::assert_relative_eq;

    fn nearest_by_scan(grid: &HexGrid, cells: &[CellId], p: &Vec3) -> CellId {
        let mut best = cells[0];
        let mut best_dot = f64::NEG_INFINITY;
        for &cell in cells {
            let d = grid.cell_center(cell).unwrap().dot(p);
            if d > best_dot {
                best_dot = d;
                best = cell;
            }
        }
        best
    }

    #[test]
    fn test_base_icosahedron() {
        let grid = HexGrid::new();
        assert_eq!(grid.faces.len(), 20);
        assert!(grid.inverses.iter().all(Option::is_some));
    }

    #[test]
    fn test_cell_counts_match_enumeration() {
        let grid = HexGrid::new();
        assert_eq!(cell_count(0), 92);
        for resolution in 0..=1 {
            let cells = grid.cells(resolution).unwrap();
            assert_eq!(cells.len() as u64, cell_count(resolution));
            assert_eq!(cells.iter().filter(|c| c.is_pentagon()).count(), 12);
        }
        // Roughly sevenfold growth per step
        let ratio = cell_count(4) as f64 / cell_count(3) as f64;
        assert!((6.0..8.0).contains(&ratio));
    }

    #[test]
    fn test_neighbor_graph_is_symmetric() {
        let grid = HexGrid::new();
        for cell in grid.cells(1).unwrap() {
            let neighbors = grid.neighbors(cell).unwrap();
            let expected = if cell.is_pentagon() { 5 } else { 6 };
            assert_eq!(neighbors.len(), expected, "{cell}");
            for neighbor in neighbors {
                assert!(grid.neighbors(neighbor).unwrap().contains(&cell));
            }
        }
    }

    #[test]
    fn test_cell_containing_own_center() {
        let grid = HexGrid::new();
        for resolution in 0..=1 {
            for cell in grid.cells(resolution).unwrap() {
                let center = grid.cell_center(cell).unwrap();
                assert_eq!(grid.cell_containing(&(center * 7.0), resolution).unwrap(), cell);
            }
        }
    }

    #[test]
    fn test_cell_containing_is_nearest_center() {
        let grid = HexGrid::new();
        let cells = grid.cells(1).unwrap();
        for lat in (-85..=85).step_by(17) {
            for lng in (-175..=175).step_by(23) {
                let p = lat_lng_to_unit(f64::from(lat).to_radians(), f64::from(lng).to_radians());
                let found = grid.cell_containing(&p, 1).unwrap();
                let expected = nearest_by_scan(&grid, &cells, &p);
                let found_dot = grid.cell_center(found).unwrap().dot(&p);
                let expected_dot = grid.cell_center(expected).unwrap().dot(&p);
                assert_relative_eq!(found_dot, expected_dot, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_boundary_vertices_are_equidistant() {
        let grid = HexGrid::new();
        let cell = grid.cell_containing(&lat_lng_to_unit(0.3, 1.1), 2).unwrap();
        let center = grid.cell_center(cell).unwrap();
        let boundary = grid.cell_boundary(cell).unwrap();
        assert_eq!(boundary.len(), grid.neighbors(cell).unwrap().len());

        let neighbors: Vec<_> = grid
            .neighbors(cell)
            .unwrap()
            .into_iter()
            .map(|n| grid.cell_center(n).unwrap())
            .collect();
        for corner in &boundary {
            assert_relative_eq!(corner.norm(), 1.0, epsilon = 1e-12);
            let to_center = (corner - center).norm();
            // Each corner is shared with exactly two neighbors at the same distance
            let matches = neighbors
                .iter()
                .filter(|n| ((*n - corner).norm() - to_center).abs() < 1e-9)
                .count();
            assert_eq!(matches, 2);
        }
    }

    #[test]
    fn test_k_ring_sizes() {
        let grid = HexGrid::new();
        let hex = grid.cell_containing(&lat_lng_to_unit(0.2, 0.4), 3).unwrap();
        assert!(!hex.is_pentagon());
        assert_eq!(grid.k_ring(hex, 0).unwrap(), vec![hex]);
        assert_eq!(grid.k_ring(hex, 1).unwrap().len(), 7);
        assert_eq!(grid.k_ring(hex, 2).unwrap().len(), 19);

        let pentagon = CellId {
            resolution: 3,
            kind: CellKind::Vertex(0),
        };
        assert_eq!(grid.k_ring(pentagon, 1).unwrap().len(), 6);
    }

    #[test]
    fn test_parent_is_one_level_coarser() {
        let grid = HexGrid::new();
        let p = lat_lng_to_unit(-0.7, 2.5);
        let child = grid.cell_containing(&p, 4).unwrap();
        let parent = grid.parent(child).unwrap().unwrap();
        assert_eq!(parent.resolution(), 3);
        let child_center = grid.cell_center(child).unwrap();
        assert_eq!(grid.cell_containing(&child_center, 3).unwrap(), parent);
        assert_eq!(grid.parent(grid.cell_containing(&p, 0).unwrap()).unwrap(), None);
    }

    #[test]
    fn test_ids_round_trip_through_text() {
        let grid = HexGrid::new();
        for cell in grid.cells(0).unwrap() {
            let text = cell.to_string();
            assert_eq!(text.parse::<CellId>().unwrap(), cell);
        }
        assert!(matches!("q1:v0".parse::<CellId>(), Err(SpatialError::Parse(_))));
    }

    #[test]
    fn test_invalid_input() {
        let grid = HexGrid::new();
        assert_eq!(
            grid.cell_containing(&UP, MAX_RESOLUTION + 1),
            Err(SpatialError::ResolutionOutOfRange {
                resolution: MAX_RESOLUTION + 1,
                max: MAX_RESOLUTION
            })
        );
        assert_eq!(grid.cell_containing(&Vec3::zeros(), 0), Err(SpatialError::InvalidPosition));
        let bogus = CellId {
            resolution: 0,
            kind: CellKind::Face { face: 3, a: 2, b: 2 },
        };
        assert_eq!(grid.cell_center(bogus), Err(SpatialError::InvalidCell(bogus)));
    }
}
