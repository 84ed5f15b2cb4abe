//! Footprint index
//!
//! Maps an entity's position and footprint radius to the hex cells its
//! circular extent overlaps. Results are memoized per kind and coarse cell;
//! the memo is not invalidated when an entity moves inside the same coarse
//! cell, so a footprint may lag its entity by up to one coarse cell.
//!
//! The index is independent of collision detection.

use crate::core::config::FootprintConfig;
use crate::ecs::EntityKind;
use crate::foundation::collections::LruCache;
use crate::foundation::math::Vec3;
use crate::physics::collision::BoundingSphere;
use crate::spatial::hex_grid::{CellId, HexGrid, SpatialError};
use std::collections::HashSet;

type MemoKey = (EntityKind, CellId, u8);

/// Cache counters of a [`FootprintIndex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FootprintStats {
    /// Memoized footprints returned
    pub memo_hits: u64,
    /// Footprints computed
    pub memo_misses: u64,
    /// k-rings served from cache
    pub ring_hits: u64,
    /// k-rings computed
    pub ring_misses: u64,
    /// Cell spheres served from cache
    pub sphere_hits: u64,
    /// Cell spheres computed
    pub sphere_misses: u64,
}

/// Cached footprint queries over a [`HexGrid`] scaled to the playing sphere
pub struct FootprintIndex {
    grid: HexGrid,
    sphere_radius: f64,
    coarse_resolution: u8,
    memo: LruCache<MemoKey, HashSet<CellId>>,
    rings: LruCache<(CellId, u32), Vec<CellId>>,
    spheres: LruCache<CellId, BoundingSphere>,
    stats: FootprintStats,
}

impl FootprintIndex {
    /// Create an index for a sphere of `sphere_radius`
    pub fn new(sphere_radius: f64, config: &FootprintConfig) -> Self {
        log::debug!(
            "Footprint index: coarse resolution {}, memo {}, rings {}, spheres {}",
            config.coarse_resolution,
            config.memo_capacity,
            config.ring_cache_capacity,
            config.sphere_cache_capacity
        );
        Self {
            grid: HexGrid::new(),
            sphere_radius,
            coarse_resolution: config.coarse_resolution,
            memo: LruCache::new(config.memo_capacity),
            rings: LruCache::new(config.ring_cache_capacity),
            spheres: LruCache::new(config.sphere_cache_capacity),
            stats: FootprintStats::default(),
        }
    }

    /// Underlying grid
    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    /// Radius of the playing sphere
    pub fn sphere_radius(&self) -> f64 {
        self.sphere_radius
    }

    /// Cache counters
    pub fn stats(&self) -> FootprintStats {
        self.stats
    }

    /// Number of memoized footprints
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Drop every cached value
    pub fn clear(&mut self) {
        self.memo.clear();
        self.rings.clear();
        self.spheres.clear();
    }

    /// Smallest world-space sphere around the cell's center holding its
    /// boundary
    pub fn cell_bounding_sphere(&mut self, cell: CellId) -> Result<BoundingSphere, SpatialError> {
        if let Some(sphere) = self.spheres.get(&cell) {
            self.stats.sphere_hits += 1;
            return Ok(*sphere);
        }
        self.stats.sphere_misses += 1;

        let center = self.grid.cell_center(cell)? * self.sphere_radius;
        let boundary: Vec<Vec3> = self
            .grid
            .cell_boundary(cell)?
            .into_iter()
            .map(|corner| corner * self.sphere_radius)
            .collect();
        let sphere = BoundingSphere::enclosing(center, &boundary);
        self.spheres.insert(cell, sphere);
        Ok(sphere)
    }

    fn ring(&mut self, center: CellId, k: u32) -> Result<Vec<CellId>, SpatialError> {
        if let Some(ring) = self.rings.get(&(center, k)) {
            self.stats.ring_hits += 1;
            return Ok(ring.clone());
        }
        self.stats.ring_misses += 1;
        let ring = self.grid.k_ring(center, k)?;
        self.rings.insert((center, k), ring.clone());
        Ok(ring)
    }

    /// Cells at `resolution` overlapped by the disc of `radius` around
    /// `position` (world units). Always computed afresh.
    ///
    /// When the disc fits inside the bounding sphere of the containing cell
    /// the result is that cell alone. Otherwise the containing cell plus every
    /// cell of its k-ring whose bounding sphere meets the disc's sphere.
    pub fn compute_footprint(
        &mut self,
        position: &Vec3,
        radius: f64,
        resolution: u8,
    ) -> Result<HashSet<CellId>, SpatialError> {
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(SpatialError::InvalidRadius);
        }
        let center = self.grid.cell_containing(position, resolution)?;
        let cell_sphere = self.cell_bounding_sphere(center)?;
        let mut cells = HashSet::from([center]);

        if (cell_sphere.center - position).norm() + radius <= cell_sphere.radius {
            return Ok(cells);
        }

        let k = if radius < cell_sphere.radius {
            1
        } else {
            (radius / cell_sphere.radius).ceil() as u32
        };
        let entity_sphere = BoundingSphere::new(*position, radius);
        for cell in self.ring(center, k)? {
            if cell != center && self.cell_bounding_sphere(cell)?.intersects(&entity_sphere) {
                cells.insert(cell);
            }
        }
        Ok(cells)
    }

    /// Memoized footprint of an entity of `kind`.
    ///
    /// Keyed by the coarse cell holding `position`, so any entity of the same
    /// kind inside that coarse cell gets the same answer until it is evicted.
    pub fn footprint_cells(
        &mut self,
        kind: EntityKind,
        position: &Vec3,
        radius: f64,
        resolution: u8,
    ) -> Result<HashSet<CellId>, SpatialError> {
        let coarse = self.grid.cell_containing(position, self.coarse_resolution)?;
        let key = (kind, coarse, resolution);
        if let Some(cells) = self.memo.get(&key) {
            self.stats.memo_hits += 1;
            log::trace!("Reusing {kind} footprint memoized under {coarse} at r{resolution}");
            return Ok(cells.clone());
        }
        self.stats.memo_misses += 1;

        let cells = self.compute_footprint(position, radius, resolution)?;
        self.memo.insert(key, cells.clone());
        Ok(cells)
    }
}
