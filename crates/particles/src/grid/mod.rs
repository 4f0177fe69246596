//! # Spatial Grid
//!
//! A uniform A×A×A partition of the simulation cube. Each cell owns a bucket
//! of particle handles; buckets never own particles, they only refer into the
//! [`ParticleStore`].
//!
//! The grid keeps a reverse index from handle to bucket, so a particle can be
//! re-filed or dropped without scanning every bucket. A full [`rebuild`]
//! allocates a fresh set of buckets and swaps it in only once every particle
//! has been filed; on failure the previous grid is left untouched.
//!
//! [`rebuild`]: SpatialGrid::rebuild

mod policy;
mod stats;

pub use policy::{GridPolicy, RebuildReason};
pub use stats::GridStats;

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::store::ParticleStore;
use crate::types::{Cube, ParticleHandle, Vec3};

/// Integer coordinate of one grid cell, each component in `0..axis_count`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellCoord {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl CellCoord {
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Debug)]
pub struct SpatialGrid {
    axis_count: usize,
    cell_size: f64,
    origin: Vec3,
    buckets: Vec<Vec<ParticleHandle>>,
    membership: HashMap<ParticleHandle, usize>,
}

impl SpatialGrid {
    /// An empty grid of `axis_count`³ cells over `cube`.
    pub fn new(cube: &Cube, axis_count: usize) -> Result<Self> {
        if axis_count == 0 {
            return Err(SimError::config("axis count must be >= 1"));
        }
        let cells = axis_count
            .checked_mul(axis_count)
            .and_then(|sq| sq.checked_mul(axis_count))
            .ok_or(SimError::Allocation { what: "grid buckets", requested: usize::MAX })?;

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(cells)
            .map_err(|_| SimError::Allocation { what: "grid buckets", requested: cells })?;
        buckets.resize_with(cells, Vec::new);

        Ok(Self {
            axis_count,
            cell_size: cube.size / axis_count as f64,
            origin: cube.origin,
            buckets,
            membership: HashMap::new(),
        })
    }

    /// A grid of `axis_count`³ cells with every live particle filed.
    pub fn build(store: &ParticleStore, cube: &Cube, axis_count: usize) -> Result<Self> {
        let mut grid = Self::new(cube, axis_count)?;
        grid.membership
            .try_reserve(store.count())
            .map_err(|_| SimError::Allocation { what: "grid membership", requested: store.count() })?;
        for (handle, particle) in store.iter() {
            grid.insert(handle, particle.position);
        }
        Ok(grid)
    }

    /// Discard every bucket and re-file all live particles at `axis_count`.
    ///
    /// The replacement is built off to the side, so an allocation failure
    /// leaves `self` exactly as it was.
    pub fn rebuild(&mut self, store: &ParticleStore, cube: &Cube, axis_count: usize) -> Result<()> {
        *self = Self::build(store, cube, axis_count)?;
        Ok(())
    }

    /// Re-file every particle whose cell changed, without reallocating
    /// buckets. Entries for particles no longer in the store are dropped and
    /// particles the grid has not seen are added. Returns the number of
    /// particles that changed bucket.
    pub fn update_membership(&mut self, store: &ParticleStore) -> usize {
        let mut moved = 0;
        for (handle, particle) in store.iter() {
            let target = self.flat_index(self.cell_of(particle.position));
            match self.membership.get(&handle).copied() {
                Some(current) if current == target => {}
                Some(current) => {
                    detach(&mut self.buckets[current], handle);
                    self.buckets[target].push(handle);
                    self.membership.insert(handle, target);
                    moved += 1;
                }
                None => {
                    self.buckets[target].push(handle);
                    self.membership.insert(handle, target);
                    moved += 1;
                }
            }
        }

        if self.membership.len() != store.count() {
            let stale: Vec<ParticleHandle> = self
                .membership
                .keys()
                .copied()
                .filter(|h| !store.contains(*h))
                .collect();
            for handle in stale {
                self.remove(handle);
            }
        }
        moved
    }

    /// File one particle under the cell containing `position`.
    pub fn insert(&mut self, handle: ParticleHandle, position: Vec3) {
        let target = self.flat_index(self.cell_of(position));
        if let Some(previous) = self.membership.insert(handle, target) {
            detach(&mut self.buckets[previous], handle);
        }
        self.buckets[target].push(handle);
    }

    /// Drop a particle from its bucket. Returns whether it was filed.
    pub fn remove(&mut self, handle: ParticleHandle) -> bool {
        match self.membership.remove(&handle) {
            Some(index) => {
                detach(&mut self.buckets[index], handle);
                true
            }
            None => false,
        }
    }

    /// Cell containing `position`, clamped onto the grid on every axis.
    #[must_use]
    pub fn cell_of(&self, position: Vec3) -> CellCoord {
        let max = self.axis_count as i64 - 1;
        let axis = |k: usize| -> usize {
            let rel = (position[k] - self.origin[k]) / self.cell_size;
            // NaN casts to 0, which clamps like any other out-of-range value.
            (rel.floor() as i64).clamp(0, max) as usize
        };
        CellCoord::new(axis(0), axis(1), axis(2))
    }

    /// The cell the grid currently files `handle` under.
    #[must_use]
    pub fn cell_of_particle(&self, handle: ParticleHandle) -> Option<CellCoord> {
        self.membership.get(&handle).map(|&i| self.coord_of(i))
    }

    /// `cell` and its Moore neighbours (up to 26), clipped at the grid
    /// boundary, in ascending cell order.
    #[must_use]
    pub fn neighbors_of(&self, cell: CellCoord) -> Vec<CellCoord> {
        let span = |c: usize| c.saturating_sub(1)..=(c + 1).min(self.axis_count - 1);
        let mut out = Vec::with_capacity(27);
        for x in span(cell.x) {
            for y in span(cell.y) {
                for z in span(cell.z) {
                    out.push(CellCoord::new(x, y, z));
                }
            }
        }
        out
    }

    /// Handles filed under `cell`; empty for coordinates off the grid.
    #[must_use]
    pub fn bucket_of(&self, cell: CellCoord) -> &[ParticleHandle] {
        if cell.x >= self.axis_count || cell.y >= self.axis_count || cell.z >= self.axis_count {
            return &[];
        }
        &self.buckets[self.flat_index(cell)]
    }

    /// Non-empty buckets in ascending cell order.
    pub fn occupied(&self) -> impl Iterator<Item = (CellCoord, &[ParticleHandle])> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(i, b)| (self.coord_of(i), b.as_slice()))
    }

    #[must_use]
    pub fn axis_count(&self) -> usize {
        self.axis_count
    }

    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of filed particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.membership.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.membership.is_empty()
    }

    fn flat_index(&self, cell: CellCoord) -> usize {
        (cell.x * self.axis_count + cell.y) * self.axis_count + cell.z
    }

    fn coord_of(&self, index: usize) -> CellCoord {
        let a = self.axis_count;
        CellCoord::new(index / (a * a), (index / a) % a, index % a)
    }
}

fn detach(bucket: &mut Vec<ParticleHandle>, handle: ParticleHandle) {
    if let Some(pos) = bucket.iter().position(|&h| h == handle) {
        bucket.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParticleState;

    fn setup() -> (ParticleStore, Cube) {
        (ParticleStore::new(), Cube::new(Vec3::ZERO, 8.0).unwrap())
    }

    #[test]
    fn flat_index_round_trips() -> Result<()> {
        let (_, cube) = setup();
        let grid = SpatialGrid::new(&cube, 5)?;
        for i in 0..grid.cell_count() {
            assert_eq!(grid.flat_index(grid.coord_of(i)), i);
        }
        Ok(())
    }

    #[test]
    fn corner_cell_has_eight_neighbours() -> Result<()> {
        let (_, cube) = setup();
        let grid = SpatialGrid::new(&cube, 4)?;
        assert_eq!(grid.neighbors_of(CellCoord::new(0, 0, 0)).len(), 8);
        assert_eq!(grid.neighbors_of(CellCoord::new(1, 1, 1)).len(), 27);
        assert_eq!(grid.neighbors_of(CellCoord::new(3, 1, 0)).len(), 12);
        Ok(())
    }

    #[test]
    fn single_cell_grid_neighbours_itself() -> Result<()> {
        let (_, cube) = setup();
        let grid = SpatialGrid::new(&cube, 1)?;
        assert_eq!(grid.neighbors_of(CellCoord::new(0, 0, 0)), vec![CellCoord::new(0, 0, 0)]);
        Ok(())
    }

    #[test]
    fn outside_positions_clamp_to_boundary_cells() -> Result<()> {
        let (_, cube) = setup();
        let grid = SpatialGrid::new(&cube, 4)?;
        assert_eq!(grid.cell_of(Vec3::new(-3.0, 9.0, 4.0)), CellCoord::new(0, 3, 2));
        assert_eq!(grid.cell_of(Vec3::new(8.0, 8.0, 8.0)), CellCoord::new(3, 3, 3));
        Ok(())
    }

    #[test]
    fn remove_then_membership_update_keeps_single_entry() -> Result<()> {
        let (mut store, cube) = setup();
        let a = store.append(ParticleState::at_rest(Vec3::splat(1.0), 0.1, 1.0))?;
        let b = store.append(ParticleState::at_rest(Vec3::splat(1.2), 0.1, 1.0))?;
        let mut grid = SpatialGrid::build(&store, &cube, 4)?;
        assert_eq!(grid.bucket_of(CellCoord::new(0, 0, 0)), &[a, b]);

        store.get_mut(a).unwrap().position = Vec3::splat(7.0);
        assert_eq!(grid.update_membership(&store), 1);
        assert_eq!(grid.bucket_of(CellCoord::new(0, 0, 0)), &[b]);
        assert_eq!(grid.bucket_of(CellCoord::new(3, 3, 3)), &[a]);

        store.remove(b)?;
        grid.update_membership(&store);
        assert!(grid.bucket_of(CellCoord::new(0, 0, 0)).is_empty());
        assert_eq!(grid.len(), 1);
        Ok(())
    }

    #[test]
    fn zero_axis_count_is_a_configuration_error() {
        let (_, cube) = setup();
        assert!(matches!(SpatialGrid::new(&cube, 0), Err(SimError::Configuration(_))));
    }

    #[test]
    fn overflowing_axis_count_is_an_allocation_error() {
        let (_, cube) = setup();
        let err = SpatialGrid::new(&cube, usize::MAX / 2).unwrap_err();
        assert!(matches!(err, SimError::Allocation { .. }));
    }
}
