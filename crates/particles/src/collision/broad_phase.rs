//! Broad-phase candidate pairs from the spatial grid

use crate::grid::SpatialGrid;
use crate::types::ParticleHandle;

/// Every pair of particles filed in the same or Moore-adjacent cells, each
/// unordered pair once as `(lower, higher)`, sorted ascending.
///
/// A pair is emitted only from the bucket of its lower handle, so the
/// symmetric neighbour relation never yields it twice.
#[must_use]
pub fn candidate_pairs(grid: &SpatialGrid) -> Vec<(ParticleHandle, ParticleHandle)> {
    let mut pairs = Vec::new();
    for (cell, bucket) in grid.occupied() {
        let neighbours = grid.neighbors_of(cell);
        for &a in bucket {
            for &other in &neighbours {
                pairs.extend(grid.bucket_of(other).iter().filter(|&&b| a < b).map(|&b| (a, b)));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ParticleStore;
    use crate::types::{Cube, ParticleState, Vec3};

    #[test]
    fn only_nearby_pairs_are_candidates() -> crate::Result<()> {
        let cube = Cube::new(Vec3::ZERO, 8.0)?;
        let mut store = ParticleStore::new();
        let a = store.append(ParticleState::at_rest(Vec3::new(1.0, 1.0, 1.0), 0.5, 1.0))?;
        let b = store.append(ParticleState::at_rest(Vec3::new(2.5, 1.0, 1.0), 0.5, 1.0))?;
        let c = store.append(ParticleState::at_rest(Vec3::new(7.0, 7.0, 7.0), 0.5, 1.0))?;
        let d = store.append(ParticleState::at_rest(Vec3::new(1.5, 1.5, 1.5), 0.5, 1.0))?;

        let grid = SpatialGrid::build(&store, &cube, 4)?;
        let pairs = candidate_pairs(&grid);
        assert_eq!(pairs, vec![(a, b), (a, d), (b, d)]);
        assert!(pairs.iter().all(|&(x, y)| x != c && y != c));
        Ok(())
    }
}
