//! When to rebuild the grid, and at what resolution.

use crate::config::SimConfig;
use crate::store::ParticleStore;
use crate::types::Cube;

/// Why a step performed a full rebuild ("map creation").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RebuildReason {
    /// No grid existed yet.
    Initial,
    /// Density or extent moved the desired axis count.
    AxisCountChanged { from: usize, to: usize },
    /// `rebuild_interval` steps passed since the last rebuild.
    Interval,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GridPolicy {
    pub target_occupancy: f64,
    pub max_cells_per_particle: usize,
    pub rebuild_interval: u64,
}

impl From<&SimConfig> for GridPolicy {
    fn from(cfg: &SimConfig) -> Self {
        Self {
            target_occupancy: cfg.target_occupancy,
            max_cells_per_particle: cfg.max_cells_per_particle,
            rebuild_interval: cfg.rebuild_interval,
        }
    }
}

impl GridPolicy {
    /// Axis count A for the current particle set.
    ///
    /// A is sized so the mean occupancy of the cells covering the occupied
    /// region sits near `target_occupancy`, then capped so that a cell is
    /// never narrower than the largest particle diameter and A³ never exceeds
    /// `max_cells_per_particle` cells per particle. Always >= 1.
    #[must_use]
    pub fn desired_axis_count(&self, store: &ParticleStore, cube: &Cube) -> usize {
        let n = store.count();
        if n == 0 {
            return 1;
        }
        let max_r = store.max_radius();

        // Fraction of the cube's volume spanned by the particles' bounding box.
        let fraction = store.extent().map_or(1.0, |(lo, hi)| {
            (0..3)
                .map(|k| ((hi[k] - lo[k] + 2.0 * max_r) / cube.size).clamp(1.0 / cube.size.max(1.0), 1.0))
                .product::<f64>()
        });
        let ideal = (n as f64 / (self.target_occupancy * fraction)).cbrt().round();

        self.clamp_axis_count(ideal, n, max_r, cube)
    }

    /// The largest axis count the caps allow for `n` particles of radius up to `max_r`.
    #[must_use]
    pub fn max_axis_count(&self, n: usize, max_r: f64, cube: &Cube) -> usize {
        let by_diameter = if max_r > 0.0 {
            (cube.size / (2.0 * max_r)).floor().max(1.0) as usize
        } else {
            usize::MAX
        };
        let budget = n.saturating_mul(self.max_cells_per_particle).max(1);
        by_diameter.min(icbrt(budget))
    }

    /// Whether a step should rebuild, given the grid's current axis count
    /// (`None` when no grid exists) and the steps since the last rebuild.
    #[must_use]
    pub fn rebuild_reason(
        &self,
        current: Option<usize>,
        desired: usize,
        steps_since_rebuild: u64,
    ) -> Option<RebuildReason> {
        match current {
            None => Some(RebuildReason::Initial),
            Some(from) if from != desired => Some(RebuildReason::AxisCountChanged { from, to: desired }),
            Some(_) if self.rebuild_interval > 0 && steps_since_rebuild >= self.rebuild_interval => {
                Some(RebuildReason::Interval)
            }
            Some(_) => None,
        }
    }

    fn clamp_axis_count(&self, ideal: f64, n: usize, max_r: f64, cube: &Cube) -> usize {
        let cap = self.max_axis_count(n, max_r, cube);
        let ideal = if ideal.is_finite() && ideal >= 1.0 { ideal as usize } else { 1 };
        ideal.clamp(1, cap.max(1))
    }
}

/// Integer cube root, rounded down.
fn icbrt(n: usize) -> usize {
    let cube = |r: usize| r.checked_mul(r).and_then(|sq| sq.checked_mul(r));
    let mut r = (n as f64).cbrt().round() as usize;
    while r > 0 && cube(r).map_or(true, |c| c > n) {
        r -= 1;
    }
    while cube(r + 1).is_some_and(|c| c <= n) {
        r += 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParticleState, Vec3};

    fn policy() -> GridPolicy {
        GridPolicy { target_occupancy: 2.0, max_cells_per_particle: 8, rebuild_interval: 10 }
    }

    #[test]
    fn icbrt_is_exact_on_cubes() {
        assert_eq!(icbrt(1), 1);
        assert_eq!(icbrt(26), 2);
        assert_eq!(icbrt(27), 3);
        assert_eq!(icbrt(1_000_000), 100);
        assert!(icbrt(usize::MAX).checked_pow(3).is_some());
    }

    #[test]
    fn empty_store_gets_one_cell() {
        let cube = Cube::new(Vec3::ZERO, 10.0).unwrap();
        assert_eq!(policy().desired_axis_count(&ParticleStore::new(), &cube), 1);
    }

    #[test]
    fn diameter_caps_axis_count() {
        let cube = Cube::new(Vec3::ZERO, 10.0).unwrap();
        // Diameter 4 leaves room for two cells per axis at most.
        assert_eq!(policy().max_axis_count(10_000, 2.0, &cube), 2);
        // Point particles are limited only by the cell budget.
        assert_eq!(policy().max_axis_count(1000, 0.0, &cube), 20);
    }

    #[test]
    fn axis_count_grows_with_density() -> crate::Result<()> {
        let cube = Cube::new(Vec3::ZERO, 10.0)?;
        let mut rng = fastrand::Rng::with_seed(5);
        let mut store = ParticleStore::new();
        store.create(16, 0.1, 1.0, &cube, &mut rng)?;
        let sparse = policy().desired_axis_count(&store, &cube);
        store.create(500, 0.1, 1.0, &cube, &mut rng)?;
        let dense = policy().desired_axis_count(&store, &cube);
        assert!(dense > sparse, "sparse={sparse}, dense={dense}");
        let cells = dense * dense * dense;
        assert!(cells <= 516 * 8);
        Ok(())
    }

    #[test]
    fn clustered_particles_refine_the_grid() -> crate::Result<()> {
        let cube = Cube::new(Vec3::ZERO, 10.0)?;
        let mut spread = ParticleStore::new();
        let mut packed = ParticleStore::new();
        for i in 0..4 {
            for j in 0..4 {
                let (x, y) = (f64::from(i), f64::from(j));
                spread.append(ParticleState::at_rest(Vec3::new(x * 3.0 + 0.5, y * 3.0 + 0.5, 0.5 + x * 3.0), 0.05, 1.0))?;
                packed.append(ParticleState::at_rest(Vec3::new(x * 0.3 + 1.0, y * 0.3 + 1.0, 1.0), 0.05, 1.0))?;
            }
        }
        let p = policy();
        assert!(p.desired_axis_count(&packed, &cube) > p.desired_axis_count(&spread, &cube));
        Ok(())
    }

    #[test]
    fn rebuild_triggers() {
        let p = policy();
        assert_eq!(p.rebuild_reason(None, 3, 0), Some(RebuildReason::Initial));
        assert_eq!(
            p.rebuild_reason(Some(3), 4, 1),
            Some(RebuildReason::AxisCountChanged { from: 3, to: 4 })
        );
        assert_eq!(p.rebuild_reason(Some(3), 3, 9), None);
        assert_eq!(p.rebuild_reason(Some(3), 3, 10), Some(RebuildReason::Interval));

        let never = GridPolicy { rebuild_interval: 0, ..p };
        assert_eq!(never.rebuild_reason(Some(3), 3, 1_000), None);
    }
}
