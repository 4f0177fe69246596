//! # Collision Detection and Response
//!
//! Two passes run after integration each step:
//!
//! - **Walls**: every particle is clamped back inside the cube and the
//!   velocity component pointing into the wall is reflected.
//! - **Pairs**: the grid's buckets yield candidate pairs (same or adjacent
//!   cell), which are tested exactly and resolved with an impulse along the
//!   line of centres plus a positional split that removes the overlap.
//!
//! Pairs are resolved in ascending `(handle, handle)` order. The order
//! changes the exact numbers when one particle touches several others in
//! the same step, so it is fixed to keep runs reproducible.

mod broad_phase;
mod sphere_sphere;
mod wall;

pub use broad_phase::candidate_pairs;
pub use sphere_sphere::{detect_sphere_sphere_collision, resolve_sphere_sphere_collision};
pub use wall::resolve_wall_collision;

use crate::config::SimConfig;
use crate::grid::SpatialGrid;
use crate::store::ParticleStore;
use crate::types::{Cube, Vec3};

/// Contact information for collision response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from particle A to particle B
    pub normal: Vec3,
    /// Overlap of the two spheres along the normal (> 0 when touching)
    pub depth: f64,
}

/// Applies wall and pairwise resolution with fixed restitution coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResolver {
    /// Restitution for particle-particle contacts; 1 is perfectly elastic.
    pub restitution: f64,
    /// Restitution for wall bounces.
    pub wall_restitution: f64,
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self { restitution: 1.0, wall_restitution: 1.0 }
    }
}

impl From<&SimConfig> for CollisionResolver {
    fn from(cfg: &SimConfig) -> Self {
        Self { restitution: cfg.restitution, wall_restitution: cfg.wall_restitution }
    }
}

impl CollisionResolver {
    /// Clamp every particle into `cube`, updating wall flags. Returns the
    /// number of particles touching at least one wall.
    pub fn resolve_walls(&self, store: &mut ParticleStore, cube: &Cube) -> usize {
        let mut touching = 0;
        for (_, particle) in store.iter_mut() {
            if resolve_wall_collision(particle, cube, self.wall_restitution) {
                touching += 1;
            }
        }
        touching
    }

    /// Resolve every overlapping pair found through `grid`. Returns the
    /// number of contacts resolved.
    pub fn resolve_pairs(&self, store: &mut ParticleStore, grid: &SpatialGrid) -> usize {
        let mut contacts = 0;
        for (a, b) in candidate_pairs(grid) {
            let Some((pa, pb)) = store.pair_mut(a, b) else {
                continue;
            };
            if let Some(contact) = detect_sphere_sphere_collision(pa, pb) {
                resolve_sphere_sphere_collision(pa, pb, &contact, self.restitution);
                contacts += 1;
            }
        }
        contacts
    }
}
