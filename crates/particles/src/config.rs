//! # Simulation Configuration
//!
//! [`SimConfig`] gathers every tunable of a run. It deserializes from JSON
//! with every field optional, so a config file only needs the values it
//! changes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::types::Vec3;

pub const DEFAULT_PARTICLE_COUNT: usize = 50;
pub const DEFAULT_RADIUS: f64 = 0.33;
pub const DEFAULT_MASS: f64 = 1.0;
pub const DEFAULT_CUBE_SIZE: f64 = 10.0;
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -9.81);
pub const DEFAULT_RESTITUTION: f64 = 1.0;
/// Mean bucket occupancy the axis count is chosen for.
pub const DEFAULT_TARGET_OCCUPANCY: f64 = 2.0;
/// Steps between unconditional grid rebuilds; 0 disables the periodic trigger.
pub const DEFAULT_REBUILD_INTERVAL: u64 = 100;
/// Upper bound on A³ relative to the particle count.
pub const DEFAULT_MAX_CELLS_PER_PARTICLE: usize = 8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub particle_count: usize,
    pub radius: f64,
    pub mass: f64,
    pub cube_size: f64,
    pub origin: Vec3,
    pub gravity: Vec3,
    /// Coefficient of restitution for particle-particle contacts.
    pub restitution: f64,
    /// Coefficient of restitution for wall bounces.
    pub wall_restitution: f64,
    pub target_occupancy: f64,
    pub rebuild_interval: u64,
    pub max_cells_per_particle: usize,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            radius: DEFAULT_RADIUS,
            mass: DEFAULT_MASS,
            cube_size: DEFAULT_CUBE_SIZE,
            origin: Vec3::ZERO,
            gravity: DEFAULT_GRAVITY,
            restitution: DEFAULT_RESTITUTION,
            wall_restitution: DEFAULT_RESTITUTION,
            target_occupancy: DEFAULT_TARGET_OCCUPANCY,
            rebuild_interval: DEFAULT_REBUILD_INTERVAL,
            max_cells_per_particle: DEFAULT_MAX_CELLS_PER_PARTICLE,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Config for `particle_count` particles of `radius` in a cube of side `cube_size`.
    #[must_use]
    pub fn new(particle_count: usize, radius: f64, cube_size: f64) -> Self {
        Self {
            particle_count,
            radius,
            cube_size,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Check every field. Nothing is clamped: the first violation is returned.
    pub fn validate(&self) -> Result<()> {
        if self.particle_count == 0 {
            return Err(SimError::config("particle_count must be > 0"));
        }
        if !self.cube_size.is_finite() || self.cube_size <= 0.0 {
            return Err(SimError::config("cube_size must be finite and > 0"));
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(SimError::config("radius must be finite and >= 0"));
        }
        if 2.0 * self.radius > self.cube_size {
            return Err(SimError::config("cube_size must be at least 2 * radius"));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(SimError::config("mass must be finite and > 0"));
        }
        if !self.origin.is_finite() || !self.gravity.is_finite() {
            return Err(SimError::config("origin and gravity must be finite"));
        }
        for (name, e) in [
            ("restitution", self.restitution),
            ("wall_restitution", self.wall_restitution),
        ] {
            if !(0.0..=1.0).contains(&e) {
                return Err(SimError::config(format!("{name} must lie in [0, 1]")));
            }
        }
        if !self.target_occupancy.is_finite() || self.target_occupancy <= 0.0 {
            return Err(SimError::config("target_occupancy must be finite and > 0"));
        }
        if self.max_cells_per_particle == 0 {
            return Err(SimError::config("max_cells_per_particle must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_particles_rejected() {
        let err = SimConfig::new(0, 0.5, 10.0).validate().unwrap_err();
        assert!(err.to_string().contains("particle_count"));
    }

    #[test]
    fn cube_too_small_for_particle_rejected() {
        let err = SimConfig::new(1, 2.0, 3.0).validate().unwrap_err();
        assert!(err.to_string().contains("2 * radius"));
    }

    #[test]
    fn restitution_out_of_range_rejected() {
        let mut cfg = SimConfig::default();
        cfg.wall_restitution = 1.5;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("wall_restitution"));
    }
}
