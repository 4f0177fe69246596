//! # Integration
//!
//! Semi-implicit (symplectic) Euler: each sub-step of size `h` updates the
//! velocity from the acceleration first and then the position from the new
//! velocity. Accelerations are held constant for the whole step.

use crate::error::{Result, SimError};
use crate::store::ParticleStore;
use crate::types::Vec3;

/// Check the `(dt, sub_steps)` pair a step was called with.
pub fn validate_step(dt: f64, sub_steps: u32) -> Result<()> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(SimError::config(format!("dt must be finite and > 0, got {dt}")));
    }
    if sub_steps == 0 {
        return Err(SimError::config("sub_steps must be > 0"));
    }
    Ok(())
}

/// Advance every particle by `dt`, split into `sub_steps` equal sub-steps.
pub fn advance(store: &mut ParticleStore, dt: f64, sub_steps: u32) -> Result<()> {
    validate_step(dt, sub_steps)?;
    let h = dt / f64::from(sub_steps);
    for _ in 0..sub_steps {
        integrate_particles(store, h);
    }
    Ok(())
}

/// One semi-implicit Euler sub-step of size `h`.
pub fn integrate_particles(store: &mut ParticleStore, h: f64) {
    for (_, particle) in store.iter_mut() {
        particle.velocity += particle.acceleration * h;
        particle.position += particle.velocity * h;
    }
}

/// Set the same acceleration (e.g. gravity) on every particle.
pub fn apply_uniform_acceleration(store: &mut ParticleStore, acceleration: Vec3) {
    for (_, particle) in store.iter_mut() {
        particle.acceleration = acceleration;
    }
}
