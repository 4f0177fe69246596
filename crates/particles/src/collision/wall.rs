//! Particle-wall collision against the bounding cube

use crate::types::{Cube, Particle};

/// Clamp `particle` inside `cube` on every axis and reflect the velocity
/// component that points into a touched wall, scaled by `restitution`.
///
/// A particle sitting exactly on a wall counts as touching it, so a second
/// call with no movement in between changes nothing. Returns whether any
/// wall flag is set afterwards.
pub fn resolve_wall_collision(particle: &mut Particle, cube: &Cube, restitution: f64) -> bool {
    for k in 0..3 {
        let mut lo = cube.min[k] + particle.radius;
        let mut hi = cube.max[k] - particle.radius;
        if lo > hi {
            // Wider than the cube: pin to the middle of the axis.
            let mid = 0.5 * (cube.min[k] + cube.max[k]);
            lo = mid;
            hi = mid;
        }

        let pos = particle.position[k];
        let vel = particle.velocity[k];
        if pos <= lo {
            particle.position[k] = lo;
            if vel < 0.0 {
                particle.velocity[k] = -vel * restitution;
            }
            particle.wall[k] = true;
        } else if pos >= hi {
            particle.position[k] = hi;
            if vel > 0.0 {
                particle.velocity[k] = -vel * restitution;
            }
            particle.wall[k] = true;
        } else {
            particle.wall[k] = false;
        }
    }
    particle.wall.any()
}
