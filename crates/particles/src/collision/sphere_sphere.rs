//! Sphere-sphere collision detection and response

use super::Contact;
use crate::types::{Particle, Vec3};

/// Separation direction for coincident centres, where no line of centres exists.
const COINCIDENT_NORMAL: Vec3 = Vec3::new(1.0, 0.0, 0.0);

/// Detect overlap between two spheres: centre distance < sum of radii.
#[must_use]
pub fn detect_sphere_sphere_collision(a: &Particle, b: &Particle) -> Option<Contact> {
    let delta = b.position - a.position;
    let distance_squared = delta.length_squared();
    let min_distance = a.radius + b.radius;

    if distance_squared >= min_distance * min_distance {
        return None;
    }
    let distance = distance_squared.sqrt();
    let normal = delta.try_normalize().unwrap_or(COINCIDENT_NORMAL);
    Some(Contact { normal, depth: min_distance - distance })
}

/// Apply an impulse along the contact normal and push the spheres apart.
///
/// The impulse is skipped when the spheres are already separating, but the
/// positional split always runs, so the pair ends exactly touching. Both
/// corrections are shared by inverse mass.
pub fn resolve_sphere_sphere_collision(
    a: &mut Particle,
    b: &mut Particle,
    contact: &Contact,
    restitution: f64,
) {
    let inv_a = 1.0 / a.mass;
    let inv_b = 1.0 / b.mass;
    let inv_mass_sum = inv_a + inv_b;

    let relative_velocity = b.velocity - a.velocity;
    let velocity_along_normal = relative_velocity.dot(contact.normal);
    if velocity_along_normal < 0.0 {
        let j = -(1.0 + restitution) * velocity_along_normal / inv_mass_sum;
        let impulse = contact.normal * j;
        a.velocity -= impulse * inv_a;
        b.velocity += impulse * inv_b;
    }

    let correction = contact.normal * (contact.depth / inv_mass_sum);
    a.position -= correction * inv_a;
    b.position += correction * inv_b;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParticleState;

    fn sphere(pos: Vec3, vel: Vec3, mass: f64) -> Particle {
        Particle::new(0, ParticleState::at_rest(pos, 0.5, mass).with_velocity(vel)).unwrap()
    }

    #[test]
    fn separated_spheres_do_not_collide() {
        let a = sphere(Vec3::ZERO, Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, 1.0);
        assert!(detect_sphere_sphere_collision(&a, &b).is_none());
    }

    #[test]
    fn equal_masses_exchange_velocity_head_on() {
        let mut a = sphere(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 1.0);
        let mut b = sphere(Vec3::new(0.9, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 1.0);
        let contact = detect_sphere_sphere_collision(&a, &b).unwrap();
        assert_eq!(contact.normal, Vec3::new(1.0, 0.0, 0.0));
        resolve_sphere_sphere_collision(&mut a, &mut b, &contact, 1.0);

        assert!((a.velocity.x + 1.0).abs() < 1e-12);
        assert!((b.velocity.x - 1.0).abs() < 1e-12);
        assert!(((b.position - a.position).length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn elastic_response_conserves_momentum_and_energy() {
        let mut a = sphere(Vec3::ZERO, Vec3::new(2.0, 0.5, 0.0), 1.0);
        let mut b = sphere(Vec3::new(0.6, 0.6, 0.0), Vec3::new(-1.0, 0.0, 0.3), 3.0);
        let p0 = a.velocity * a.mass + b.velocity * b.mass;
        let e0 = a.kinetic_energy() + b.kinetic_energy();

        let contact = detect_sphere_sphere_collision(&a, &b).unwrap();
        resolve_sphere_sphere_collision(&mut a, &mut b, &contact, 1.0);

        let p1 = a.velocity * a.mass + b.velocity * b.mass;
        let e1 = a.kinetic_energy() + b.kinetic_energy();
        assert!((p1 - p0).length() < 1e-12);
        assert!((e1 - e0).abs() < 1e-12);
    }

    #[test]
    fn inelastic_response_loses_energy() {
        let mut a = sphere(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 1.0);
        let mut b = sphere(Vec3::new(0.8, 0.0, 0.0), Vec3::ZERO, 1.0);
        let e0 = a.kinetic_energy() + b.kinetic_energy();
        let contact = detect_sphere_sphere_collision(&a, &b).unwrap();
        resolve_sphere_sphere_collision(&mut a, &mut b, &contact, 0.5);
        assert!(a.kinetic_energy() + b.kinetic_energy() < e0);
    }

    #[test]
    fn coincident_centres_separate_along_fixed_axis() {
        let mut a = sphere(Vec3::splat(2.0), Vec3::ZERO, 1.0);
        let mut b = sphere(Vec3::splat(2.0), Vec3::ZERO, 1.0);
        let contact = detect_sphere_sphere_collision(&a, &b).unwrap();
        resolve_sphere_sphere_collision(&mut a, &mut b, &contact, 1.0);
        assert!(a.position.is_finite() && b.position.is_finite());
        assert!((b.position.x - a.position.x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn heavier_sphere_moves_less() {
        let mut a = sphere(Vec3::ZERO, Vec3::ZERO, 1.0);
        let mut b = sphere(Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO, 4.0);
        let contact = detect_sphere_sphere_collision(&a, &b).unwrap();
        resolve_sphere_sphere_collision(&mut a, &mut b, &contact, 1.0);
        assert!((a.position.x + 0.4).abs() < 1e-12);
        assert!((b.position.x - 0.6).abs() < 1e-12);
    }
}
