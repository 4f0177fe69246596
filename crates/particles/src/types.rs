use std::fmt;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

#[repr(C)]
#[derive(
    Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize,
)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    #[must_use]
    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or `None` when the length is too
    /// small to divide by.
    #[must_use]
    pub fn try_normalize(self) -> Option<Vec3> {
        let len = self.length();
        if len > f64::EPSILON && len.is_finite() {
            Some(self / len)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Vec3) {
        *self = *self - rhs;
    }
}

impl MulAssign<f64> for Vec3 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl Index<usize> for Vec3 {
    type Output = f64;
    fn index(&self, axis: usize) -> &f64 {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 axis out of range: {axis}"),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, axis: usize) -> &mut f64 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 axis out of range: {axis}"),
        }
    }
}

/// The axis-aligned simulation domain. Immutable once built.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Cube {
    pub origin: Vec3,
    pub min: Vec3,
    pub max: Vec3,
    pub size: f64,
}

impl Cube {
    pub fn new(origin: Vec3, size: f64) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(SimError::config("cube size must be finite and > 0"));
        }
        if !origin.is_finite() {
            return Err(SimError::config("cube origin must be finite"));
        }
        Ok(Self {
            origin,
            min: origin,
            max: origin + Vec3::splat(size),
            size,
        })
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.origin + Vec3::splat(self.size * 0.5)
    }

    /// Whether a sphere at `pos` lies inside on every axis, allowing `eps` of slack.
    #[must_use]
    pub fn contains_sphere(&self, pos: Vec3, radius: f64, eps: f64) -> bool {
        (0..3).all(|k| pos[k] - radius >= self.min[k] - eps && pos[k] + radius <= self.max[k] + eps)
    }
}

/// Per-axis "touching a wall" flags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WallFlags(pub [bool; 3]);

impl WallFlags {
    #[must_use]
    pub fn any(self) -> bool {
        self.0.iter().any(|&w| w)
    }
}

impl Index<usize> for WallFlags {
    type Output = bool;
    fn index(&self, axis: usize) -> &bool {
        &self.0[axis]
    }
}

impl IndexMut<usize> for WallFlags {
    fn index_mut(&mut self, axis: usize) -> &mut bool {
        &mut self.0[axis]
    }
}

/// Stable reference to a particle in a [`crate::ParticleStore`].
///
/// Ordering is by slot index first, which fixes the order pairwise contacts
/// are resolved in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleHandle {
    index: u32,
    generation: u32,
}

impl ParticleHandle {
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ParticleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Kinematic and physical state used to insert a particle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParticleState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub mass: f64,
    pub radius: f64,
}

impl ParticleState {
    /// A particle at rest at `position`.
    #[must_use]
    pub fn at_rest(position: Vec3, radius: f64, mass: f64) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            mass,
            radius,
        }
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    #[must_use]
    pub fn with_acceleration(mut self, acceleration: Vec3) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(SimError::config("radius must be finite and >= 0"));
        }
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return Err(SimError::config("mass must be finite and > 0"));
        }
        if !self.position.is_finite() || !self.velocity.is_finite() || !self.acceleration.is_finite() {
            return Err(SimError::config("position, velocity and acceleration must be finite"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Opaque identifier, unique for the lifetime of a store.
    pub id: u64,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub wall: WallFlags,
    pub mass: f64,
    pub radius: f64,
}

impl Particle {
    pub fn new(id: u64, state: ParticleState) -> Result<Self> {
        state.validate()?;
        Ok(Self {
            id,
            position: state.position,
            velocity: state.velocity,
            acceleration: state.acceleration,
            wall: WallFlags::default(),
            mass: state.mass,
            radius: state.radius,
        })
    }

    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.length_squared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_corners_follow_origin() -> Result<()> {
        let cube = Cube::new(Vec3::new(1.0, 2.0, 3.0), 4.0)?;
        assert_eq!(cube.min, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(cube.max, Vec3::new(5.0, 6.0, 7.0));
        assert_eq!(cube.center(), Vec3::new(3.0, 4.0, 5.0));
        Ok(())
    }

    #[test]
    fn cube_rejects_non_positive_size() {
        assert!(Cube::new(Vec3::ZERO, 0.0).is_err());
        assert!(Cube::new(Vec3::ZERO, -1.0).is_err());
        assert!(Cube::new(Vec3::ZERO, f64::NAN).is_err());
    }

    #[test]
    fn zero_vector_does_not_normalize() {
        assert!(Vec3::ZERO.try_normalize().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).try_normalize();
        assert_eq!(n, Some(Vec3::new(0.6, 0.0, 0.8)));
    }

    #[test]
    fn particle_rejects_bad_mass_and_radius() {
        let bad_mass = ParticleState::at_rest(Vec3::ZERO, 0.5, 0.0);
        assert!(Particle::new(0, bad_mass).is_err());
        let bad_radius = ParticleState::at_rest(Vec3::ZERO, -0.1, 1.0);
        assert!(Particle::new(0, bad_radius).is_err());
        // Point particles are allowed.
        let point = ParticleState::at_rest(Vec3::ZERO, 0.0, 1.0);
        assert!(Particle::new(0, point).is_ok());
    }

    #[test]
    fn handles_order_by_slot() {
        let a = ParticleHandle::new(1, 9);
        let b = ParticleHandle::new(2, 0);
        assert!(a < b);
        assert_eq!(a.to_string(), "#1v9");
    }
}
