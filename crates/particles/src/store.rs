//! # Particle Storage
//!
//! [`ParticleStore`] is the only owner of particle data. Particles live in
//! index-stable slots; a removed slot goes on a free list and its generation
//! is bumped, so a handle issued before the removal no longer resolves.

use std::collections::HashMap;

use crate::error::{Result, SimError};
use crate::types::{Cube, Particle, ParticleHandle, ParticleState, Vec3};

/// Placement retries per particle before overlap is accepted.
const MAX_PLACEMENT_ATTEMPTS: usize = 128;

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    particle: Option<Particle>,
}

#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    next_id: u64,
}

impl ParticleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `n` particles at rest with the given radius and mass, placed
    /// uniformly inside `cube` without overlapping each other or any particle
    /// already in the store where that is feasible.
    pub fn create(
        &mut self,
        n: usize,
        radius: f64,
        mass: f64,
        cube: &Cube,
        rng: &mut fastrand::Rng,
    ) -> Result<Vec<ParticleHandle>> {
        if n == 0 {
            return Err(SimError::Allocation { what: "particles", requested: 0 });
        }
        let mut handles = Vec::new();
        handles
            .try_reserve_exact(n)
            .map_err(|_| SimError::Allocation { what: "particle handles", requested: n })?;
        self.slots
            .try_reserve(n.saturating_sub(self.free.len()))
            .map_err(|_| SimError::Allocation { what: "particle slots", requested: n })?;

        let positions = self.sample_positions(n, radius, cube, rng);
        for position in positions {
            handles.push(self.append(ParticleState::at_rest(position, radius, mass))?);
        }
        Ok(handles)
    }

    /// Insert one particle. Existing handles stay valid.
    pub fn append(&mut self, state: ParticleState) -> Result<ParticleHandle> {
        let particle = Particle::new(self.next_id, state)?;
        self.next_id += 1;

        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.particle = Some(particle);
            ParticleHandle::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).map_err(|_| SimError::Allocation {
                what: "particle slots",
                requested: self.slots.len() + 1,
            })?;
            self.slots
                .try_reserve(1)
                .map_err(|_| SimError::Allocation { what: "particle slots", requested: 1 })?;
            self.slots.push(Slot { generation: 0, particle: Some(particle) });
            ParticleHandle::new(index, 0)
        };
        self.live += 1;
        Ok(handle)
    }

    /// Delete a particle, invalidating only `handle`.
    pub fn remove(&mut self, handle: ParticleHandle) -> Result<Particle> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation())
            .ok_or(SimError::NotFound(handle))?;
        let particle = slot.particle.take().ok_or(SimError::NotFound(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        // Index fits in u32: it came from a handle.
        self.free.push(handle.index() as u32);
        self.live -= 1;
        Ok(particle)
    }

    #[must_use]
    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.particle.as_ref())
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.particle.as_mut())
    }

    /// Mutable access to two distinct particles at once.
    pub fn pair_mut(
        &mut self,
        a: ParticleHandle,
        b: ParticleHandle,
    ) -> Option<(&mut Particle, &mut Particle)> {
        if a.index() == b.index() || self.get(a).is_none() || self.get(b).is_none() {
            return None;
        }
        let (lo, hi, swapped) = if a.index() < b.index() { (a, b, false) } else { (b, a, true) };
        let (before, after) = self.slots.split_at_mut(hi.index());
        let first = before[lo.index()].particle.as_mut()?;
        let second = after[0].particle.as_mut()?;
        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    #[must_use]
    pub fn contains(&self, handle: ParticleHandle) -> bool {
        self.get(handle).is_some()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live particles in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticleHandle, &Particle)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.particle
                .as_ref()
                .map(|p| (ParticleHandle::new(i as u32, slot.generation), p))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ParticleHandle, &mut Particle)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.particle
                .as_mut()
                .map(|p| (ParticleHandle::new(i as u32, generation), p))
        })
    }

    #[must_use]
    pub fn handles(&self) -> Vec<ParticleHandle> {
        self.iter().map(|(h, _)| h).collect()
    }

    /// Position snapshot in ascending handle order.
    #[must_use]
    pub fn positions(&self) -> Vec<Vec3> {
        self.iter().map(|(_, p)| p.position).collect()
    }

    #[must_use]
    pub fn max_radius(&self) -> f64 {
        self.iter().map(|(_, p)| p.radius).fold(0.0, f64::max)
    }

    /// Axis-aligned bounds of all particle centres.
    #[must_use]
    pub fn extent(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.iter().map(|(_, p)| p.position);
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| {
            (
                Vec3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Vec3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        }))
    }

    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.iter().map(|(_, p)| p.kinetic_energy()).sum()
    }

    /// Draw `n` positions for spheres of `radius` inside `cube` by rejection
    /// sampling against the particles already stored and the ones drawn so far.
    pub(crate) fn sample_positions(
        &self,
        n: usize,
        radius: f64,
        cube: &Cube,
        rng: &mut fastrand::Rng,
    ) -> Vec<Vec3> {
        let max_r = self.max_radius().max(radius);
        let mut occupied = PlacementGrid::new(2.0 * max_r);
        for (_, p) in self.iter() {
            occupied.insert(p.position, p.radius);
        }

        let lo = cube.min + Vec3::splat(radius);
        let span = cube.size - 2.0 * radius;
        let mut out = Vec::with_capacity(n);
        let mut overlapping = 0usize;
        for _ in 0..n {
            let mut candidate = lo;
            let mut placed = false;
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                candidate = lo + Vec3::new(rng.f64() * span, rng.f64() * span, rng.f64() * span);
                if !occupied.overlaps(candidate, radius) {
                    placed = true;
                    break;
                }
            }
            if !placed {
                overlapping += 1;
            }
            occupied.insert(candidate, radius);
            out.push(candidate);
        }
        if overlapping > 0 {
            tracing::warn!(
                "{overlapping} of {n} particles placed with overlap after {MAX_PLACEMENT_ATTEMPTS} attempts each"
            );
        }
        out
    }
}

/// Hash of occupied space used only while placing particles.
struct PlacementGrid {
    inv_cell: f64,
    cells: HashMap<(i64, i64, i64), Vec<(Vec3, f64)>>,
}

impl PlacementGrid {
    fn new(cell_size: f64) -> Self {
        // Point particles never overlap; any positive cell size works.
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self { inv_cell: 1.0 / cell_size, cells: HashMap::new() }
    }

    fn key(&self, p: Vec3) -> (i64, i64, i64) {
        (
            (p.x * self.inv_cell).floor() as i64,
            (p.y * self.inv_cell).floor() as i64,
            (p.z * self.inv_cell).floor() as i64,
        )
    }

    fn insert(&mut self, p: Vec3, radius: f64) {
        let key = self.key(p);
        self.cells.entry(key).or_default().push((p, radius));
    }

    fn overlaps(&self, p: Vec3, radius: f64) -> bool {
        let (cx, cy, cz) = self.key(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if bucket.iter().any(|&(q, rq)| (p - q).length() < radius + rq) {
                        return true;
                    }
                }
            }
        }
        false
    }
}
