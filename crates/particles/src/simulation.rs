//! # Simulation Stepper
//!
//! [`Simulation`] owns one run: the cube, the particle store, the spatial
//! grid and the step counters. A call to [`Simulation::step`] runs
//!
//! 1. grid reconciliation (a full rebuild when the [`GridPolicy`] asks for
//!    one, otherwise a membership update),
//! 2. integration over `sub_steps` sub-steps,
//! 3. wall resolution,
//! 4. pairwise resolution through the refreshed grid,
//!
//! and leaves the grid consistent with the final positions.
//!
//! The only fatal failure is an allocation failure while rebuilding the
//! grid. The rebuild happens before any particle is touched and replaces the
//! old grid only on success, so a failed step leaves the last good state in
//! place. The stepper then refuses further steps.

use crate::collision::CollisionResolver;
use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::grid::{GridPolicy, GridStats, RebuildReason, SpatialGrid};
use crate::integrator;
use crate::store::ParticleStore;
use crate::types::{Cube, Particle, ParticleHandle, ParticleState, Vec3};

/// Where the stepper is in its cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepperState {
    /// Between steps; state may be read and mutated.
    Idle,
    /// Inside `step`.
    Stepping,
    /// A step failed fatally; every further step returns [`SimError::Faulted`].
    Faulted,
}

/// What one successful step did.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepReport {
    /// Index of the step just completed, starting at 1.
    pub step_index: u64,
    /// Set when the step began with a full grid rebuild.
    pub rebuilt: Option<RebuildReason>,
    pub axis_count: usize,
    /// Particles touching at least one wall after the step.
    pub wall_contacts: usize,
    /// Overlapping pairs resolved.
    pub pair_contacts: usize,
}

pub struct Simulation {
    config: SimConfig,
    cube: Cube,
    store: ParticleStore,
    grid: SpatialGrid,
    policy: GridPolicy,
    resolver: CollisionResolver,
    rng: fastrand::Rng,
    state: StepperState,
    step_index: u64,
    steps_since_rebuild: u64,
    rebuild_count: u64,
    last_rebuild: Option<RebuildReason>,
    dt: f64,
    sub_steps: u32,
    positions: Vec<Vec3>,
}

impl Simulation {
    /// Validate `config`, place `config.particle_count` particles at rest
    /// under gravity and build the initial grid.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let cube = Cube::new(config.origin, config.cube_size)?;
        let mut rng = config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);

        let mut store = ParticleStore::new();
        store.create(config.particle_count, config.radius, config.mass, &cube, &mut rng)?;
        integrator::apply_uniform_acceleration(&mut store, config.gravity);

        Self::assemble(config, cube, store, rng)
    }

    /// A simulation over explicitly given particles. Each state keeps its own
    /// acceleration; `config.particle_count` is replaced by `states.len()`.
    pub fn from_states(mut config: SimConfig, states: &[ParticleState]) -> Result<Self> {
        config.particle_count = states.len();
        config.validate()?;
        let cube = Cube::new(config.origin, config.cube_size)?;
        let rng = config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);

        let mut store = ParticleStore::new();
        for state in states {
            check_fits(state, &cube)?;
            store.append(*state)?;
        }

        Self::assemble(config, cube, store, rng)
    }

    fn assemble(config: SimConfig, cube: Cube, store: ParticleStore, rng: fastrand::Rng) -> Result<Self> {
        let policy = GridPolicy::from(&config);
        let axis_count = policy.desired_axis_count(&store, &cube);
        let grid = SpatialGrid::build(&store, &cube, axis_count)?;
        tracing::info!(
            "Created simulation: {} particles, cube side {}, grid {axis_count}^3",
            store.count(),
            cube.size
        );

        let positions = store.positions();
        Ok(Self {
            resolver: CollisionResolver::from(&config),
            config,
            cube,
            store,
            grid,
            policy,
            rng,
            state: StepperState::Idle,
            step_index: 0,
            steps_since_rebuild: 0,
            rebuild_count: 1,
            last_rebuild: Some(RebuildReason::Initial),
            dt: 0.0,
            sub_steps: 0,
            positions,
        })
    }

    /// Advance the simulation by `dt`, integrated in `sub_steps` sub-steps.
    ///
    /// Invalid arguments return a configuration error and change nothing.
    /// An allocation failure faults the stepper.
    pub fn step(&mut self, dt: f64, sub_steps: u32) -> Result<StepReport> {
        if self.state == StepperState::Faulted {
            return Err(SimError::Faulted);
        }
        integrator::validate_step(dt, sub_steps)?;

        self.state = StepperState::Stepping;
        match self.run_step(dt, sub_steps) {
            Ok(report) => {
                self.state = StepperState::Idle;
                Ok(report)
            }
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!("Step {} failed: {e}", self.step_index + 1);
                    self.state = StepperState::Faulted;
                } else {
                    self.state = StepperState::Idle;
                }
                Err(e)
            }
        }
    }

    /// [`step`](Self::step) reduced to a success flag. Errors are logged.
    pub fn step_succeeded(&mut self, dt: f64, sub_steps: u32) -> bool {
        match self.step(dt, sub_steps) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("step({dt}, {sub_steps}) failed: {e}");
                false
            }
        }
    }

    fn run_step(&mut self, dt: f64, sub_steps: u32) -> Result<StepReport> {
        let desired = self.policy.desired_axis_count(&self.store, &self.cube);
        let rebuilt = self.policy.rebuild_reason(
            Some(self.grid.axis_count()),
            desired,
            self.steps_since_rebuild,
        );
        match rebuilt {
            Some(reason) => {
                self.grid.rebuild(&self.store, &self.cube, desired)?;
                self.rebuild_count += 1;
                self.steps_since_rebuild = 0;
                tracing::info!("Grid rebuilt at step {} ({reason:?}), axis count {desired}", self.step_index + 1);
            }
            None => {
                let moved = self.grid.update_membership(&self.store);
                tracing::debug!("Grid kept at axis count {}, {moved} particles re-filed", self.grid.axis_count());
            }
        }

        integrator::advance(&mut self.store, dt, sub_steps)?;
        let wall_contacts = self.resolver.resolve_walls(&mut self.store, &self.cube);
        self.grid.update_membership(&self.store);
        let pair_contacts = self.resolver.resolve_pairs(&mut self.store, &self.grid);
        self.grid.update_membership(&self.store);

        self.step_index += 1;
        self.steps_since_rebuild += 1;
        self.last_rebuild = rebuilt;
        self.dt = dt;
        self.sub_steps = sub_steps;
        self.refresh_positions();

        Ok(StepReport {
            step_index: self.step_index,
            rebuilt,
            axis_count: self.grid.axis_count(),
            wall_contacts,
            pair_contacts,
        })
    }

    /// Add a particle at rest, with the configured radius, mass and gravity,
    /// at a random position clear of the existing particles where possible.
    pub fn add_particle(&mut self) -> Result<ParticleHandle> {
        let radius = self.config.radius;
        let position = self
            .store
            .sample_positions(1, radius, &self.cube, &mut self.rng)
            .pop()
            .unwrap_or_else(|| self.cube.center());
        let state = ParticleState::at_rest(position, radius, self.config.mass)
            .with_acceleration(self.config.gravity);
        self.add_particle_with(state)
    }

    /// Add a particle with an explicit state.
    pub fn add_particle_with(&mut self, state: ParticleState) -> Result<ParticleHandle> {
        check_fits(&state, &self.cube)?;
        let handle = self.store.append(state)?;
        self.grid.insert(handle, state.position);
        self.refresh_positions();
        tracing::debug!("Added particle {handle} at {:?}", state.position);
        Ok(handle)
    }

    /// Remove a particle from the store and the grid. A stale handle is a
    /// [`SimError::NotFound`] and leaves everything unchanged.
    pub fn remove_particle(&mut self, handle: ParticleHandle) -> Result<Particle> {
        let particle = self.store.remove(handle)?;
        self.grid.remove(handle);
        self.refresh_positions();
        tracing::debug!("Removed particle {handle}");
        Ok(particle)
    }

    fn refresh_positions(&mut self) {
        self.positions.clear();
        self.positions.extend(self.store.iter().map(|(_, p)| p.position));
    }

    /// Positions after the last completed step, in ascending handle order.
    #[must_use]
    pub fn read_positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// The position snapshot as raw bytes (three `f64` per particle).
    #[must_use]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    #[must_use]
    pub fn partition_axis_count(&self) -> usize {
        self.grid.axis_count()
    }

    /// Whether the most recent step began with a full rebuild. Before the
    /// first step this reports the initial build.
    #[must_use]
    pub fn last_step_rebuilt(&self) -> bool {
        self.last_rebuild.is_some()
    }

    #[must_use]
    pub fn last_rebuild_reason(&self) -> Option<RebuildReason> {
        self.last_rebuild
    }

    /// Full grid builds so far, including the initial one.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    #[must_use]
    pub fn state(&self) -> StepperState {
        self.state
    }

    #[must_use]
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    /// `(dt, sub_steps)` of the last completed step; `(0.0, 0)` before any.
    #[must_use]
    pub fn last_step_size(&self) -> (f64, u32) {
        (self.dt, self.sub_steps)
    }

    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.store.count()
    }

    #[must_use]
    pub fn particle(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.store.get(handle)
    }

    #[must_use]
    pub fn store(&self) -> &ParticleStore {
        &self.store
    }

    #[must_use]
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    #[must_use]
    pub fn grid_stats(&self) -> GridStats {
        self.grid.stats()
    }

    #[must_use]
    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.store.kinetic_energy()
    }
}

fn check_fits(state: &ParticleState, cube: &Cube) -> Result<()> {
    if 2.0 * state.radius > cube.size {
        return Err(SimError::config(format!(
            "particle diameter {} exceeds cube side {}",
            2.0 * state.radius,
            cube.size
        )));
    }
    Ok(())
}
