#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::float_cmp
)]
//! # Particles
//!
//! Spheres bouncing inside a cube, with a uniform grid as the collision
//! broad phase.
//!
//! ## Key Components
//!
//! -   **Storage:** [`ParticleStore`] owns every particle in index-stable
//!     slots addressed by generational [`ParticleHandle`]s.
//! -   **Broad phase:** [`SpatialGrid`] files particles into A×A×A cells.
//!     [`GridPolicy`] picks A from the particle density and decides when a
//!     full rebuild is due; other steps only re-file particles that moved.
//! -   **Integration:** the [`integrator`] module advances velocities and
//!     positions with semi-implicit Euler over a number of sub-steps.
//! -   **Collisions:** [`CollisionResolver`] clamps particles to the walls
//!     and resolves overlapping pairs with an impulse and a positional split.
//! -   **Simulation:** [`Simulation`] runs the step pipeline and is the entry
//!     point for callers such as a renderer or a benchmark harness.
//!
//! ## Usage
//!
//! ```rust
//! use particles::{SimConfig, Simulation};
//!
//! let config = SimConfig::new(100, 0.25, 10.0).with_seed(1);
//! let mut sim = Simulation::new(config)?;
//! for _ in 0..10 {
//!     sim.step(1e-3, 4)?;
//! }
//! assert_eq!(sim.read_positions().len(), 100);
//! # Ok::<(), particles::SimError>(())
//! ```

pub mod collision;
pub mod config;
pub mod error;
pub mod grid;
pub mod integrator;
pub mod simulation;
pub mod store;
pub mod types;

pub use collision::{CollisionResolver, Contact};
pub use config::SimConfig;
pub use error::{Result, SimError};
pub use grid::{CellCoord, GridPolicy, GridStats, RebuildReason, SpatialGrid};
pub use simulation::{Simulation, StepReport, StepperState};
pub use store::ParticleStore;
pub use types::{Cube, Particle, ParticleHandle, ParticleState, Vec3, WallFlags};
