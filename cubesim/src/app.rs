//! # Headless Run Loop
//!
//! Steps a [`Simulation`] for a fixed number of steps and logs progress. A
//! renderer would sit in the same loop and upload
//! [`Simulation::position_bytes`] between steps.

use anyhow::{Context, Result};
use particles::{SimConfig, Simulation};

pub struct RunOptions {
    pub steps: u64,
    pub dt: f64,
    pub sub_steps: u32,
    pub log_every: u64,
}

/// Run the simulation described by `config`.
///
/// # Errors
///
/// Returns the construction error, or the first step that fails.
pub fn run(config: SimConfig, options: &RunOptions) -> Result<()> {
    tracing::info!("Initializing simulation...");
    let mut sim = Simulation::new(config).context("failed to create simulation")?;

    tracing::info!(
        "Starting simulation loop for {} steps with dt = {}, {} sub-steps...",
        options.steps,
        options.dt,
        options.sub_steps
    );
    let log_every = options.log_every.max(1);
    for i in 0..options.steps {
        let report = sim
            .step(options.dt, options.sub_steps)
            .with_context(|| format!("simulation step {} failed", i + 1))?;

        if report.step_index % log_every == 0 {
            tracing::info!(
                "Simulation step {} complete. Grid {}^3, {} map creations, {} wall / {} pair contacts, kinetic energy {:.4}",
                report.step_index,
                report.axis_count,
                sim.rebuild_count(),
                report.wall_contacts,
                report.pair_contacts,
                sim.kinetic_energy()
            );
        }
    }

    tracing::info!("Simulation loop finished after {} steps.", sim.step_index());
    let stats = sim.grid_stats();
    tracing::info!(
        "Final grid: {}^3 cells, {} occupied, mean {:.2} / max {} particles per occupied cell",
        stats.axis_count,
        stats.occupied_cells,
        stats.average_entries_per_cell,
        stats.max_entries_per_cell
    );
    if let Some(first) = sim.read_positions().first() {
        tracing::info!("Final position of first particle: {first:?}");
    }
    Ok(())
}
