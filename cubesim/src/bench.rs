//! # Benchmark Harness
//!
//! Two measurements over a seeded particle set:
//!
//! - **Partition**: time a full grid rebuild for every axis count from 1 up
//!   to a maximum, averaged over several iterations.
//! - **Collision**: time every step of a run, and record the final axis count
//!   and how many full rebuilds ("map creations") the run needed.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use particles::{SimConfig, Simulation};
use serde::Serialize;

/// Mean, extremes and population standard deviation of a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl Summary {
    /// `None` for an empty sample set.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        Some(Self { count, mean, min, max, std_dev: variance.sqrt() })
    }
}

#[derive(Debug, Serialize)]
pub struct PartitionReport {
    pub particle_count: usize,
    pub iterations: usize,
    pub axis_counts: Vec<usize>,
    /// Mean rebuild time in milliseconds, one entry per axis count.
    pub mean_ms: Vec<f64>,
    pub summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
pub struct CollisionRun {
    pub step_ms: Option<Summary>,
    pub final_axis_count: usize,
    pub map_creations: u64,
}

#[derive(Debug, Serialize)]
pub struct CollisionReport {
    pub particle_count: usize,
    pub steps: usize,
    pub dt: f64,
    pub sub_steps: u32,
    pub simulated_seconds: f64,
    pub runs: Vec<CollisionRun>,
    /// Over every step of every run.
    pub step_ms: Option<Summary>,
}

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Config for the `iteration`-th run: a fixed seed is offset so runs differ
/// but stay reproducible.
fn iteration_config(config: &SimConfig, iteration: usize) -> SimConfig {
    let mut config = config.clone();
    config.seed = config.seed.map(|s| s.wrapping_add(iteration as u64));
    config
}

pub fn partition_benchmark(
    config: &SimConfig,
    max_axis: usize,
    iterations: usize,
) -> Result<PartitionReport> {
    ensure!(max_axis > 0, "max axis count must be > 0");
    ensure!(iterations > 0, "iterations must be > 0");
    tracing::info!("Processing partition data: axis counts 1..={max_axis}, {iterations} iterations");

    let axis_counts: Vec<usize> = (1..=max_axis).collect();
    let mut totals = vec![0.0; max_axis];
    for iteration in 0..iterations {
        let sim = Simulation::new(iteration_config(config, iteration))
            .context("failed to create simulation")?;
        let mut grid = sim.grid().clone();
        for (total, &axis_count) in totals.iter_mut().zip(&axis_counts) {
            let start = Instant::now();
            grid.rebuild(sim.store(), sim.cube(), axis_count)
                .with_context(|| format!("rebuild at axis count {axis_count} failed"))?;
            *total += millis_since(start);
        }
    }

    let mean_ms: Vec<f64> = totals.iter().map(|t| t / iterations as f64).collect();
    let summary = Summary::from_samples(&mean_ms);
    if let Some(s) = &summary {
        tracing::info!(
            "Rebuild time over axis counts: mean {:.4} ms, min {:.4} ms, max {:.4} ms, std {:.4} ms",
            s.mean,
            s.min,
            s.max,
            s.std_dev
        );
    }
    Ok(PartitionReport {
        particle_count: config.particle_count,
        iterations,
        axis_counts,
        mean_ms,
        summary,
    })
}

pub fn collision_benchmark(
    config: &SimConfig,
    steps: usize,
    dt: f64,
    sub_steps: u32,
    iterations: usize,
) -> Result<CollisionReport> {
    ensure!(steps > 0, "steps must be > 0");
    ensure!(iterations > 0, "iterations must be > 0");
    tracing::info!("Processing collision data: {steps} steps x {iterations} iterations");

    let mut runs = Vec::with_capacity(iterations);
    let mut all_steps = Vec::with_capacity(steps * iterations);
    for iteration in 0..iterations {
        let mut sim = Simulation::new(iteration_config(config, iteration))
            .context("failed to create simulation")?;
        let mut step_ms = Vec::with_capacity(steps);
        for i in 0..steps {
            let start = Instant::now();
            sim.step(dt, sub_steps)
                .with_context(|| format!("run {iteration}: step {} failed", i + 1))?;
            step_ms.push(millis_since(start));
        }

        let run = CollisionRun {
            step_ms: Summary::from_samples(&step_ms),
            final_axis_count: sim.partition_axis_count(),
            map_creations: sim.rebuild_count(),
        };
        tracing::info!(
            "Run {}: final grid {}^3 after {} map creations",
            iteration + 1,
            run.final_axis_count,
            run.map_creations
        );
        all_steps.extend(step_ms);
        runs.push(run);
    }

    let step_ms = Summary::from_samples(&all_steps);
    if let Some(s) = &step_ms {
        tracing::info!(
            "Step time: mean {:.4} ms, min {:.4} ms, max {:.4} ms, std {:.4} ms",
            s.mean,
            s.min,
            s.max,
            s.std_dev
        );
    }
    Ok(CollisionReport {
        particle_count: config.particle_count,
        steps,
        dt,
        sub_steps,
        simulated_seconds: steps as f64 * dt,
        runs,
        step_ms,
    })
}

/// Write `report` as pretty JSON to `path`, or log that no file was requested.
pub fn write_report<T: Serialize>(report: &T, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        tracing::debug!("No --output given, report not written");
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_known_samples() {
        let s = Summary::from_samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.count, 8);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert!((s.std_dev - 2.0).abs() < 1e-12);
        assert!(Summary::from_samples(&[]).is_none());
    }

    #[test]
    fn partition_covers_every_axis_count() -> Result<()> {
        let config = SimConfig::new(30, 0.1, 10.0).with_seed(1);
        let report = partition_benchmark(&config, 12, 2)?;
        assert_eq!(report.axis_counts, (1..=12).collect::<Vec<_>>());
        assert_eq!(report.mean_ms.len(), 12);
        assert!(report.mean_ms.iter().all(|t| *t >= 0.0));
        Ok(())
    }

    #[test]
    fn collision_counts_map_creations() -> Result<()> {
        let mut config = SimConfig::new(20, 0.2, 10.0).with_seed(2);
        config.rebuild_interval = 25;
        let report = collision_benchmark(&config, 100, 1e-3, 2, 2)?;
        assert_eq!(report.runs.len(), 2);
        for run in &report.runs {
            // Initial build plus at least the periodic ones.
            assert!(run.map_creations >= 4, "{run:?}");
            assert_eq!(run.step_ms.map(|s| s.count), Some(100));
        }
        assert_eq!(report.step_ms.map(|s| s.count), Some(200));
        Ok(())
    }
}
