//! # cubesim
//!
//! Command-line front end for the `particles` engine. It loads a
//! [`SimConfig`], applies flag overrides and then either runs the simulation
//! headless or drives one of the benchmark harnesses.

mod app;
mod bench;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use particles::SimConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cubesim", version, about = "Particles in a cube with a uniform-grid broad phase")]
struct Cli {
    /// JSON file holding a simulation config; missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Per-field overrides applied on top of the config file.
#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long, global = true)]
    particles: Option<usize>,
    #[arg(long, global = true)]
    radius: Option<f64>,
    #[arg(long, global = true)]
    cube_size: Option<f64>,
    /// Restitution for both pairwise and wall contacts
    #[arg(long, global = true)]
    restitution: Option<f64>,
    #[arg(long, global = true)]
    seed: Option<u64>,
}

impl Overrides {
    fn apply(&self, config: &mut SimConfig) {
        if let Some(n) = self.particles {
            config.particle_count = n;
        }
        if let Some(r) = self.radius {
            config.radius = r;
        }
        if let Some(size) = self.cube_size {
            config.cube_size = size;
        }
        if let Some(e) = self.restitution {
            config.restitution = e;
            config.wall_restitution = e;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Step the simulation headless and log progress
    Run {
        #[arg(long, default_value_t = 1000)]
        steps: u64,
        #[arg(long, default_value_t = 1e-3)]
        dt: f64,
        #[arg(long, default_value_t = 4)]
        sub_steps: u32,
        /// Log every N steps
        #[arg(long, default_value_t = 50)]
        log_every: u64,
    },
    /// Time full grid rebuilds for axis counts 1..=max-axis
    Partition {
        #[arg(long, default_value_t = 100)]
        max_axis: usize,
        #[arg(long, default_value_t = 10)]
        iterations: usize,
        /// Write the report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Time every step of repeated runs and count map creations
    Collision {
        #[arg(long, default_value_t = 10_000)]
        steps: usize,
        #[arg(long, default_value_t = 1e-4)]
        dt: f64,
        #[arg(long, default_value_t = 1)]
        sub_steps: u32,
        #[arg(long, default_value_t = 10)]
        iterations: usize,
        /// Write the report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), &cli.overrides)?;

    match cli.command {
        Command::Run { steps, dt, sub_steps, log_every } => {
            app::run(config, &app::RunOptions { steps, dt, sub_steps, log_every })
        }
        Command::Partition { max_axis, iterations, output } => {
            let report = bench::partition_benchmark(&config, max_axis, iterations)?;
            bench::write_report(&report, output.as_deref())
        }
        Command::Collision { steps, dt, sub_steps, iterations, output } => {
            let report = bench::collision_benchmark(&config, steps, dt, sub_steps, iterations)?;
            bench::write_report(&report, output.as_deref())
        }
    }
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<SimConfig> {
    let mut config = match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("invalid simulation config")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() -> Result<()> {
        let cli = Cli::try_parse_from([
            "cubesim", "--particles", "200", "--restitution", "0.75", "run", "--steps", "10",
        ])?;
        let config = load_config(None, &cli.overrides)?;
        assert_eq!(config.particle_count, 200);
        assert_eq!(config.restitution, 0.75);
        assert_eq!(config.wall_restitution, 0.75);
        assert!(matches!(cli.command, Command::Run { steps: 10, .. }));
        Ok(())
    }

    #[test]
    fn invalid_override_is_rejected() -> Result<()> {
        let cli = Cli::try_parse_from(["cubesim", "run", "--cube-size=-2"])?;
        assert!(load_config(None, &cli.overrides).is_err());
        Ok(())
    }

    #[test]
    fn partial_json_config_keeps_defaults() -> Result<()> {
        let config: SimConfig = serde_json::from_str(r#"{ "particle_count": 12, "seed": 5 }"#)?;
        assert_eq!(config.particle_count, 12);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.cube_size, SimConfig::default().cube_size);
        Ok(())
    }
}
