#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line driver that runs and resumes lung infection simulations.

mod geometry;

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lungsim_core::{GridShape, TissueGrid, TissueType};
use lungsim_simulation::{Simulation, SimulationConfig};
use lungsim_world::query;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lungsim", version, about = "Run the lung infection simulation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a new run from a configuration document.
    Run {
        /// TOML configuration with every simulation parameter.
        #[arg(long)]
        config: PathBuf,
        /// JSON tissue geometry; the grid is filled with `--fill` when omitted.
        #[arg(long)]
        geometry: Option<PathBuf>,
        /// Tissue used for every voxel when no geometry is supplied.
        #[arg(long, value_enum, default_value_t = Fill::Epithelium)]
        fill: Fill,
        /// Number of ticks to advance.
        #[arg(long)]
        ticks: u64,
        /// Path receiving the final snapshot.
        #[arg(long)]
        output: PathBuf,
    },
    /// Continue a run from a snapshot.
    Resume {
        /// Snapshot written by a previous run.
        #[arg(long)]
        snapshot: PathBuf,
        /// Number of additional ticks to advance.
        #[arg(long)]
        ticks: u64,
        /// Path receiving the final snapshot.
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Fill {
    Air,
    Blood,
    Other,
    Epithelium,
    Surfactant,
    Pore,
}

impl From<Fill> for TissueType {
    fn from(fill: Fill) -> Self {
        match fill {
            Fill::Air => Self::Air,
            Fill::Blood => Self::Blood,
            Fill::Other => Self::Other,
            Fill::Epithelium => Self::Epithelium,
            Fill::Surfactant => Self::Surfactant,
            Fill::Pore => Self::Pore,
        }
    }
}

/// Entry point for the simulation command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (simulation, output) = match cli.command {
        Command::Run {
            config,
            geometry,
            fill,
            ticks,
            output,
        } => {
            let mut simulation = start(&config, geometry.as_deref(), fill)?;
            advance(&mut simulation, ticks);
            (simulation, output)
        }
        Command::Resume {
            snapshot,
            ticks,
            output,
        } => {
            let file = File::open(&snapshot)
                .with_context(|| format!("failed to open snapshot {}", snapshot.display()))?;
            let mut simulation = Simulation::load(BufReader::new(file))
                .with_context(|| format!("failed to load snapshot {}", snapshot.display()))?;
            advance(&mut simulation, ticks);
            (simulation, output)
        }
    };

    save(&simulation, &output)?;
    println!("{}", summary(&simulation, &output));
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn start(config: &Path, geometry: Option<&Path>, fill: Fill) -> Result<Simulation> {
    let document = fs::read_to_string(config)
        .with_context(|| format!("failed to read configuration {}", config.display()))?;
    let config = SimulationConfig::from_toml_str(&document)
        .with_context(|| format!("invalid configuration {}", config.display()))?;

    let tissue = match geometry {
        Some(path) => geometry::load(path)?,
        None => {
            let [x, y, z] = config.grid.shape;
            TissueGrid::uniform(GridShape::new(x, y, z), fill.into())
                .context("grid shape cannot be addressed")?
        }
    };

    Simulation::initialize(config, tissue).context("failed to initialize simulation")
}

fn advance(simulation: &mut Simulation, ticks: u64) {
    for _ in 0..ticks {
        let _ = simulation.advance();
    }
    info!(
        tick = simulation.tick_index(),
        time = simulation.time(),
        "run finished"
    );
}

fn save(simulation: &Simulation, output: &Path) -> Result<()> {
    let file = File::create(output)
        .with_context(|| format!("failed to create snapshot {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    simulation
        .save(&mut writer)
        .with_context(|| format!("failed to write snapshot {}", output.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush snapshot {}", output.display()))
}

fn summary(simulation: &Simulation, output: &Path) -> String {
    let world = simulation.world();
    format!(
        "tick {} time {:.1} macrophages {} fungi {} snapshot {}",
        simulation.tick_index(),
        simulation.time(),
        query::living_macrophages(world),
        query::living_fungi(world),
        output.display()
    )
}
