//! Green Archipelago - command line entry point
//!
//! `run` executes the full phased simulation on a land-cover feed and writes
//! every prepared pool and phase result as JSON into the output directory.
//! `synthetic` writes a generated feed for trying the pipeline out.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use green_archipelago::core::config::SimulationConfig;
use green_archipelago::core::error::Result;
use green_archipelago::prepare::LandCoverFeed;
use green_archipelago::simulation::{generate_feed, Simulation, SyntheticParams};
use green_archipelago::spatial::PlanarGeometry;
use green_archipelago::store::JsonDirStore;

#[derive(Parser, Debug)]
#[command(name = "gac-sim")]
#[command(about = "Phased migration and demolition simulation for urban islands in a greenbelt")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every configured phase on a land-cover feed
    Run {
        /// Land-cover feed (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Simulation config (TOML); built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for persisted node sets and the run summary
        #[arg(long, default_value = "gac-output")]
        out_dir: PathBuf,

        /// Random seed for deterministic runs (overrides the config)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Write a generated land-cover feed
    Synthetic {
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of islands
        #[arg(long, default_value_t = 3)]
        islands: u32,

        /// Cells per side of the parcel grid
        #[arg(long, default_value_t = 30)]
        grid: u32,
    },
}

fn run(
    input: PathBuf,
    config: Option<PathBuf>,
    out_dir: PathBuf,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = match config {
        Some(path) => SimulationConfig::from_file(&path)?,
        None => SimulationConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }

    let feed = LandCoverFeed::from_file(&input)?;
    tracing::info!(
        parcels = feed.parcels.len(),
        islands = feed.islands.len(),
        input = %input.display(),
        "Loaded land-cover feed"
    );

    let geometry = PlanarGeometry::new(config.distance_sentinel);
    let mut store = JsonDirStore::open(&out_dir)?;
    let output = Simulation::new(&config, &mut store)?.run(&feed, &geometry)?;

    let summary_path = out_dir.join("summary.json");
    std::fs::write(&summary_path, output.to_json())?;

    println!("{}", output.summary());
    println!("Results written to {}", out_dir.display());
    Ok(())
}

fn synthetic(out: PathBuf, seed: u64, islands: u32, grid: u32) -> Result<()> {
    let feed = generate_feed(&SyntheticParams {
        grid,
        islands,
        seed,
        ..Default::default()
    });
    std::fs::write(&out, serde_json::to_string_pretty(&feed)?)?;
    println!(
        "Wrote {} parcels on {} islands to {}",
        feed.parcels.len(),
        feed.islands.len(),
        out.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("green_archipelago=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            input,
            config,
            out_dir,
            seed,
        } => run(input, config, out_dir, seed),
        Command::Synthetic {
            out,
            seed,
            islands,
            grid,
        } => synthetic(out, seed, islands, grid),
    }
}
