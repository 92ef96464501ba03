use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use maze_keeper_core::{
    agent::KeeperAgent,
    environment::{MissionReport, load_maze_from_string},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Give up after this many actions
    #[arg(long, default_value_t = 10_000)]
    max_steps: usize,

    /// Print the mission report as JSON
    #[arg(long)]
    json: bool,
}

/// Installs the stderr tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn print_report(report: &MissionReport) {
    let outcome = if report.completed {
        "Maze completed!"
    } else {
        "Maze not completed."
    };
    println!("{outcome}");
    println!("Steps: {}", report.steps);
    println!("Keys: {}/{}", report.keys_found, report.total_keys);
    println!("Final position: {}", report.final_position);
}

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    // If no map file is provided, use the default map
    let map_file = args.map.unwrap_or(PathBuf::from("maps/map01.txt"));
    let map_string = std::fs::read_to_string(&map_file)
        .with_context(|| format!("Failed to read map file {}", map_file.display()))?;
    let mut maze = load_maze_from_string(&map_string)
        .with_context(|| format!("Failed to load maze from {}", map_file.display()))?;

    info!(map = %map_file.display(), max_steps = args.max_steps, "starting mission");
    let mut agent = KeeperAgent::new();
    let report = maze.run_mission(&mut agent, args.max_steps);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.completed {
        anyhow::bail!("mission gave up after {} steps", report.steps);
    }
    Ok(())
}
