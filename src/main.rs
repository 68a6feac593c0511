//! Gridrunner headless runner
//!
//! Loads a level, optionally validates it only, otherwise drives the
//! simulation at a fixed 60 Hz frame rate and prints every event as a JSON
//! line on stdout.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use thiserror::Error;

use gridrunner::consts::SIM_DT_MS;
use gridrunner::level::{CellKind, LevelError, load_level};
use gridrunner::tuning::{Tuning, TuningError};
use gridrunner::{PhysicsSimulation, TickInput};

/// Run or validate a gridrunner level without a renderer
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Level file (JSON array of rows)
    level: PathBuf,

    /// Tuning overrides (JSON object)
    #[arg(long, value_name = "FILE")]
    tuning: Option<PathBuf>,

    /// Frames to simulate
    #[arg(long, default_value_t = 3600)]
    ticks: u32,

    /// Feed seeded random input instead of holding nothing
    #[arg(long)]
    fuzz: bool,

    /// Seed for --fuzz
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Parse and validate the level, then exit
    #[arg(long)]
    check: bool,
}

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Tuning(#[from] TuningError),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode event: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), RunError> {
    let matrix = load_level(&cli.level)?;
    let tuning = match &cli.tuning {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };

    if cli.check {
        let count = |kind: fn(CellKind) -> bool| matrix.iter().filter(|(_, cell)| kind(cell.kind)).count();
        println!(
            "{}: {}x{} ok ({} cells, {} triggers, {} modifiers, {} finish)",
            cli.level.display(),
            matrix.width(),
            matrix.height(),
            matrix.iter().count(),
            count(CellKind::is_trigger_role),
            count(|k| k.modifier_kind().is_some()),
            count(|k| k == CellKind::Finish),
        );
        return Ok(());
    }

    let mut sim = PhysicsSimulation::new(matrix, tuning);
    let mut rng = Pcg32::seed_from_u64(cli.seed);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for frame in 0..cli.ticks {
        let input = if cli.fuzz {
            TickInput {
                space: rng.random_bool(0.08),
                up: rng.random_bool(0.04),
                down: rng.random_bool(0.04),
            }
        } else {
            TickInput::default()
        };
        sim.tick(&input, SIM_DT_MS);

        for event in sim.drain_events() {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        }
        if sim.is_complete() {
            log::info!("Completed on frame {}", frame);
            break;
        }
    }

    let summary = serde_json::json!({
        "event": "summary",
        "complete": sim.is_complete(),
        "stats": sim.stats(),
        "player": sim.player_state(),
    });
    writeln!(out, "{}", summary)?;
    Ok(())
}
