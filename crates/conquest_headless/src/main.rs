//! Headless conquest match runner.
//!
//! Runs matches without a client, for AI soak tests, CI determinism checks
//! and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Run a single match
//! cargo run -p conquest_headless -- run --scenario skirmish
//!
//! # Run a batch of seeds
//! cargo run -p conquest_headless -- batch --scenario skirmish --count 100 --output results/
//!
//! # Verify determinism
//! cargo run -p conquest_headless -- verify --scenario archipelago --seed 12345 --runs 5
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conquest_core::Tick;
use conquest_headless::{
    batch::{run_batch, verify_determinism, BatchConfig, BatchResults},
    error::{HeadlessError, Result},
    replay::{record_to_file, verify_file},
    runner::run_match,
    scenario::{Scenario, BUILTIN_SCENARIOS},
};

#[derive(Parser)]
#[command(name = "conquest_headless")]
#[command(about = "Headless conquest match runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single match and print its summary
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Override the tick limit
        #[arg(short, long)]
        ticks: Option<Tick>,
    },

    /// Run a batch of seeds in parallel
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Number of matches to run
        #[arg(short, long, default_value = "20")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Override the tick limit
        #[arg(short, long)]
        ticks: Option<Tick>,
    },

    /// Run one seed several times and compare final hashes
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "3")]
        runs: u32,

        /// Override the tick limit
        #[arg(short, long)]
        ticks: Option<Tick>,
    },

    /// Record a match to a replay file
    Record {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "duel")]
        scenario: String,

        /// Seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Override the tick limit
        #[arg(short, long)]
        ticks: Option<Tick>,

        /// Replay file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Play back a replay and check its final hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List built-in scenarios
    Scenarios,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs to stderr; stdout carries results
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(name: &str, ticks: Option<Tick>) -> Result<Scenario> {
    let mut scenario = Scenario::resolve(name)?;
    if let Some(ticks) = ticks {
        scenario.max_ticks = ticks;
    }
    Ok(scenario)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            scenario,
            seed,
            ticks,
        } => {
            let scenario = load_scenario(&scenario, ticks)?;
            let summary = run_match(&scenario, seed.unwrap_or(scenario.seed))?;
            print_json(&summary)
        }
        Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            ticks,
        } => {
            let mut config = BatchConfig::new(&scenario, count)
                .with_seed(seed)
                .with_parallelism(parallel);
            config.max_ticks = ticks;
            let results = run_batch(config)?;
            if let Some(dir) = output {
                let path = BatchResults::default_path(&dir);
                results.save(&path)?;
                tracing::info!(path = %path.display(), "Results saved");
            }
            print_json(&results.summary)?;
            if results.errors.is_empty() {
                Ok(())
            } else {
                Err(HeadlessError::MatchesFailed {
                    failed: results.errors.len(),
                    total: count,
                })
            }
        }
        Commands::Verify {
            scenario,
            seed,
            runs,
            ticks,
        } => {
            let scenario = load_scenario(&scenario, ticks)?;
            let report = verify_determinism(&scenario, seed, runs)?;
            print_json(&report)?;
            if report.is_deterministic() {
                Ok(())
            } else {
                Err(HeadlessError::Nondeterministic {
                    seed,
                    distinct: report.distinct_hashes(),
                })
            }
        }
        Commands::Record {
            scenario,
            seed,
            ticks,
            output,
        } => {
            let scenario = load_scenario(&scenario, ticks)?;
            let summary = record_to_file(&scenario, seed.unwrap_or(scenario.seed), &output)?;
            print_json(&summary)
        }
        Commands::Replay { file } => print_json(&verify_file(&file)?),
        Commands::Scenarios => {
            for name in BUILTIN_SCENARIOS {
                if let Some(scenario) = Scenario::builtin(name) {
                    println!("{name:<12} {}", scenario.description);
                }
            }
            Ok(())
        }
    }
}
