//! simtop - a simulated operating system monitor for your terminal
//!
//! Every process, service, socket and sensor reading on screen is produced
//! by a seeded tick engine; nothing is read from the host.

mod advisory;
mod config;
mod core;
mod report;
mod shell;
mod sim;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::advisory::{Advisor, HttpAdvisor, Snapshot};
use crate::core::app::App;
use crate::shell::{LineKind, Shell};
use crate::sim::model::StressMode;
use crate::sim::{Command, Simulation};

#[derive(Parser)]
#[command(name = "simtop")]
#[command(author = "simtop Contributors")]
#[command(version = "0.1.0")]
#[command(about = "A simulated operating system monitor for your terminal", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Seed for the simulation (random when omitted)
    #[arg(short, long, global = true, env = "SIMTOP_SEED")]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation headless and print per-tick telemetry
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "30")]
        ticks: u64,

        /// Stress mode (none, cpu, memory, network)
        #[arg(long, default_value = "none")]
        stress: StressMode,

        /// Print a JSON report instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the process table after a number of ticks
    Ps {
        /// Number of ticks to run first
        #[arg(short, long, default_value = "5")]
        ticks: u64,

        /// Rows to show
        #[arg(short, long, default_value = "15")]
        limit: usize,
    },

    /// Ask the advisory endpoint for a health verdict
    Analyze {
        /// Number of ticks to run first
        #[arg(short, long, default_value = "10")]
        ticks: u64,
    },

    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

fn setup_logging(verbosity: u8) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // The TUI owns stdout, so logs go to a file
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("simtop")
        .join("logs");

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "simtop.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

fn load_config(explicit: Option<PathBuf>) -> Result<config::Config> {
    let config_path = explicit.or_else(|| {
        let default_config = config::Config::default_path()?;
        if default_config.exists() {
            Some(default_config)
        } else {
            None
        }
    });

    match config_path {
        Some(path) => config::Config::load(&path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(config::Config::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive for the duration of the program
    let _logging_guard = setup_logging(cli.verbose)?;

    tracing::info!(seed = ?cli.seed, "starting simtop");

    match cli.command {
        Some(Commands::Init { force }) => {
            let path = cli
                .config
                .or_else(config::Config::default_path)
                .context("no configuration directory available")?;
            config::init_config(&path, force)?;
        }
        Some(Commands::Simulate {
            ticks,
            stress,
            json,
        }) => {
            let mut sim = Simulation::new(load_config(cli.config)?, cli.seed);
            sim.apply(Command::SetStressMode(stress))?;
            let report = report::simulate(&mut sim, ticks);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report::render_table(&report));
            }
        }
        Some(Commands::Ps { ticks, limit }) => {
            let mut sim = Simulation::new(load_config(cli.config)?, cli.seed);
            report::simulate(&mut sim, ticks);
            let mut shell = Shell::new();
            for line in shell.execute(&format!("ps {}", limit), &mut sim) {
                if line.kind != LineKind::Input {
                    println!("{}", line.text);
                }
            }
        }
        Some(Commands::Analyze { ticks }) => {
            let config = load_config(cli.config)?;
            let advisor = HttpAdvisor::from_config(&config.advisory)
                .context("enable the [advisory] section of the configuration first")?;
            let mut sim = Simulation::new(config, cli.seed);
            report::simulate(&mut sim, ticks);
            let snapshot = Snapshot::capture(&sim);
            let result = advisor.analyze(&snapshot).await?;
            print!("{}", report::render_analysis(&result));
        }
        None => {
            // Launch the dashboard
            let mut app = App::new(load_config(cli.config)?, cli.seed)?;
            app.run().await?;
        }
    }

    Ok(())
}
