//! Command-line front end for STM task planning.
//!
//! Loads the configured task specifications, then either prints their
//! expanded plan, estimates a voltage loop, or runs everything through the
//! mock executor.
//!
//! ```bash
//! RUST_LOG=stm_automator=debug cargo run -- --config config/stm_automator.toml plan
//! cargo run -- estimate --start 0.2 --stop 1.0 --step 0.1 --repetitions 3
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stm_automator::config::{AutomatorConfig, DEFAULT_CONFIG_PATH};
use stm_automator::quantity::{ScaledDecimal, Unit};
use stm_automator::schedule::{estimated_duration, total_image_count, ScheduleEstimate};
use stm_automator::simulator::MockExecutor;
use stm_automator::task_set::TaskSetSummary;

/// Plan and track STM acquisition batches
#[derive(Parser)]
#[command(name = "stm_automator")]
#[command(about = "Plan and track scanning tunneling microscope task sets", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file [default: config/stm_automator.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand the configured tasks and print their work items
    Plan,

    /// Estimate image count and time for a voltage loop
    Estimate {
        /// Start voltage in volts
        #[arg(long, default_value_t = 0.2, allow_negative_numbers = true)]
        start: f64,

        /// Stop voltage in volts
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        stop: f64,

        /// Voltage step in volts
        #[arg(long, default_value_t = 0.1, allow_negative_numbers = true)]
        step: f64,

        /// Repetitions of the loop
        #[arg(long, default_value_t = 1)]
        repetitions: u32,

        /// Time per scan line in seconds
        #[arg(long, default_value_t = 1.0)]
        line_time: f64,

        /// Lines per frame
        #[arg(long, default_value_t = 256)]
        lines_per_frame: u32,
    },

    /// Run the configured tasks through the mock executor
    Simulate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AutomatorConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AutomatorConfig::load().with_context(|| format!("loading {DEFAULT_CONFIG_PATH}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.application.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(app = %config.application.name, tasks = config.tasks.len(), "Configuration loaded");

    match cli.command {
        Commands::Plan => plan(&config, cli.json),
        Commands::Estimate {
            start,
            stop,
            step,
            repetitions,
            line_time,
            lines_per_frame,
        } => {
            let volts = |x: f64| -> Result<ScaledDecimal> {
                Ok(ScaledDecimal::from_real(x)?.with_unit(Unit::Volt))
            };
            let image_count = total_image_count(volts(start)?, volts(stop)?, volts(step)?, repetitions)?;
            let line_time = ScaledDecimal::from_real(line_time)?.with_unit(Unit::Second);
            let estimate = ScheduleEstimate {
                image_count,
                duration: estimated_duration(line_time, lines_per_frame, image_count),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&estimate)?);
            } else {
                println!("{estimate}");
            }
            Ok(())
        }
        Commands::Simulate => simulate(&config, cli.json).await,
    }
}

fn plan(config: &AutomatorConfig, json: bool) -> Result<()> {
    if config.tasks.is_empty() {
        warn!("No tasks configured");
    }
    let list = config.task_list()?;
    let summaries: Vec<TaskSetSummary> = list.iter().map(|set| set.summary()).collect();
    print_summaries(&summaries, json)
}

async fn simulate(config: &AutomatorConfig, json: bool) -> Result<()> {
    let mut list = config.task_list()?;
    let executor = MockExecutor::from_config(&config.simulation);
    executor.run_all(&mut list).await?;

    info!(progress = list.overall_progress(), "Simulation complete");
    let summaries: Vec<TaskSetSummary> = list.iter().map(|set| set.summary()).collect();
    print_summaries(&summaries, json)
}

fn print_summaries(summaries: &[TaskSetSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
    } else {
        for summary in summaries {
            println!("{summary}\n");
        }
    }
    Ok(())
}
