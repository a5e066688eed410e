//! Dining philosophers - simulation runner
//!
//! Seats N philosophers around a table, lets each of them eat, think and
//! occasionally talk for a fixed number of cycles, and prints every
//! transition on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Default table (4 philosophers, 10 cycles each)
//! philosophers
//!
//! # Seven philosophers, three cycles, short delays
//! philosophers 7 --cycles 3 --max-delay-ms 50
//!
//! # Load parameters from a file, print JSON lines
//! philosophers --config table.toml --format json
//!
//! # Enable debug logging (stderr)
//! RUST_LOG=philo_table=debug philosophers
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: every philosopher is interrupted and leaves the table

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use philo_core::{FailurePolicy, SimulationConfig};
use philo_table::{run_reporter, EventSink, OutputFormat, Simulation, SimulationReport};

/// Environment variable naming a default config file.
const CONFIG_ENV: &str = "PHILOSOPHERS_CONFIG";

/// Dining philosophers with a shared talk channel
#[derive(Parser, Debug)]
#[command(name = "philosophers", version, about)]
struct Args {
    /// Number of philosophers at the table
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    actors: Option<u64>,

    /// Eat/think cycles per philosopher
    #[arg(short, long)]
    cycles: Option<u32>,

    /// Upper bound in milliseconds for each eat, think or talk delay
    #[arg(long)]
    max_delay_ms: Option<u64>,

    /// Probability of talking after thinking (0.0 - 1.0)
    #[arg(long)]
    talk_probability: Option<f64>,

    /// What to do when one philosopher stops early
    #[arg(long, value_enum)]
    failure_policy: Option<PolicyArg>,

    /// TOML file with simulation parameters (flags override it)
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Output format for lifecycle events
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PolicyArg {
    StopActor,
    StopAll,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::StopActor => FailurePolicy::StopActor,
            PolicyArg::StopAll => FailurePolicy::StopAll,
        }
    }
}

impl Args {
    /// Builds the effective configuration: defaults, then file, then flags.
    fn into_config(self) -> Result<(SimulationConfig, OutputFormat)> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(actors) = self.actors {
            config.actors = usize::try_from(actors).context("Too many philosophers")?;
        }
        if let Some(cycles) = self.cycles {
            config.cycles = cycles;
        }
        if let Some(max_delay_ms) = self.max_delay_ms {
            config.max_delay_ms = max_delay_ms;
        }
        if let Some(p) = self.talk_probability {
            config.talk_probability = p;
        }
        if let Some(policy) = self.failure_policy {
            config.failure_policy = policy.into();
        }

        Ok((config, self.format.into()))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (config, format) = args.into_config()?;
    let simulation = Simulation::new(config).context("Invalid simulation parameters")?;

    run(simulation, format)
}

/// Runs the simulation (async entry point).
#[tokio::main]
async fn run(simulation: Simulation, format: OutputFormat) -> Result<()> {
    // Logs go to stderr so stdout carries only the event stream
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("philosophers=info".parse()?)
                .add_directive("philo_table=info".parse()?)
                .add_directive("philo_core=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        actors = simulation.config().actors,
        "Dining philosophers starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let (sink, events) = EventSink::channel();
    let reporter = tokio::spawn(run_reporter(events, tokio::io::stdout(), format));

    let report = simulation.run(sink, cancel_token).await?;

    // All senders are gone once every worker has returned
    reporter
        .await
        .context("Event reporter task failed")?
        .context("Failed to write events")?;

    print_summary(&report, format);
    Ok(())
}

fn print_summary(report: &SimulationReport, format: OutputFormat) {
    if format != OutputFormat::Text {
        return;
    }
    if report.all_completed() {
        println!("All philosophers have left. System terminates normally.");
    } else {
        println!(
            "{} of {} philosophers finished their meals before the table closed.",
            report.completed(),
            report.outcomes.len()
        );
    }
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
