//! Industrial Energy Monitor CLI
//!
//! A command-line tool for submitting readings, inspecting alerts and
//! controlling the telemetry simulation of a running energy monitor.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::simulation::SimulationAction;
use commands::{alerts, devices, ingest, simulation, status};
use std::path::PathBuf;

/// Industrial Energy Monitor CLI
#[derive(Parser)]
#[command(name = "emon")]
#[command(author, version, about = "CLI for the Industrial Energy Monitor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via EMON_API_URL env var)
    #[arg(long, env = "EMON_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a JSON file of readings as one batch
    Ingest {
        /// Path to a JSON array of readings (or a single reading object)
        file: PathBuf,
    },

    /// Control the telemetry simulation
    #[command(subcommand)]
    Simulation(SimulationCommands),

    /// List alerts
    Alerts {
        /// Filter by device ID
        #[arg(long, short)]
        device: Option<String>,

        /// Show only alerts that have not been acknowledged
        #[arg(long)]
        unacknowledged: bool,
    },

    /// Acknowledge an alert
    Ack {
        /// Alert ID to acknowledge
        id: String,
    },

    /// Show the dashboard summary
    Summary,

    /// List registered devices
    Devices,

    /// Show recent readings
    Readings {
        /// Filter by device ID
        #[arg(long, short)]
        device: Option<String>,

        /// Maximum number of readings
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Show service health
    Health,
}

#[derive(Subcommand)]
pub enum SimulationCommands {
    /// Start generating readings for every device
    Start,
    /// Stop the simulation
    Stop,
    /// Show whether the simulation is running
    Status,
}

impl From<SimulationCommands> for SimulationAction {
    fn from(cmd: SimulationCommands) -> Self {
        match cmd {
            SimulationCommands::Start => SimulationAction::Start,
            SimulationCommands::Stop => SimulationAction::Stop,
            SimulationCommands::Status => SimulationAction::Status,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = run(cli).await {
        if verbose {
            output::print_error(&format!("{:?}", e));
        } else {
            output::print_error(&format!("{:#}", e));
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url);
    let format = config.resolve_format(cli.format)?;

    if cli.verbose {
        eprintln!("Using API at {}", api_url);
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Ingest { file } => ingest::ingest_file(&client, &file, format).await?,
        Commands::Simulation(cmd) => simulation::run(&client, cmd.into(), format).await?,
        Commands::Alerts {
            device,
            unacknowledged,
        } => alerts::list_alerts(&client, device, unacknowledged, format).await?,
        Commands::Ack { id } => alerts::acknowledge(&client, &id, format).await?,
        Commands::Summary => status::show_summary(&client, format).await?,
        Commands::Devices => devices::list_devices(&client, format).await?,
        Commands::Readings { device, limit } => {
            devices::list_readings(&client, device, limit, format).await?
        }
        Commands::Health => status::show_health(&client, format).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_alerts_filters() {
        let cli = Cli::try_parse_from(["emon", "alerts", "--device", "dev-1", "--unacknowledged"])
            .unwrap();
        match cli.command {
            Commands::Alerts {
                device,
                unacknowledged,
            } => {
                assert_eq!(device.as_deref(), Some("dev-1"));
                assert!(unacknowledged);
            }
            _ => panic!("expected alerts command"),
        }
    }

    #[test]
    fn test_parse_format_and_readings_limit() {
        let cli = Cli::try_parse_from(["emon", "--format", "json", "readings", "-l", "5"]).unwrap();
        assert_eq!(cli.format, Some(output::OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Readings { limit: 5, .. }));
    }

    #[test]
    fn test_parse_simulation_subcommands() {
        let cli = Cli::try_parse_from(["emon", "simulation", "stop"]).unwrap();
        match cli.command {
            Commands::Simulation(cmd) => {
                assert_eq!(SimulationAction::from(cmd), SimulationAction::Stop)
            }
            _ => panic!("expected simulation command"),
        }
    }

    #[test]
    fn test_ack_requires_id() {
        assert!(Cli::try_parse_from(["emon", "ack"]).is_err());
    }
}
