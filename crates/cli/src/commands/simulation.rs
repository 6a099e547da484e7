//! Simulation control

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, print_info, print_json, print_success, OutputFormat};

/// Which simulation action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationAction {
    Start,
    Stop,
    Status,
}

pub async fn run(client: &ApiClient, action: SimulationAction, format: OutputFormat) -> Result<()> {
    match action {
        SimulationAction::Start | SimulationAction::Stop => {
            let reply = if action == SimulationAction::Start {
                client.start_simulation().await?
            } else {
                client.stop_simulation().await?
            };
            match format {
                OutputFormat::Json => print_json(&reply)?,
                OutputFormat::Table => {
                    // "already running" and "not running" are informational
                    if reply.message.contains("not running") || reply.message.contains("already") {
                        print_info(&reply.message);
                    } else {
                        print_success(&reply.message);
                    }
                }
            }
        }
        SimulationAction::Status => {
            let status = client.simulation_status().await?;
            match format {
                OutputFormat::Json => print_json(&status)?,
                OutputFormat::Table => {
                    let state = if status.running { "running" } else { "stopped" };
                    println!("{}", "Simulation".bold());
                    println!("{}", "=".repeat(30));
                    println!("State:  {}", color_status(state));
                    println!("Ticks:  {}", status.ticks);
                }
            }
        }
    }
    Ok(())
}
