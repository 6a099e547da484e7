//! Batch ingestion from a JSON file

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_success, print_warning, OutputFormat};
use monitor_lib::ReadingInput;

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Device")]
    device_id: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Parse a file holding either a JSON array of readings or a single reading
pub fn parse_readings(content: &str) -> Result<Vec<ReadingInput>> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Readings file is not valid JSON")?;

    if value.is_array() {
        serde_json::from_value(value).context("Readings file does not hold reading objects")
    } else {
        let reading: ReadingInput =
            serde_json::from_value(value).context("Readings file does not hold a reading object")?;
        Ok(vec![reading])
    }
}

/// Submit the readings in `file` as one batch
pub async fn ingest_file(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let readings = parse_readings(&content)?;

    if readings.is_empty() {
        print_warning("No readings to submit");
        return Ok(());
    }

    let report = client.ingest(&readings).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            if report.failures.is_empty() {
                print_success(&format!(
                    "Ingested {} of {} readings",
                    report.accepted, report.received
                ));
                return Ok(());
            }

            print_warning(&format!(
                "Ingested {} of {} readings, {} rejected",
                report.accepted,
                report.received,
                report.failures.len().to_string().red()
            ));

            let rows: Vec<FailureRow> = report
                .failures
                .iter()
                .map(|f| FailureRow {
                    index: f.index,
                    device_id: f.device_id.clone(),
                    reason: f.reason.clone(),
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
