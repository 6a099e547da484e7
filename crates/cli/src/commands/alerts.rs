//! Alert listing and acknowledgement

use anyhow::{Context, Result};
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{
    color_severity, format_timestamp, print_json, print_rows, print_success,
    truncate_id, OutputFormat,
};
use monitor_lib::Alert;

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Ack")]
    acknowledged: String,
}

fn alert_rows(alerts: &[Alert]) -> Vec<AlertRow> {
    alerts
        .iter()
        .map(|a| AlertRow {
            id: truncate_id(&a.id.to_string()),
            timestamp: format_timestamp(&a.timestamp),
            device: truncate_id(&a.device_id),
            severity: color_severity(a.severity),
            message: a.message.clone(),
            acknowledged: if a.acknowledged { "yes" } else { "no" }.to_string(),
        })
        .collect()
}

/// List alerts, newest first
pub async fn list_alerts(
    client: &ApiClient,
    device: Option<String>,
    unacknowledged: bool,
    format: OutputFormat,
) -> Result<()> {
    let alerts = client.alerts(device.as_deref(), unacknowledged).await?;
    print_rows(&alerts, alert_rows, "No alerts found", format)?;
    if format == OutputFormat::Table && !alerts.is_empty() {
        println!("\nTotal: {} alerts", alerts.len());
    }
    Ok(())
}

/// Acknowledge one alert by its full id
pub async fn acknowledge(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let alert_id: Uuid = id
        .parse()
        .with_context(|| format!("'{}' is not a valid alert id", id))?;

    let acknowledged = client.acknowledge(alert_id).await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "alert_id": alert_id,
            "acknowledged": acknowledged,
        }))?,
        OutputFormat::Table if acknowledged => {
            print_success(&format!("Alert {} acknowledged", alert_id))
        }
        OutputFormat::Table => {}
    }

    if !acknowledged {
        anyhow::bail!("Alert {} not found", alert_id);
    }
    Ok(())
}
