//! Device and reading commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, format_timestamp, print_rows, OutputFormat};
use monitor_lib::{Device, DeviceStatus, SensorReading};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    class: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Power (kW)")]
    power_kw: String,
    #[tabled(rename = "Temp (°C)")]
    temperature_c: String,
    #[tabled(rename = "Vibration")]
    vibration: String,
    #[tabled(rename = "Runtime (h)")]
    runtime_hours: String,
}

fn status_label(status: DeviceStatus) -> &'static str {
    match status {
        DeviceStatus::Active => "active",
        DeviceStatus::Inactive => "inactive",
        DeviceStatus::Maintenance => "maintenance",
    }
}

fn device_rows(devices: &[Device]) -> Vec<DeviceRow> {
    devices
        .iter()
        .map(|d| DeviceRow {
            id: d.id.clone(),
            name: d.name.clone(),
            class: d.class.to_string(),
            location: d.location.clone(),
            status: color_status(status_label(d.status)),
        })
        .collect()
}

/// Resolve device ids to names for display, falling back to the id
fn reading_rows(readings: &[SensorReading], devices: &[Device]) -> Vec<ReadingRow> {
    readings
        .iter()
        .map(|r| ReadingRow {
            timestamp: format_timestamp(&r.timestamp),
            device: devices
                .iter()
                .find(|d| d.id == r.device_id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| r.device_id.clone()),
            power_kw: format!("{:.2}", r.power_kw),
            temperature_c: format!("{:.1}", r.temperature_c),
            vibration: format!("{:.2}", r.vibration),
            runtime_hours: format!("{:.1}", r.runtime_hours),
        })
        .collect()
}

/// List the device fleet
pub async fn list_devices(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let devices = client.devices().await?;
    print_rows(&devices, device_rows, "No devices registered", format)?;
    if format == OutputFormat::Table && !devices.is_empty() {
        println!("\nTotal: {} devices", devices.len());
    }
    Ok(())
}

/// Show the most recent readings, newest first
pub async fn list_readings(
    client: &ApiClient,
    device: Option<String>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let readings = client.readings(device.as_deref(), Some(limit)).await?;

    // Names are only needed for the table view
    let devices = match format {
        OutputFormat::Table if !readings.is_empty() => client.devices().await?,
        _ => Vec::new(),
    };

    print_rows(
        &readings,
        |items| reading_rows(items, &devices),
        "No readings found",
        format,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_lib::DeviceClass;

    #[test]
    fn test_reading_rows_use_device_names() {
        let motor = Device::new("Motor-A1", DeviceClass::Motor, "Building A");
        let known = SensorReading::new(motor.id.clone(), 25.004, 65.04, 2.5, 8.0);
        let unknown = SensorReading::new("external-7", 5.0, 30.0, 1.0, 2.0);

        let rows = reading_rows(&[known, unknown], &[motor]);

        assert_eq!(rows[0].device, "Motor-A1");
        assert_eq!(rows[0].power_kw, "25.00");
        assert_eq!(rows[0].temperature_c, "65.0");
        assert_eq!(rows[1].device, "external-7");
    }
}
