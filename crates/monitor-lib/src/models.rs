//! Core data models for the monitoring pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::IngestError;

/// Equipment class of a monitored device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Motor,
    Compressor,
    Hvac,
    Conveyor,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 4] = [
        DeviceClass::Motor,
        DeviceClass::Compressor,
        DeviceClass::Hvac,
        DeviceClass::Conveyor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Motor => "motor",
            DeviceClass::Compressor => "compressor",
            DeviceClass::Hvac => "hvac",
            DeviceClass::Conveyor => "conveyor",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "motor" => Ok(DeviceClass::Motor),
            "compressor" => Ok(DeviceClass::Compressor),
            "hvac" => Ok(DeviceClass::Hvac),
            "conveyor" => Ok(DeviceClass::Conveyor),
            other => Err(format!("unknown device class '{}'", other)),
        }
    }
}

/// Operational status of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    Inactive,
    Maintenance,
}

/// A monitored piece of industrial equipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub class: DeviceClass,
    pub location: String,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// Create an active device with a fresh identifier
    pub fn new(name: impl Into<String>, class: DeviceClass, location: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            class,
            location: location.into(),
            status: DeviceStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Metrics carried by every sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PowerKw,
    TemperatureC,
    Vibration,
    RuntimeHours,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::PowerKw => "power_kw",
            Metric::TemperatureC => "temperature_c",
            Metric::Vibration => "vibration",
            Metric::RuntimeHours => "runtime_hours",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry sample for a device. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: Uuid,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub power_kw: f64,
    pub temperature_c: f64,
    pub vibration: f64,
    pub runtime_hours: f64,
}

impl SensorReading {
    pub fn new(
        device_id: impl Into<String>,
        power_kw: f64,
        temperature_c: f64,
        vibration: f64,
        runtime_hours: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: device_id.into(),
            timestamp: Utc::now(),
            power_kw,
            temperature_c,
            vibration,
            runtime_hours,
        }
    }

    /// Observed value of a metric
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::PowerKw => self.power_kw,
            Metric::TemperatureC => self.temperature_c,
            Metric::Vibration => self.vibration,
            Metric::RuntimeHours => self.runtime_hours,
        }
    }
}

/// Externally submitted reading, validated before it enters the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingInput {
    pub device_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub power_kw: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub vibration: Option<f64>,
    #[serde(default)]
    pub runtime_hours: Option<f64>,
}

impl ReadingInput {
    /// Reject malformed input before it can reach the evaluator
    pub fn validate(self) -> Result<SensorReading, IngestError> {
        if self.device_id.trim().is_empty() {
            return Err(IngestError::InvalidInput("device_id is empty".to_string()));
        }

        let power_kw = required(Metric::PowerKw, self.power_kw)?;
        let temperature_c = required(Metric::TemperatureC, self.temperature_c)?;
        let vibration = required(Metric::Vibration, self.vibration)?;
        let runtime_hours = required(Metric::RuntimeHours, self.runtime_hours)?;

        let mut reading = SensorReading::new(
            self.device_id,
            power_kw,
            temperature_c,
            vibration,
            runtime_hours,
        );
        if let Some(ts) = self.timestamp {
            reading.timestamp = ts;
        }
        Ok(reading)
    }
}

fn required(metric: Metric, value: Option<f64>) -> Result<f64, IngestError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(IngestError::InvalidInput(format!(
            "{} is not a finite number ({})",
            metric, v
        ))),
        None => Err(IngestError::InvalidInput(format!("missing metric {}", metric))),
    }
}

/// Alert severity tiers, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert kind classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ThresholdExceeded,
}

/// A threshold violation raised for one metric of one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub device_id: String,
    #[serde(rename = "alert_type")]
    pub kind: AlertKind,
    pub metric: Metric,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub message: String,
    pub acknowledged: bool,
    pub timestamp: DateTime<Utc>,
}

/// Event delivered to live subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SensorReading {
        data: SensorReading,
        #[serde(skip_serializing_if = "Option::is_none")]
        device_name: Option<String>,
    },
    Alert { data: Vec<Alert> },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SensorReading { .. } => "sensor_reading",
            Event::Alert { .. } => "alert",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_input() -> ReadingInput {
        ReadingInput {
            device_id: "dev-1".to_string(),
            timestamp: None,
            power_kw: Some(10.0),
            temperature_c: Some(40.0),
            vibration: Some(1.0),
            runtime_hours: Some(8.0),
        }
    }

    #[test]
    fn test_validate_complete_input() {
        let reading = complete_input().validate().unwrap();
        assert_eq!(reading.device_id, "dev-1");
        assert_eq!(reading.value(Metric::PowerKw), 10.0);
        assert_eq!(reading.value(Metric::RuntimeHours), 8.0);
    }

    #[test]
    fn test_validate_rejects_missing_metric() {
        let input = ReadingInput {
            vibration: None,
            ..complete_input()
        };
        let err = input.validate().unwrap_err();
        assert!(err.to_string().contains("vibration"));
    }

    #[test]
    fn test_validate_rejects_non_finite_and_blank_device() {
        let nan = ReadingInput {
            power_kw: Some(f64::NAN),
            ..complete_input()
        };
        assert!(matches!(nan.validate(), Err(IngestError::InvalidInput(_))));

        let blank = ReadingInput {
            device_id: "  ".to_string(),
            ..complete_input()
        };
        assert!(matches!(blank.validate(), Err(IngestError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_keeps_supplied_timestamp() {
        let ts = "2025-03-26T18:45:00Z".parse::<DateTime<Utc>>().unwrap();
        let input = ReadingInput {
            timestamp: Some(ts),
            ..complete_input()
        };
        assert_eq!(input.validate().unwrap().timestamp, ts);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_event_discriminator() {
        let reading = SensorReading::new("dev-1", 1.0, 2.0, 3.0, 4.0);
        let event = Event::SensorReading {
            data: reading,
            device_name: Some("Motor-A1".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sensor_reading");
        assert_eq!(json["device_name"], "Motor-A1");
        assert_eq!(json["data"]["power_kw"], 1.0);

        let alerts = serde_json::to_value(Event::Alert { data: vec![] }).unwrap();
        assert_eq!(alerts["type"], "alert");
        assert!(alerts["data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_device_class_parse() {
        assert_eq!("hvac".parse::<DeviceClass>().unwrap(), DeviceClass::Hvac);
        assert!("crane".parse::<DeviceClass>().is_err());
        for class in DeviceClass::ALL {
            assert_eq!(class.as_str().parse::<DeviceClass>().unwrap(), class);
        }
    }
}
