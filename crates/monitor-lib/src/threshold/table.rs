//! Per-device-class operating envelopes
//!
//! Read-only configuration: built once at startup (defaults or a JSON file)
//! and shared behind an `Arc` for the life of the process.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ThresholdConfigError;
use crate::models::{DeviceClass, Metric};

/// Inclusive valid range for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingRange {
    pub min: f64,
    pub max: f64,
}

impl OperatingRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Metric envelopes for one device class, iterated in metric order
pub type Envelope = BTreeMap<Metric, OperatingRange>;

/// Mapping from device class name to its envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable {
    classes: HashMap<String, Envelope>,
}

impl ThresholdTable {
    /// Table with no envelopes; every evaluation yields no alerts
    pub fn empty() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Envelopes for the four supported equipment classes
    pub fn industrial_defaults() -> Self {
        Self::empty()
            .with_envelope(DeviceClass::Motor, Metric::PowerKw, OperatingRange::new(0.5, 50.0))
            .with_envelope(DeviceClass::Motor, Metric::TemperatureC, OperatingRange::new(20.0, 80.0))
            .with_envelope(DeviceClass::Motor, Metric::Vibration, OperatingRange::new(0.0, 5.0))
            .with_envelope(DeviceClass::Compressor, Metric::PowerKw, OperatingRange::new(2.0, 100.0))
            .with_envelope(DeviceClass::Compressor, Metric::TemperatureC, OperatingRange::new(25.0, 90.0))
            .with_envelope(DeviceClass::Compressor, Metric::Vibration, OperatingRange::new(0.0, 8.0))
            .with_envelope(DeviceClass::Hvac, Metric::PowerKw, OperatingRange::new(1.0, 75.0))
            .with_envelope(DeviceClass::Hvac, Metric::TemperatureC, OperatingRange::new(18.0, 35.0))
            .with_envelope(DeviceClass::Hvac, Metric::Vibration, OperatingRange::new(0.0, 3.0))
            .with_envelope(DeviceClass::Conveyor, Metric::PowerKw, OperatingRange::new(0.2, 25.0))
            .with_envelope(DeviceClass::Conveyor, Metric::TemperatureC, OperatingRange::new(20.0, 60.0))
            .with_envelope(DeviceClass::Conveyor, Metric::Vibration, OperatingRange::new(0.0, 4.0))
    }

    /// Add or replace the range of one metric for one class
    pub fn with_envelope(
        mut self,
        class: impl ToString,
        metric: Metric,
        range: OperatingRange,
    ) -> Self {
        self.classes
            .entry(class.to_string())
            .or_default()
            .insert(metric, range);
        self
    }

    /// Envelope for a class, `None` when the class has no entry
    pub fn envelope(&self, class: &str) -> Option<&Envelope> {
        self.classes.get(class)
    }

    /// Parse a table from JSON of the form
    /// `{"motor": {"power_kw": {"min": 0.5, "max": 50}}}`
    pub fn from_json(json: &str) -> Result<Self, ThresholdConfigError> {
        let table: ThresholdTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ThresholdConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ThresholdConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ThresholdConfigError> {
        for (class, envelope) in &self.classes {
            for (metric, range) in envelope {
                let reason = if !range.min.is_finite() || !range.max.is_finite() {
                    Some("bounds must be finite numbers".to_string())
                } else if range.min > range.max {
                    Some(format!("min {} is greater than max {}", range.min, range.max))
                } else {
                    None
                };

                if let Some(reason) = reason {
                    return Err(ThresholdConfigError::InvalidEnvelope {
                        class: class.clone(),
                        metric: metric.to_string(),
                        reason,
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::industrial_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_cover_every_class() {
        let table = ThresholdTable::default();
        for class in DeviceClass::ALL {
            let envelope = table.envelope(class.as_str()).unwrap();
            assert_eq!(envelope.len(), 3);
            assert!(!envelope.contains_key(&Metric::RuntimeHours));
        }
        assert_eq!(
            table.envelope("motor").unwrap()[&Metric::PowerKw],
            OperatingRange::new(0.5, 50.0)
        );
        assert!(table.envelope("crane").is_none());
    }

    #[test]
    fn test_from_json() {
        let table = ThresholdTable::from_json(
            r#"{"crane": {"power_kw": {"min": 1.0, "max": 10.0}, "vibration": {"min": 0, "max": 2}}}"#,
        )
        .unwrap();

        let envelope = table.envelope("crane").unwrap();
        assert_eq!(envelope[&Metric::PowerKw], OperatingRange::new(1.0, 10.0));
        assert_eq!(envelope[&Metric::Vibration], OperatingRange::new(0.0, 2.0));
        assert!(table.envelope("motor").is_none());
    }

    #[test]
    fn test_from_json_rejects_inverted_range() {
        let err = ThresholdTable::from_json(r#"{"motor": {"power_kw": {"min": 50, "max": 1}}}"#)
            .unwrap_err();
        assert!(matches!(err, ThresholdConfigError::InvalidEnvelope { .. }));
        assert!(err.to_string().contains("motor/power_kw"));
    }

    #[test]
    fn test_from_json_rejects_unknown_metric() {
        let err = ThresholdTable::from_json(r#"{"motor": {"humidity": {"min": 0, "max": 1}}}"#)
            .unwrap_err();
        assert!(matches!(err, ThresholdConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"hvac": {{"temperature_c": {{"min": 16, "max": 30}}}}}}"#
        )
        .unwrap();

        let table = ThresholdTable::from_file(file.path()).unwrap();
        assert_eq!(
            table.envelope("hvac").unwrap()[&Metric::TemperatureC],
            OperatingRange::new(16.0, 30.0)
        );
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ThresholdTable::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ThresholdConfigError::Io { .. }));
    }
}
