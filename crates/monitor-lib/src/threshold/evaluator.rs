//! Threshold evaluation
//!
//! Turns a reading into zero or more alerts by comparing each enveloped
//! metric with its operating range and grading the relative deviation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OperatingRange, ThresholdTable};
use crate::models::{Alert, AlertKind, Metric, SensorReading, Severity};

/// Deviation cutoffs used to grade severity.
///
/// A deviation strictly greater than a cutoff selects that tier; cutoffs are
/// checked from `critical` down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            critical: 0.5,
            high: 0.3,
            medium: 0.1,
        }
    }
}

impl SeverityPolicy {
    /// Map a relative deviation to a severity tier
    pub fn classify(&self, deviation: f64) -> Severity {
        if deviation > self.critical {
            Severity::Critical
        } else if deviation > self.high {
            Severity::High
        } else if deviation > self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A breached boundary and how far past it the value lies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breach {
    pub threshold: f64,
    pub deviation: f64,
}

/// Compare a value with its range. `None` when the value is within bounds.
///
/// Deviation is relative to the signed boundary, so a breach past a negative
/// boundary yields a negative deviation and grades as the lowest tier. A zero
/// boundary makes the relative deviation undefined; it is treated as infinite,
/// which always grades as the top tier.
pub fn breach(value: f64, range: &OperatingRange) -> Option<Breach> {
    if value < range.min {
        Some(Breach {
            threshold: range.min,
            deviation: relative(range.min - value, range.min),
        })
    } else if value > range.max {
        Some(Breach {
            threshold: range.max,
            deviation: relative(value - range.max, range.max),
        })
    } else {
        None
    }
}

fn relative(distance: f64, boundary: f64) -> f64 {
    if boundary == 0.0 {
        f64::INFINITY
    } else {
        distance / boundary
    }
}

/// Pure threshold evaluator over a shared table
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    table: Arc<ThresholdTable>,
    policy: SeverityPolicy,
}

impl ThresholdEvaluator {
    pub fn new(table: Arc<ThresholdTable>, policy: SeverityPolicy) -> Self {
        Self { table, policy }
    }

    /// Evaluate a reading against the envelope of `device_class`.
    ///
    /// Classes without an envelope and metrics absent from an envelope are
    /// skipped. The output depends only on the reading, the table and the
    /// policy: alert ids are derived from the reading id and metric, and the
    /// alert timestamp is the reading timestamp.
    pub fn evaluate(&self, reading: &SensorReading, device_class: &str) -> Vec<Alert> {
        let Some(envelope) = self.table.envelope(device_class) else {
            return Vec::new();
        };

        envelope
            .iter()
            .filter_map(|(metric, range)| {
                let value = reading.value(*metric);
                breach(value, range).map(|b| self.build_alert(reading, *metric, value, b))
            })
            .collect()
    }

    fn build_alert(&self, reading: &SensorReading, metric: Metric, value: f64, b: Breach) -> Alert {
        Alert {
            id: Uuid::new_v5(&reading.id, metric.as_str().as_bytes()),
            device_id: reading.device_id.clone(),
            kind: AlertKind::ThresholdExceeded,
            metric,
            value,
            threshold: b.threshold,
            severity: self.policy.classify(b.deviation),
            message: format!(
                "{} {:.2} exceeded threshold {:.2}",
                metric, value, b.threshold
            ),
            acknowledged: false,
            timestamp: reading.timestamp,
        }
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::new(Arc::new(ThresholdTable::default()), SeverityPolicy::default())
    }
}
