//! In-memory telemetry store
//!
//! Bounded FIFO retention for readings and alerts, plus the read-only
//! queries used by the service endpoints.

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TelemetryStore;
use crate::errors::StoreError;
use crate::models::{Alert, SensorReading};

/// Default maximum number of retained readings
const DEFAULT_MAX_READINGS: usize = 100_000;

/// Default maximum number of retained alerts
const DEFAULT_MAX_ALERTS: usize = 10_000;

/// Readings considered when averaging power for the dashboard
const SUMMARY_WINDOW: usize = 10;

/// Query over stored readings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingFilter {
    pub device_id: Option<String>,
    pub from_time: Option<DateTime<Utc>>,
    pub to_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Query over stored alerts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub device_id: Option<String>,
    pub acknowledged: Option<bool>,
    pub limit: Option<usize>,
}

/// Fleet-level overview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub device_count: usize,
    pub active_alerts: usize,
    pub avg_power_kw: f64,
    pub system_status: String,
}

pub struct MemoryStore {
    readings: RwLock<VecDeque<SensorReading>>,
    alerts: RwLock<VecDeque<Alert>>,
    max_readings: usize,
    max_alerts: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_READINGS, DEFAULT_MAX_ALERTS)
    }

    pub fn with_capacity(max_readings: usize, max_alerts: usize) -> Self {
        Self {
            readings: RwLock::new(VecDeque::with_capacity(max_readings.min(10_000))),
            alerts: RwLock::new(VecDeque::with_capacity(max_alerts.min(10_000))),
            max_readings: max_readings.max(1),
            max_alerts: max_alerts.max(1),
        }
    }

    pub fn reading_count(&self) -> usize {
        self.readings.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Readings matching the filter, newest first (default limit 1000)
    pub fn readings(&self, filter: &ReadingFilter) -> Vec<SensorReading> {
        let readings = self.readings.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<SensorReading> = readings
            .iter()
            .filter(|r| filter.device_id.as_deref().map_or(true, |id| r.device_id == id))
            .filter(|r| filter.from_time.map_or(true, |from| r.timestamp >= from))
            .filter(|r| filter.to_time.map_or(true, |to| r.timestamp <= to))
            .cloned()
            .collect();
        drop(readings);

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(filter.limit.unwrap_or(1000));
        matched
    }

    /// Alerts matching the filter, newest first (default limit 100)
    pub fn alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        let alerts = self.alerts.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<Alert> = alerts
            .iter()
            .filter(|a| filter.device_id.as_deref().map_or(true, |id| a.device_id == id))
            .filter(|a| filter.acknowledged.map_or(true, |ack| a.acknowledged == ack))
            .cloned()
            .collect();
        drop(alerts);

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(filter.limit.unwrap_or(100));
        matched
    }

    /// Summary over the store for a fleet of `device_count` devices
    pub fn summary(&self, device_count: usize) -> DashboardSummary {
        let active_alerts = self
            .alerts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|a| !a.acknowledged)
            .count();

        let latest = self.readings(&ReadingFilter {
            limit: Some(SUMMARY_WINDOW),
            ..Default::default()
        });
        let avg_power_kw = if latest.is_empty() {
            0.0
        } else {
            let mean = latest.iter().map(|r| r.power_kw).sum::<f64>() / latest.len() as f64;
            (mean * 100.0).round() / 100.0
        };

        DashboardSummary {
            device_count,
            active_alerts,
            avg_power_kw,
            system_status: "operational".to_string(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn append_reading(&self, reading: &SensorReading) -> Result<(), StoreError> {
        let mut readings = self.readings.write().unwrap_or_else(|e| e.into_inner());
        while readings.len() >= self.max_readings {
            readings.pop_front();
        }
        readings.push_back(reading.clone());
        Ok(())
    }

    async fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut alerts = self.alerts.write().unwrap_or_else(|e| e.into_inner());
        while alerts.len() >= self.max_alerts {
            alerts.pop_front();
        }
        alerts.push_back(alert.clone());
        Ok(())
    }

    async fn acknowledge_alert(&self, alert_id: Uuid) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.write().unwrap_or_else(|e| e.into_inner());
        match alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::ThresholdEvaluator;
    use chrono::Duration;

    fn reading_at(device: &str, power: f64, minutes_ago: i64) -> SensorReading {
        let mut reading = SensorReading::new(device, power, 50.0, 1.0, 8.0);
        reading.timestamp = Utc::now() - Duration::minutes(minutes_ago);
        reading
    }

    #[tokio::test]
    async fn test_readings_newest_first_with_filters() {
        let store = MemoryStore::new();
        store.append_reading(&reading_at("a", 1.0, 30)).await.unwrap();
        store.append_reading(&reading_at("b", 2.0, 20)).await.unwrap();
        store.append_reading(&reading_at("a", 3.0, 10)).await.unwrap();

        let all = store.readings(&ReadingFilter::default());
        let powers: Vec<f64> = all.iter().map(|r| r.power_kw).collect();
        assert_eq!(powers, vec![3.0, 2.0, 1.0]);

        let only_a = store.readings(&ReadingFilter {
            device_id: Some("a".to_string()),
            ..Default::default()
        });
        assert_eq!(only_a.len(), 2);

        let recent = store.readings(&ReadingFilter {
            from_time: Some(Utc::now() - Duration::minutes(25)),
            ..Default::default()
        });
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_fifo_eviction() {
        let store = MemoryStore::with_capacity(2, 2);
        for i in 0..5 {
            store
                .append_reading(&reading_at("a", i as f64, 10 - i))
                .await
                .unwrap();
        }
        assert_eq!(store.reading_count(), 2);
        let powers: Vec<f64> = store
            .readings(&ReadingFilter::default())
            .iter()
            .map(|r| r.power_kw)
            .collect();
        assert_eq!(powers, vec![4.0, 3.0]);
    }

    #[tokio::test]
    async fn test_acknowledge_alert() {
        let store = MemoryStore::new();
        let reading = SensorReading::new("m", 80.0, 65.0, 2.5, 8.0);
        let alert = ThresholdEvaluator::default().evaluate(&reading, "motor").remove(0);
        store.append_alert(&alert).await.unwrap();

        assert!(store.acknowledge_alert(alert.id).await.unwrap());
        assert!(!store.acknowledge_alert(Uuid::new_v4()).await.unwrap());

        let open = store.alerts(&AlertFilter {
            acknowledged: Some(false),
            ..Default::default()
        });
        assert!(open.is_empty());
        assert_eq!(store.alerts(&AlertFilter::default()).len(), 1);
    }

    #[tokio::test]
    async fn test_summary() {
        let store = MemoryStore::new();
        assert_eq!(store.summary(0).avg_power_kw, 0.0);

        for (i, power) in [10.0, 20.0, 30.5].iter().enumerate() {
            store
                .append_reading(&reading_at("a", *power, i as i64))
                .await
                .unwrap();
        }
        let reading = SensorReading::new("m", 80.0, 65.0, 2.5, 8.0);
        for alert in ThresholdEvaluator::default().evaluate(&reading, "motor") {
            store.append_alert(&alert).await.unwrap();
        }

        let summary = store.summary(7);
        assert_eq!(summary.device_count, 7);
        assert_eq!(summary.active_alerts, 1);
        assert_eq!(summary.avg_power_kw, 20.17);
        assert_eq!(summary.system_status, "operational");
    }
}
