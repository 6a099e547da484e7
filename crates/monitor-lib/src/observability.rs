//! Observability infrastructure for the monitoring pipeline
//!
//! Provides:
//! - Prometheus metrics (ingest and tick latency, alerts by severity,
//!   subscriber fan-out)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{Alert, Severity};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MonitorMetricsInner {
    ingest_latency_seconds: Histogram,
    tick_latency_seconds: Histogram,
    readings_ingested: IntCounter,
    ingest_failures: IntCounterVec,
    alerts_raised: IntCounterVec,
    alert_persist_failures: IntCounter,
    simulator_ticks: IntCounter,
    tick_device_failures: IntCounter,
    subscribers: IntGauge,
    events_published: IntCounterVec,
    events_dropped: IntCounter,
    subscribers_pruned: IntCounter,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            ingest_latency_seconds: register_histogram!(
                "energy_monitor_ingest_latency_seconds",
                "Time spent ingesting one reading end to end",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register ingest_latency_seconds"),

            tick_latency_seconds: register_histogram!(
                "energy_monitor_tick_latency_seconds",
                "Time spent on one simulator tick across the fleet",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            readings_ingested: register_int_counter!(
                "energy_monitor_readings_ingested_total",
                "Total number of readings persisted"
            )
            .expect("Failed to register readings_ingested"),

            ingest_failures: register_int_counter_vec!(
                "energy_monitor_ingest_failures_total",
                "Total number of readings rejected or not persisted",
                &["reason"]
            )
            .expect("Failed to register ingest_failures"),

            alerts_raised: register_int_counter_vec!(
                "energy_monitor_alerts_raised_total",
                "Total number of threshold alerts raised",
                &["severity"]
            )
            .expect("Failed to register alerts_raised"),

            alert_persist_failures: register_int_counter!(
                "energy_monitor_alert_persist_failures_total",
                "Total number of alerts that could not be persisted"
            )
            .expect("Failed to register alert_persist_failures"),

            simulator_ticks: register_int_counter!(
                "energy_monitor_simulator_ticks_total",
                "Total number of completed simulator ticks"
            )
            .expect("Failed to register simulator_ticks"),

            tick_device_failures: register_int_counter!(
                "energy_monitor_tick_device_failures_total",
                "Total number of per-device failures during simulator ticks"
            )
            .expect("Failed to register tick_device_failures"),

            subscribers: register_int_gauge!(
                "energy_monitor_subscribers",
                "Number of live event subscribers"
            )
            .expect("Failed to register subscribers"),

            events_published: register_int_counter_vec!(
                "energy_monitor_events_published_total",
                "Total number of events published to the hub",
                &["kind"]
            )
            .expect("Failed to register events_published"),

            events_dropped: register_int_counter!(
                "energy_monitor_events_dropped_total",
                "Total number of events dropped for lagging subscribers"
            )
            .expect("Failed to register events_dropped"),

            subscribers_pruned: register_int_counter!(
                "energy_monitor_subscribers_pruned_total",
                "Total number of subscribers removed after a failed delivery"
            )
            .expect("Failed to register subscribers_pruned"),
        }
    }
}

/// Pipeline metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_ingest_latency(&self, duration_secs: f64) {
        self.inner().ingest_latency_seconds.observe(duration_secs);
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn inc_readings_ingested(&self) {
        self.inner().readings_ingested.inc();
    }

    /// Count a rejected or unpersisted reading by reason code
    pub fn inc_ingest_failures(&self, reason: &str) {
        self.inner().ingest_failures.with_label_values(&[reason]).inc();
    }

    pub fn inc_alerts_raised(&self, severity: Severity) {
        self.inner()
            .alerts_raised
            .with_label_values(&[severity.as_str()])
            .inc();
    }

    pub fn inc_alert_persist_failures(&self) {
        self.inner().alert_persist_failures.inc();
    }

    pub fn inc_simulator_ticks(&self) {
        self.inner().simulator_ticks.inc();
    }

    pub fn add_tick_device_failures(&self, count: u64) {
        self.inner().tick_device_failures.inc_by(count);
    }

    pub fn set_subscribers(&self, count: i64) {
        self.inner().subscribers.set(count);
    }

    pub fn inc_events_published(&self, kind: &str) {
        self.inner().events_published.with_label_values(&[kind]).inc();
    }

    pub fn add_events_dropped(&self, count: u64) {
        self.inner().events_dropped.inc_by(count);
    }

    pub fn inc_subscribers_pruned(&self) {
        self.inner().subscribers_pruned.inc();
    }
}

/// Structured logger for pipeline events
///
/// Provides consistent JSON-formatted logging for alerts, simulation state
/// changes and other significant events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a raised alert; critical alerts are logged at warn level
    pub fn log_alert(&self, alert: &Alert, device_name: Option<&str>) {
        match alert.severity {
            Severity::Critical => {
                warn!(
                    event = "alert_raised",
                    instance = %self.instance,
                    device_id = %alert.device_id,
                    device_name = device_name.unwrap_or(""),
                    metric = %alert.metric,
                    value = alert.value,
                    threshold = alert.threshold,
                    severity = %alert.severity,
                    "Critical threshold alert"
                );
            }
            _ => {
                info!(
                    event = "alert_raised",
                    instance = %self.instance,
                    device_id = %alert.device_id,
                    device_name = device_name.unwrap_or(""),
                    metric = %alert.metric,
                    value = alert.value,
                    threshold = alert.threshold,
                    severity = %alert.severity,
                    "Threshold alert"
                );
            }
        }
    }

    /// Log a simulator state change
    pub fn log_simulation_state(&self, running: bool, devices: usize) {
        if running {
            info!(
                event = "simulation_started",
                instance = %self.instance,
                devices = devices,
                "Telemetry simulation started"
            );
        } else {
            info!(
                event = "simulation_stopped",
                instance = %self.instance,
                "Telemetry simulation stopped"
            );
        }
    }

    /// Log the result of an external batch ingest
    pub fn log_batch(&self, received: usize, accepted: usize) {
        let failed = received.saturating_sub(accepted);
        if failed > 0 {
            warn!(
                event = "batch_ingested",
                instance = %self.instance,
                received = received,
                accepted = accepted,
                failed = failed,
                "Batch ingested with failures"
            );
        } else {
            info!(
                event = "batch_ingested",
                instance = %self.instance,
                received = received,
                accepted = accepted,
                "Batch ingested"
            );
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, devices: usize) {
        info!(
            event = "monitor_started",
            instance = %self.instance,
            version = %version,
            devices = devices,
            "Energy monitor started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Energy monitor shutting down"
        );
    }
}
