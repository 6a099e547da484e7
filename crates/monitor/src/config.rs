//! Monitor configuration

use anyhow::{Context, Result};
use monitor_lib::broadcast::HubConfig;
use monitor_lib::simulator::{SimulatorConfig, DEFAULT_ANOMALY_PROBABILITY};
use monitor_lib::threshold::{SeverityPolicy, ThresholdTable};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration.
///
/// Read from an optional `monitor.{toml,json,yaml}` file, then overridden by
/// `MONITOR_*` environment variables (e.g. `MONITOR_API_PORT=9000`).
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Instance name attached to structured log records
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Seconds between simulator ticks
    #[serde(default = "default_simulation_interval")]
    pub simulation_interval_secs: u64,

    /// Pause after a tick with device failures
    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,

    /// Probability that a simulated reading is anomalous
    #[serde(default = "default_anomaly_probability")]
    pub anomaly_probability: f64,

    /// Deviation cutoffs for alert severity
    #[serde(default = "default_severity_critical")]
    pub severity_critical: f64,
    #[serde(default = "default_severity_high")]
    pub severity_high: f64,
    #[serde(default = "default_severity_medium")]
    pub severity_medium: f64,

    /// Events buffered per subscriber before the oldest are dropped
    #[serde(default = "default_hub_capacity")]
    pub hub_capacity: usize,

    /// Outbound queue of each socket subscriber
    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue: usize,

    /// Upper bound on one delivery to a subscriber
    #[serde(default = "default_subscriber_send_timeout")]
    pub subscriber_send_timeout_ms: u64,

    /// JSON threshold table replacing the built-in envelopes
    #[serde(default)]
    pub thresholds_file: Option<PathBuf>,

    /// Register the default seven-device fleet at startup
    #[serde(default = "default_true")]
    pub seed_default_fleet: bool,

    /// Start the simulator at boot
    #[serde(default)]
    pub autostart_simulation: bool,

    /// Seed for reproducible simulated readings
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "energy-monitor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_simulation_interval() -> u64 {
    5
}

fn default_error_backoff() -> u64 {
    1000
}

fn default_anomaly_probability() -> f64 {
    DEFAULT_ANOMALY_PROBABILITY
}

fn default_severity_critical() -> f64 {
    0.5
}

fn default_severity_high() -> f64 {
    0.3
}

fn default_severity_medium() -> f64 {
    0.1
}

fn default_hub_capacity() -> usize {
    1024
}

fn default_subscriber_queue() -> usize {
    256
}

fn default_subscriber_send_timeout() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            simulation_interval_secs: default_simulation_interval(),
            error_backoff_ms: default_error_backoff(),
            anomaly_probability: default_anomaly_probability(),
            severity_critical: default_severity_critical(),
            severity_high: default_severity_high(),
            severity_medium: default_severity_medium(),
            hub_capacity: default_hub_capacity(),
            subscriber_queue: default_subscriber_queue(),
            subscriber_send_timeout_ms: default_subscriber_send_timeout(),
            thresholds_file: None,
            seed_default_fleet: true,
            autostart_simulation: false,
            rng_seed: None,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("monitor").required(false))
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()
            .context("Failed to read monitor configuration")?;

        let config: MonitorConfig = config
            .try_deserialize()
            .context("Invalid monitor configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.anomaly_probability) {
            anyhow::bail!(
                "anomaly_probability must be within [0, 1], got {}",
                self.anomaly_probability
            );
        }
        if !(self.severity_critical >= self.severity_high
            && self.severity_high >= self.severity_medium
            && self.severity_medium >= 0.0)
        {
            anyhow::bail!(
                "severity cutoffs must satisfy critical >= high >= medium >= 0, got {}/{}/{}",
                self.severity_critical,
                self.severity_high,
                self.severity_medium
            );
        }
        if self.simulation_interval_secs == 0 {
            anyhow::bail!("simulation_interval_secs must be positive");
        }
        Ok(())
    }

    pub fn severity_policy(&self) -> SeverityPolicy {
        SeverityPolicy {
            critical: self.severity_critical,
            high: self.severity_high,
            medium: self.severity_medium,
        }
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            interval: Duration::from_secs(self.simulation_interval_secs),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            capacity: self.hub_capacity,
            send_timeout: self.subscriber_send_timeout(),
        }
    }

    pub fn subscriber_send_timeout(&self) -> Duration {
        Duration::from_millis(self.subscriber_send_timeout_ms)
    }

    /// Threshold table from `thresholds_file`, or the built-in envelopes
    pub fn threshold_table(&self) -> Result<ThresholdTable> {
        match &self.thresholds_file {
            Some(path) => ThresholdTable::from_file(path)
                .with_context(|| format!("Failed to load thresholds from {}", path.display())),
            None => Ok(ThresholdTable::industrial_defaults()),
        }
    }
}
