//! Ingestion coordinator

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::broadcast::BroadcastHub;
use crate::errors::IngestError;
use crate::health::{Component, HealthRegistry};
use crate::models::{Device, DeviceClass, Event, ReadingInput, SensorReading};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::storage::{DeviceRegistry, TelemetryStore};
use crate::threshold::ThresholdEvaluator;

/// Result of ingesting one reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub reading_id: Uuid,
    /// Resolved class; `None` when the device is unknown or the registry
    /// could not be reached, in which case evaluation was skipped
    pub device_class: Option<DeviceClass>,
    pub alerts_raised: usize,
    pub alerts_persisted: usize,
    /// Subscribers the reading event was queued for
    pub subscribers_notified: usize,
}

impl IngestOutcome {
    pub fn evaluated(&self) -> bool {
        self.device_class.is_some()
    }
}

/// One rejected reading within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestFailure {
    /// Position of the reading in the submitted batch
    pub index: usize,
    pub device_id: String,
    pub reason: String,
}

/// Outcome of a batched ingest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub received: usize,
    pub accepted: usize,
    pub failures: Vec<IngestFailure>,
}

/// Drives a reading through persistence, evaluation and broadcast.
///
/// Holds no mutable state of its own, so the simulator and request handlers
/// share one instance behind an `Arc`.
pub struct IngestionCoordinator {
    store: Arc<dyn TelemetryStore>,
    registry: Arc<dyn DeviceRegistry>,
    evaluator: ThresholdEvaluator,
    hub: BroadcastHub,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        registry: Arc<dyn DeviceRegistry>,
        evaluator: ThresholdEvaluator,
        hub: BroadcastHub,
    ) -> Self {
        Self {
            store,
            registry,
            evaluator,
            hub,
            health: HealthRegistry::new(),
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new("energy-monitor"),
        }
    }

    /// Report store and batch health into a shared registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Ingest a single reading.
    ///
    /// Only a failure to persist the reading itself is returned as an error.
    /// An unknown device skips evaluation, and alert persistence failures are
    /// logged per alert without undoing anything already written.
    pub async fn ingest(&self, reading: SensorReading) -> Result<IngestOutcome, IngestError> {
        let start = Instant::now();

        if let Err(e) = self.store.append_reading(&reading).await {
            warn!(
                device_id = %reading.device_id,
                reading_id = %reading.id,
                error = %e,
                "Failed to persist reading"
            );
            self.metrics.inc_ingest_failures("persistence_failed");
            self.health.set_degraded(Component::Store, e.to_string()).await;
            return Err(IngestError::Persistence(e));
        }
        self.metrics.inc_readings_ingested();
        self.health.set_healthy(Component::Store).await;

        let device = self.resolve_device(&reading.device_id).await;
        let device_class = device.as_ref().map(|d| d.class);
        let device_name = device.map(|d| d.name);

        let alerts = match device_class {
            Some(class) => self.evaluator.evaluate(&reading, class.as_str()),
            None => Vec::new(),
        };

        let mut persisted = Vec::with_capacity(alerts.len());
        for alert in &alerts {
            self.metrics.inc_alerts_raised(alert.severity);
            self.logger.log_alert(alert, device_name.as_deref());
            match self.store.append_alert(alert).await {
                Ok(()) => persisted.push(alert.clone()),
                Err(e) => {
                    warn!(
                        device_id = %alert.device_id,
                        alert_id = %alert.id,
                        metric = %alert.metric,
                        error = %e,
                        "Failed to persist alert"
                    );
                    self.metrics.inc_alert_persist_failures();
                }
            }
        }

        let reading_id = reading.id;
        let subscribers_notified = self.hub.publish(Event::SensorReading {
            data: reading,
            device_name,
        });
        if !alerts.is_empty() {
            self.hub.publish(Event::Alert {
                data: alerts.clone(),
            });
        }

        self.metrics
            .observe_ingest_latency(start.elapsed().as_secs_f64());

        Ok(IngestOutcome {
            reading_id,
            device_class,
            alerts_raised: alerts.len(),
            alerts_persisted: persisted.len(),
            subscribers_notified,
        })
    }

    /// Ingest externally submitted readings one by one.
    ///
    /// Each item is validated and ingested independently; failures are
    /// enumerated in the report and never stop the rest of the batch.
    pub async fn ingest_batch(&self, inputs: Vec<ReadingInput>) -> BatchReport {
        let mut report = BatchReport {
            received: inputs.len(),
            ..Default::default()
        };

        for (index, input) in inputs.into_iter().enumerate() {
            let device_id = input.device_id.clone();
            let result = match input.validate() {
                Ok(reading) => self.ingest(reading).await.map(|_| ()),
                Err(e) => {
                    self.metrics.inc_ingest_failures(e.code());
                    Err(e)
                }
            };

            match result {
                Ok(()) => report.accepted += 1,
                Err(e) => {
                    debug!(index, device_id = %device_id, error = %e, "Batch item rejected");
                    report.failures.push(IngestFailure {
                        index,
                        device_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.failures.is_empty() {
            self.health.set_healthy(Component::Ingest).await;
        } else {
            self.health
                .set_degraded(
                    Component::Ingest,
                    format!(
                        "{} of {} readings rejected in last batch",
                        report.failures.len(),
                        report.received
                    ),
                )
                .await;
        }

        self.logger.log_batch(report.received, report.accepted);
        report
    }

    async fn resolve_device(&self, device_id: &str) -> Option<Device> {
        match self.registry.device(device_id).await {
            Ok(Some(device)) => Some(device),
            Ok(None) => {
                debug!(device_id = %device_id, "Unknown device, skipping evaluation");
                None
            }
            Err(e) => {
                warn!(
                    device_id = %device_id,
                    error = %e,
                    "Device lookup failed, skipping evaluation"
                );
                None
            }
        }
    }
}
