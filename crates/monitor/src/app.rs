//! Wiring of the monitoring pipeline

use anyhow::Result;
use monitor_lib::{
    broadcast::BroadcastHub,
    health::HealthRegistry,
    ingest::IngestionCoordinator,
    observability::{MonitorMetrics, StructuredLogger},
    simulator::{RandomSource, ReadingGenerator, StdRandom, TelemetrySimulator},
    storage::{default_fleet, MemoryDeviceRegistry, MemoryStore},
    threshold::ThresholdEvaluator,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::MonitorConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: MonitorMetrics,
    pub logger: StructuredLogger,
    pub store: Arc<MemoryStore>,
    pub registry: Arc<MemoryDeviceRegistry>,
    pub hub: BroadcastHub,
    pub coordinator: Arc<IngestionCoordinator>,
    pub simulator: Arc<TelemetrySimulator>,
    /// Outbound queue length for each socket subscriber
    pub subscriber_queue: usize,
    pub subscriber_send_timeout: Duration,
}

impl AppState {
    /// Build the pipeline described by `config`
    pub fn build(config: &MonitorConfig, health_registry: HealthRegistry) -> Result<Self> {
        let table = Arc::new(config.threshold_table()?);
        let evaluator = ThresholdEvaluator::new(table, config.severity_policy());
        let logger = StructuredLogger::new(&config.instance_name);

        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(MemoryDeviceRegistry::new());
        if config.seed_default_fleet {
            let added = registry.register_missing_by_name(default_fleet());
            info!(added, "Seeded default device fleet");
        }

        let hub = BroadcastHub::with_health(config.hub_config(), health_registry.clone());
        let coordinator = Arc::new(
            IngestionCoordinator::new(store.clone(), registry.clone(), evaluator, hub.clone())
                .with_health(health_registry.clone())
                .with_logger(logger.clone()),
        );

        let rng: Box<dyn RandomSource> = match config.rng_seed {
            Some(seed) => Box::new(StdRandom::seeded(seed)),
            None => Box::new(StdRandom::from_entropy()),
        };
        let generator = ReadingGenerator::new(rng, config.anomaly_probability);
        let simulator = Arc::new(
            TelemetrySimulator::new(
                coordinator.clone(),
                registry.clone(),
                generator,
                config.simulator_config(),
            )
            .with_health(health_registry.clone())
            .with_logger(logger.clone()),
        );

        Ok(Self {
            health_registry,
            metrics: MonitorMetrics::new(),
            logger,
            store,
            registry,
            hub,
            coordinator,
            simulator,
            subscriber_queue: config.subscriber_queue,
            subscriber_send_timeout: config.subscriber_send_timeout(),
        })
    }
}
