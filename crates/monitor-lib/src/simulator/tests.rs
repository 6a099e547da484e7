//! Cadence tests for the simulation loop
//!
//! Run on a paused clock so that tick counts over a fixed span are exact.

use super::*;
use crate::broadcast::BroadcastHub;
use crate::errors::StoreError;
use crate::health::{Component, ComponentStatus, HealthRegistry};
use crate::ingest::IngestionCoordinator;
use crate::models::{Alert, Device, DeviceClass, SensorReading};
use crate::storage::{MemoryDeviceRegistry, MemoryStore, TelemetryStore};
use crate::threshold::ThresholdEvaluator;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Store whose first `fail_first` reading writes fail
#[derive(Default)]
struct FailingFirst {
    inner: MemoryStore,
    calls: AtomicUsize,
    fail_first: usize,
}

#[async_trait]
impl TelemetryStore for FailingFirst {
    async fn append_reading(&self, reading: &SensorReading) -> Result<(), StoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_first {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.append_reading(reading).await
    }

    async fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.inner.append_alert(alert).await
    }

    async fn acknowledge_alert(&self, alert_id: Uuid) -> Result<bool, StoreError> {
        self.inner.acknowledge_alert(alert_id).await
    }
}

fn two_device_registry() -> Arc<MemoryDeviceRegistry> {
    let registry = MemoryDeviceRegistry::new();
    registry.register(Device::new("Motor-A1", DeviceClass::Motor, "Production Line 1"));
    registry.register(Device::new("HVAC-H1", DeviceClass::Hvac, "Main Building"));
    Arc::new(registry)
}

fn simulator(store: Arc<dyn TelemetryStore>, health: HealthRegistry) -> TelemetrySimulator {
    let registry = two_device_registry();
    let coordinator = Arc::new(IngestionCoordinator::new(
        store,
        registry.clone(),
        ThresholdEvaluator::default(),
        BroadcastHub::default(),
    ));
    let generator = ReadingGenerator::new(Box::new(SequenceSource::constant(0.5)), 0.05);
    TelemetrySimulator::new(coordinator, registry, generator, SimulatorConfig::default())
        .with_health(health)
}

#[tokio::test(start_paused = true)]
async fn test_double_start_runs_one_loop() {
    let store = Arc::new(MemoryStore::new());
    let sim = simulator(store.clone(), HealthRegistry::new());

    assert_eq!(sim.start().await, StartOutcome::Started);
    assert_eq!(sim.start().await, StartOutcome::AlreadyRunning);
    assert!(sim.is_running().await);

    // ticks at t = 0, 5 and 10
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert_eq!(sim.tick_count(), 3);
    assert_eq!(store.reading_count(), 6);

    assert_eq!(sim.stop().await, StopOutcome::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_stop_prevents_next_tick() {
    let store = Arc::new(MemoryStore::new());
    let sim = simulator(store.clone(), HealthRegistry::new());

    sim.start().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sim.stop().await, StopOutcome::Stopped);
    assert!(!sim.is_running().await);
    assert_eq!(sim.tick_count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sim.tick_count(), 1);
    assert_eq!(store.reading_count(), 2);

    assert_eq!(sim.stop().await, StopOutcome::NotRunning);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let store = Arc::new(MemoryStore::new());
    let sim = simulator(store.clone(), HealthRegistry::new());

    sim.start().await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    sim.stop().await;

    assert_eq!(sim.start().await, StartOutcome::Started);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(sim.tick_count(), 3);
    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_device_backs_off_and_keeps_fleet_running() {
    let store = Arc::new(FailingFirst {
        fail_first: 1,
        ..Default::default()
    });
    let health = HealthRegistry::new();
    health.register_all().await;
    let sim = simulator(store.clone(), health.clone());

    sim.start().await;
    // first tick loses one device, the second still gets its reading
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sim.tick_count(), 1);
    assert_eq!(store.inner.reading_count(), 1);
    let status = health.component(Component::Simulator).await.unwrap().status;
    assert_eq!(status, ComponentStatus::Degraded);

    // backoff of 1s instead of the 5s cadence, then back to normal
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(sim.tick_count(), 2);
    assert_eq!(store.inner.reading_count(), 3);
    let status = health.component(Component::Simulator).await.unwrap().status;
    assert_eq!(status, ComponentStatus::Healthy);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(sim.tick_count(), 2);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(sim.tick_count(), 3);

    sim.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_fleet_still_ticks() {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MemoryDeviceRegistry::new());
    let coordinator = Arc::new(IngestionCoordinator::new(
        store.clone(),
        registry.clone(),
        ThresholdEvaluator::default(),
        BroadcastHub::default(),
    ));
    let generator = ReadingGenerator::new(Box::new(StdRandom::seeded(3)), 0.05);
    let sim = TelemetrySimulator::new(coordinator, registry, generator, SimulatorConfig::default());

    sim.start().await;
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(sim.tick_count(), 2);
    assert_eq!(store.reading_count(), 0);
    sim.stop().await;
}
