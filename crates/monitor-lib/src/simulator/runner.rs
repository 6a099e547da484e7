//! Simulation loop and its start/stop state machine

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::generator::ReadingGenerator;
use crate::health::{Component, HealthRegistry};
use crate::ingest::IngestionCoordinator;
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::storage::DeviceRegistry;

/// Configuration for the simulation loop
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Pause between ticks (default: 5 seconds)
    pub interval: Duration,
    /// Pause after a tick with failures (default: 1 second)
    pub error_backoff: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            error_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

struct Running {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Drives the fleet with synthetic readings.
///
/// Stopped until `start`, back to Stopped after `stop`, restartable. At most
/// one loop exists at a time.
pub struct TelemetrySimulator {
    coordinator: Arc<IngestionCoordinator>,
    registry: Arc<dyn DeviceRegistry>,
    generator: Arc<Mutex<ReadingGenerator>>,
    config: SimulatorConfig,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
    ticks: Arc<AtomicU64>,
    state: AsyncMutex<Option<Running>>,
}

impl TelemetrySimulator {
    pub fn new(
        coordinator: Arc<IngestionCoordinator>,
        registry: Arc<dyn DeviceRegistry>,
        generator: ReadingGenerator,
        config: SimulatorConfig,
    ) -> Self {
        Self {
            coordinator,
            registry,
            generator: Arc::new(Mutex::new(generator)),
            config,
            health: HealthRegistry::new(),
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new("energy-monitor"),
            ticks: Arc::new(AtomicU64::new(0)),
            state: AsyncMutex::new(None),
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Spawn the loop unless one is already running
    pub async fn start(&self) -> StartOutcome {
        let mut state = self.state.lock().await;
        if let Some(running) = state.as_ref() {
            if !running.task.is_finished() {
                return StartOutcome::AlreadyRunning;
            }
        }

        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let sim_loop = SimulationLoop {
            coordinator: self.coordinator.clone(),
            registry: self.registry.clone(),
            generator: self.generator.clone(),
            config: self.config.clone(),
            health: self.health.clone(),
            metrics: self.metrics.clone(),
            ticks: self.ticks.clone(),
        };
        let task = tokio::spawn(sim_loop.run(shutdown_rx));
        *state = Some(Running { shutdown, task });

        let devices = self.registry.devices().await.map(|d| d.len()).unwrap_or(0);
        self.logger.log_simulation_state(true, devices);
        StartOutcome::Started
    }

    /// Signal the loop and wait for it to exit
    pub async fn stop(&self) -> StopOutcome {
        let mut state = self.state.lock().await;
        let Some(running) = state.take() else {
            return StopOutcome::NotRunning;
        };

        // The receiver is gone if the loop already exited
        let _ = running.shutdown.send(());
        if let Err(e) = running.task.await {
            if e.is_panic() {
                error!(error = %e, "Simulation task panicked");
                self.health
                    .set_unhealthy(Component::Simulator, "simulation task panicked")
                    .await;
            }
        }

        self.logger.log_simulation_state(false, 0);
        StopOutcome::Stopped
    }

    pub async fn is_running(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .map_or(false, |running| !running.task.is_finished())
    }

    /// Completed ticks since construction
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// Per-run state handed to the spawned task
struct SimulationLoop {
    coordinator: Arc<IngestionCoordinator>,
    registry: Arc<dyn DeviceRegistry>,
    generator: Arc<Mutex<ReadingGenerator>>,
    config: SimulatorConfig,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    ticks: Arc<AtomicU64>,
}

enum TickResult {
    Completed { devices: usize, failures: usize },
    Interrupted,
}

impl SimulationLoop {
    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting simulation loop"
        );

        loop {
            let pause = match self.tick(&mut shutdown).await {
                TickResult::Interrupted => break,
                TickResult::Completed { devices, failures } => {
                    self.ticks.fetch_add(1, Ordering::Relaxed);
                    self.metrics.inc_simulator_ticks();
                    if failures > 0 {
                        self.metrics.add_tick_device_failures(failures as u64);
                        self.health
                            .set_degraded(
                                Component::Simulator,
                                format!("{} of {} devices failed last tick", failures, devices),
                            )
                            .await;
                        self.config.error_backoff
                    } else {
                        self.health.set_healthy(Component::Simulator).await;
                        self.config.interval
                    }
                }
            };

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!("Simulation loop stopped");
    }

    /// Generate and ingest one reading per device, in registration order.
    /// The stop signal is honored between devices.
    async fn tick(&self, shutdown: &mut broadcast::Receiver<()>) -> TickResult {
        let start = Instant::now();

        let devices = match self.registry.devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "Failed to list devices for tick");
                return TickResult::Completed {
                    devices: 0,
                    failures: 1,
                };
            }
        };

        let mut failures = 0;
        for device in &devices {
            if stop_requested(shutdown) {
                debug!("Stop requested mid-tick");
                return TickResult::Interrupted;
            }

            let reading = {
                let mut generator = self.generator.lock().unwrap_or_else(|e| e.into_inner());
                generator.generate(device)
            };

            if let Err(e) = self.coordinator.ingest(reading).await {
                warn!(
                    device_id = %device.id,
                    device_name = %device.name,
                    error = %e,
                    "Simulated reading not ingested"
                );
                failures += 1;
            }
        }

        self.metrics
            .observe_tick_latency(start.elapsed().as_secs_f64());
        debug!(devices = devices.len(), failures, "Tick complete");

        TickResult::Completed {
            devices: devices.len(),
            failures,
        }
    }
}

fn stop_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    use broadcast::error::TryRecvError;
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
