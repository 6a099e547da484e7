//! Synthetic telemetry for the registered fleet
//!
//! This module provides:
//! - Injectable randomness (`RandomSource`) so tests can force either branch
//! - Per-class reading generation with occasional anomalies
//! - A restartable simulation loop that feeds the ingestion coordinator

mod generator;
mod random;
mod runner;

#[cfg(test)]
mod tests;

pub use generator::{Baseline, ReadingGenerator, DEFAULT_ANOMALY_PROBABILITY};
pub use random::{RandomSource, SequenceSource, StdRandom};
pub use runner::{SimulatorConfig, StartOutcome, StopOutcome, TelemetrySimulator};
