//! Core library for industrial energy monitoring
//!
//! This crate provides the core functionality for:
//! - Threshold evaluation of sensor readings against per-class envelopes
//! - Ingestion of simulated and externally submitted readings
//! - Synthetic telemetry generation for the device fleet
//! - Real-time fan-out of readings and alerts to subscribers
//! - Health checks and observability

pub mod broadcast;
pub mod errors;
pub mod health;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod simulator;
pub mod storage;
pub mod threshold;

pub use errors::{DeliveryError, IngestError, StoreError, ThresholdConfigError};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
