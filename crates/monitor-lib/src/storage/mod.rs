//! Persistence and device-registry collaborators
//!
//! The pipeline only depends on the two traits defined here. The in-memory
//! implementations back the service binary and the tests; a database-backed
//! implementation plugs in behind the same traits.

mod memory;
mod registry;

pub use memory::{AlertFilter, DashboardSummary, MemoryStore, ReadingFilter};
pub use registry::{default_fleet, MemoryDeviceRegistry};

use crate::errors::StoreError;
use crate::models::{Alert, Device, DeviceClass, SensorReading};
use async_trait::async_trait;
use uuid::Uuid;

/// Append-only writer for readings and alerts
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Persist a raw reading
    async fn append_reading(&self, reading: &SensorReading) -> Result<(), StoreError>;

    /// Persist an alert
    async fn append_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Set the acknowledged flag. Returns false when no alert has this id.
    async fn acknowledge_alert(&self, alert_id: Uuid) -> Result<bool, StoreError>;
}

/// Read access to the device fleet
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Look up a device by id
    async fn device(&self, device_id: &str) -> Result<Option<Device>, StoreError>;

    /// All devices, in registration order
    async fn devices(&self) -> Result<Vec<Device>, StoreError>;

    /// Equipment class of a device, `None` when the device is unknown
    async fn class_of(&self, device_id: &str) -> Result<Option<DeviceClass>, StoreError> {
        Ok(self.device(device_id).await?.map(|d| d.class))
    }
}
