//! In-memory device registry

use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::DeviceRegistry;
use crate::errors::StoreError;
use crate::models::{Device, DeviceClass};

/// The fleet registered when the service starts with seeding enabled
pub fn default_fleet() -> Vec<Device> {
    vec![
        Device::new("Motor-A1", DeviceClass::Motor, "Production Line 1"),
        Device::new("Motor-B2", DeviceClass::Motor, "Production Line 2"),
        Device::new("Compressor-C1", DeviceClass::Compressor, "Air Supply Room"),
        Device::new("HVAC-H1", DeviceClass::Hvac, "Main Building"),
        Device::new("HVAC-H2", DeviceClass::Hvac, "Warehouse"),
        Device::new("Conveyor-CV1", DeviceClass::Conveyor, "Packaging Area"),
        Device::new("Conveyor-CV2", DeviceClass::Conveyor, "Shipping Area"),
    ]
}

/// Registry of devices keyed by id, remembering registration order
#[derive(Default)]
pub struct MemoryDeviceRegistry {
    devices: DashMap<String, Device>,
    order: RwLock<Vec<String>>,
}

impl MemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device. Returns false if the id is already taken.
    pub fn register(&self, device: Device) -> bool {
        let mut order = self.order.write().unwrap_or_else(|e| e.into_inner());
        if self.devices.contains_key(&device.id) {
            return false;
        }
        debug!(device_id = %device.id, name = %device.name, "Registering device");
        order.push(device.id.clone());
        self.devices.insert(device.id.clone(), device);
        true
    }

    /// Register each device whose name is not yet present.
    /// Returns how many were added.
    pub fn register_missing_by_name(&self, devices: Vec<Device>) -> usize {
        let mut added = 0;
        for device in devices {
            let exists = self.devices.iter().any(|d| d.name == device.name);
            if !exists && self.register(device) {
                added += 1;
            }
        }
        added
    }

    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.devices.get(device_id).map(|r| r.clone())
    }

    /// Devices in registration order
    pub fn list(&self) -> Vec<Device> {
        let order = self.order.read().unwrap_or_else(|e| e.into_inner());
        order
            .iter()
            .filter_map(|id| self.devices.get(id).map(|r| r.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn device(&self, device_id: &str) -> Result<Option<Device>, StoreError> {
        Ok(self.get(device_id))
    }

    async fn devices(&self) -> Result<Vec<Device>, StoreError> {
        Ok(self.list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_preserves_registration_order() {
        let registry = MemoryDeviceRegistry::new();
        let names = ["Z", "A", "M"];
        for name in names {
            registry.register(Device::new(name, DeviceClass::Motor, "Line"));
        }

        let listed: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(listed, vec!["Z", "A", "M"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = MemoryDeviceRegistry::new();
        let device = Device::new("Motor-A1", DeviceClass::Motor, "Line 1");
        assert!(registry.register(device.clone()));
        assert!(!registry.register(device));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_fleet_seeding_is_idempotent() {
        let registry = MemoryDeviceRegistry::new();
        assert_eq!(registry.register_missing_by_name(default_fleet()), 7);
        assert_eq!(registry.register_missing_by_name(default_fleet()), 0);
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.list()[0].name, "Motor-A1");
        assert_eq!(registry.list()[6].name, "Conveyor-CV2");
    }

    #[tokio::test]
    async fn test_class_of() {
        let registry = MemoryDeviceRegistry::new();
        let device = Device::new("Conveyor-CV1", DeviceClass::Conveyor, "Packaging Area");
        let id = device.id.clone();
        registry.register(device);

        assert_eq!(
            registry.class_of(&id).await.unwrap(),
            Some(DeviceClass::Conveyor)
        );
        assert_eq!(registry.class_of("missing").await.unwrap(), None);
    }
}
