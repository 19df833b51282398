use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

use crate::{
    models::{CreateDeviceRequest, Device, DeviceId},
    Error, Result,
};

/// Device registry storage, keyed by device id
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Register a new device; fails with `AlreadyExists` if the id is taken
    async fn create(&self, request: &CreateDeviceRequest) -> Result<Device>;

    async fn find_by_id(&self, device_id: &DeviceId) -> Result<Option<Device>>;

    /// Devices of one owner, oldest registration first
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Device>>;

    /// Rename a device. Returns `None` unless the device exists and belongs to `owner_id`
    async fn update_name(
        &self,
        owner_id: &str,
        device_id: &DeviceId,
        device_name: &str,
    ) -> Result<Option<Device>>;

    /// Remove every device of one owner, returning how many were removed
    async fn delete_by_owner(&self, owner_id: &str) -> Result<usize>;
}

#[derive(Clone, Default)]
pub struct InMemoryDeviceRepository {
    devices: Arc<DashMap<DeviceId, Device>>,
}

impl InMemoryDeviceRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn create(&self, request: &CreateDeviceRequest) -> Result<Device> {
        match self.devices.entry(request.device_id.clone()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists(format!(
                "device {} already registered",
                request.device_id
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let device = Device {
                    id: request.device_id.clone(),
                    device_name: request.device_name.trim().to_string(),
                    owner_id: request.owner_id.clone(),
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(device.clone());
                Ok(device)
            }
        }
    }

    async fn find_by_id(&self, device_id: &DeviceId) -> Result<Option<Device>> {
        Ok(self.devices.get(device_id).map(|d| d.value().clone()))
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Device>> {
        let mut devices: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .map(|d| d.value().clone())
            .collect();
        devices.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(devices)
    }

    async fn update_name(
        &self,
        owner_id: &str,
        device_id: &DeviceId,
        device_name: &str,
    ) -> Result<Option<Device>> {
        let Some(mut device) = self.devices.get_mut(device_id) else {
            return Ok(None);
        };
        if device.owner_id != owner_id {
            return Ok(None);
        }
        device.device_name = device_name.trim().to_string();
        device.updated_at = Utc::now();
        Ok(Some(device.clone()))
    }

    async fn delete_by_owner(&self, owner_id: &str) -> Result<usize> {
        let before = self.devices.len();
        self.devices.retain(|_, d| d.owner_id != owner_id);
        Ok(before.saturating_sub(self.devices.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(device: &str, owner: &str) -> CreateDeviceRequest {
        CreateDeviceRequest {
            device_id: DeviceId::from(device),
            device_name: format!("{device} name"),
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let repo = InMemoryDeviceRepository::new();

        repo.create(&request("dev-1", "alice")).await.unwrap();
        let result = repo.create(&request("dev-1", "bob")).await;

        assert!(matches!(result, Err(Error::AlreadyExists(_))));
        let stored = repo.find_by_id(&DeviceId::from("dev-1")).await.unwrap().unwrap();
        assert_eq!(stored.owner_id, "alice");
    }

    #[tokio::test]
    async fn test_owner_scoped_rename_and_delete() {
        let repo = InMemoryDeviceRepository::new();
        repo.create(&request("dev-1", "alice")).await.unwrap();
        repo.create(&request("dev-2", "alice")).await.unwrap();
        repo.create(&request("dev-3", "bob")).await.unwrap();

        let owned = repo.find_by_owner("alice").await.unwrap();
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[0].id.as_str(), "dev-1");

        let id = DeviceId::from("dev-3");
        assert!(repo.update_name("alice", &id, "stolen").await.unwrap().is_none());
        let renamed = repo.update_name("bob", &id, " Tank ").await.unwrap().unwrap();
        assert_eq!(renamed.device_name, "Tank");
        assert!(renamed.updated_at >= renamed.created_at);

        assert_eq!(repo.delete_by_owner("alice").await.unwrap(), 2);
        assert_eq!(repo.delete_by_owner("alice").await.unwrap(), 0);
        assert_eq!(repo.len(), 1);
    }
}
