//! Device registry service
//!
//! Owner ids come from the caller; authenticating them is left to whatever
//! sits in front of the HTTP surface.

use std::sync::Arc;
use tracing::info;

use crate::{
    models::{CreateDeviceRequest, Device, DeviceId, UpdateDeviceRequest},
    repository::DeviceRepository,
    validation, Error, Result,
};

#[derive(Clone)]
pub struct DeviceService {
    repo: Arc<dyn DeviceRepository>,
}

impl std::fmt::Debug for DeviceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceService").finish()
    }
}

impl DeviceService {
    #[must_use]
    pub fn new(repo: Arc<dyn DeviceRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_device(&self, request: CreateDeviceRequest) -> Result<Device> {
        validation::validate_device(&request)?;
        let device = self.repo.create(&request).await?;

        info!(
            device_id = %device.id,
            owner_id = %device.owner_id,
            "Device registered"
        );
        Ok(device)
    }

    pub async fn get_device(&self, device_id: &DeviceId) -> Result<Device> {
        validation::validate_device_id(device_id)?;
        self.repo
            .find_by_id(device_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("device {device_id} not found")))
    }

    /// All devices of `owner_id`; an owner without devices is `NotFound`
    pub async fn list_devices(&self, owner_id: &str) -> Result<Vec<Device>> {
        validation::validate_owner_id(owner_id)?;
        let devices = self.repo.find_by_owner(owner_id).await?;
        if devices.is_empty() {
            return Err(Error::NotFound(format!("no devices for owner {owner_id}")));
        }
        Ok(devices)
    }

    /// Rename a device. A device owned by someone else reads as missing.
    pub async fn update_device(
        &self,
        device_id: &DeviceId,
        request: UpdateDeviceRequest,
    ) -> Result<Device> {
        validation::validate_device_id(device_id)?;
        validation::validate_owner_id(&request.owner_id)?;
        validation::validate_device_name(&request.device_name)?;

        let device = self
            .repo
            .update_name(&request.owner_id, device_id, &request.device_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("device {device_id} not found")))?;

        info!(device_id = %device.id, "Device renamed");
        Ok(device)
    }

    pub async fn delete_devices(&self, owner_id: &str) -> Result<usize> {
        validation::validate_owner_id(owner_id)?;
        let removed = self.repo.delete_by_owner(owner_id).await?;

        info!(owner_id = %owner_id, removed, "Devices deleted");
        Ok(removed)
    }

    /// Fail with `NotFound` unless `device_id` is registered
    pub async fn ensure_registered(&self, device_id: &DeviceId) -> Result<()> {
        if self.repo.find_by_id(device_id).await?.is_none() {
            return Err(Error::NotFound(format!("device {device_id} not found")));
        }
        Ok(())
    }
}
