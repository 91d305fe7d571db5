use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Device, DeviceCreateRequest, IpAddress, Project};

/// Provider operations consumed by the reconciliation engine.
#[async_trait]
pub trait MetalApi: Send + Sync {
    /// List the projects visible to the token.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// List all devices of a project.
    async fn list_devices(&self, project_id: &str) -> Result<Vec<Device>>;

    /// Provision a new device.
    async fn create_device(&self, request: &DeviceCreateRequest) -> Result<Device>;

    /// List all IP reservations of a project.
    async fn list_ips(&self, project_id: &str) -> Result<Vec<IpAddress>>;
}
