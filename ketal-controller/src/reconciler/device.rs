//! Device reconciler - provisions declared devices in Equinix Metal.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ketal_metal::{DeviceCreateRequest, MetalApi};
use ketal_store::{Device, RecordStore, Resource};
use tracing::{info, warn};

use super::{Outcome, Reconciler};
use crate::cache::IdentityCache;

/// Creates a provider device for every declared Device record the provider
/// does not list yet. Deleting a record never deletes the provider device.
pub struct DeviceReconciler {
    store: Arc<dyn RecordStore<Device>>,
    metal: Arc<dyn MetalApi>,
    cache: Arc<IdentityCache>,
    project_id: String,
    billing_cycle: String,
}

impl DeviceReconciler {
    pub fn new(
        store: Arc<dyn RecordStore<Device>>,
        metal: Arc<dyn MetalApi>,
        cache: Arc<IdentityCache>,
        project_id: impl Into<String>,
        billing_cycle: impl Into<String>,
    ) -> Self {
        Self {
            store,
            metal,
            cache,
            project_id: project_id.into(),
            billing_cycle: billing_cycle.into(),
        }
    }

    fn create_request(&self, device: &Device) -> DeviceCreateRequest {
        let spec = &device.spec;
        let hostname = if spec.hostname.is_empty() {
            device.name().to_string()
        } else {
            spec.hostname.clone()
        };

        DeviceCreateRequest {
            hostname,
            plan: spec.device_type.clone(),
            facility: vec![spec.facility.clone()],
            operating_system: spec.os.clone(),
            billing_cycle: spec
                .billing_cycle
                .clone()
                .unwrap_or_else(|| self.billing_cycle.clone()),
            project_id: self.project_id.clone(),
        }
    }
}

#[async_trait]
impl Reconciler for DeviceReconciler {
    fn kind(&self) -> &'static str {
        Device::KIND
    }

    async fn reconcile(&self, name: &str) -> Result<Outcome> {
        let device = match self.store.get(name).await {
            Ok(device) => device,
            Err(e) if e.is_not_found() => {
                // Deletion only flows from provider inventory into the store.
                info!(device = %name, "Device removed from store");
                return Ok(Outcome::Deleted);
            }
            Err(e) => return Err(e).context("unable to fetch Device"),
        };

        if device.is_deleting() {
            info!(device = %name, "Device is being deleted");
            return Ok(Outcome::Deleted);
        }

        let devices = self
            .metal
            .list_devices(&self.project_id)
            .await
            .context("failed to list devices from Equinix Metal")?;

        if let Some(existing) = devices.iter().find(|d| d.hostname == name) {
            self.cache.put(name, &existing.id).await;
            return Ok(Outcome::Present {
                id: existing.id.clone(),
            });
        }

        if let Some(id) = self.cache.get(name).await {
            info!(device = %name, id = %id, "Device provisioning already requested");
            return Ok(Outcome::Pending { id });
        }

        let request = self.create_request(&device);
        if request.hostname != name {
            warn!(
                device = %name,
                hostname = %request.hostname,
                "Device hostname differs from record name"
            );
        }

        info!(
            device = %name,
            plan = %request.plan,
            facility = ?request.facility,
            os = %request.operating_system,
            "New Device being created"
        );

        match self.metal.create_device(&request).await {
            Ok(created) => {
                self.cache.put(name, &created.id).await;
                info!(device = %name, id = %created.id, "Device provisioning requested");
                Ok(Outcome::Provisioned { id: created.id })
            }
            Err(e) if e.is_already_exists() => {
                info!(device = %name, "Device already exists in Equinix Metal");
                Ok(Outcome::AlreadyExists)
            }
            Err(e) => Err(e).with_context(|| format!("failed to create device {}", name)),
        }
    }
}
