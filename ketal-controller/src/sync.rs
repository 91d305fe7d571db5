//! Diff & sync of provider inventory into the record store.
//!
//! Planning is a pure set difference on identity keys (hostname for devices,
//! address for elastic IPs), so the result does not depend on the order of
//! either inventory. Applying a plan is per item: one failed create or delete
//! never stops the rest.

use std::collections::HashSet;

use ketal_metal as metal;
use ketal_store::{Device, DeviceSpec, Eip, EipSpec, RecordStore, Resource};
use tracing::{debug, error, info};

/// Store mutations that converge device records onto provider inventory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePlan {
    /// Records for provider devices missing from the store.
    pub create: Vec<Device>,
    /// Names of records with no matching provider device.
    pub delete: Vec<String>,
}

impl DevicePlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty()
    }
}

/// Store mutations for elastic IPs. There is no delete half.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EipPlan {
    pub create: Vec<Eip>,
}

impl EipPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
    }
}

/// Result of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    /// Creates that hit an existing record and were treated as done.
    pub existing: usize,
    /// Names of the records that are gone after this pass, including ones a
    /// concurrent writer removed first.
    pub deleted: Vec<String>,
    pub failed: usize,
}

impl SyncReport {
    /// Number of records created or removed in this pass.
    pub fn mutations(&self) -> usize {
        self.created + self.deleted.len()
    }
}

/// Build the store record mirroring a provider device.
pub fn device_record(device: &metal::Device, namespace: &str) -> Device {
    Device::new(
        device.hostname.clone(),
        namespace,
        DeviceSpec {
            hostname: device.hostname.clone(),
            uuid: device.id.clone(),
            device_type: device.plan_name().to_string(),
            address: device.public_ipv4().unwrap_or_default().to_string(),
            facility: device.facility_label(),
            metro: device.metro_name().to_string(),
            os: device.os_distro().to_string(),
            billing_cycle: None,
        },
    )
}

/// Build the store record mirroring a provider IP reservation.
pub fn eip_record(ip: &metal::IpAddress, namespace: &str) -> Eip {
    Eip::new(
        ip.address.clone(),
        namespace,
        EipSpec {
            uuid: ip.id.clone(),
            address: ip.address.clone(),
            public: ip.public,
        },
    )
}

pub fn plan_devices(provider: &[metal::Device], records: &[Device], namespace: &str) -> DevicePlan {
    let stored: HashSet<&str> = records.iter().map(|r| r.name()).collect();
    let live: HashSet<&str> = provider
        .iter()
        .map(|d| d.hostname.as_str())
        .filter(|h| !h.is_empty())
        .collect();

    let mut planned = HashSet::new();
    let create = provider
        .iter()
        .filter(|d| !d.hostname.is_empty() && !stored.contains(d.hostname.as_str()))
        .filter(|d| planned.insert(d.hostname.as_str()))
        .map(|d| device_record(d, namespace))
        .collect();

    let delete = records
        .iter()
        .map(|r| r.name())
        .filter(|name| !name.is_empty() && !live.contains(name))
        .map(str::to_string)
        .collect();

    DevicePlan { create, delete }
}

/// Plan elastic IP creates. Only IPv4 reservations are mirrored.
pub fn plan_eips(provider: &[metal::IpAddress], records: &[Eip], namespace: &str) -> EipPlan {
    let stored: HashSet<&str> = records.iter().map(|r| r.name()).collect();

    let mut planned = HashSet::new();
    let create = provider
        .iter()
        .filter(|ip| ip.is_ipv4() && !ip.address.is_empty())
        .filter(|ip| !stored.contains(ip.address.as_str()))
        .filter(|ip| planned.insert(ip.address.as_str()))
        .map(|ip| eip_record(ip, namespace))
        .collect();

    EipPlan { create }
}

async fn create_records<R: Resource>(
    store: &dyn RecordStore<R>,
    records: Vec<R>,
    report: &mut SyncReport,
) {
    for record in records {
        match store.create(&record).await {
            Ok(_) => {
                info!(kind = R::KIND, name = %record.name(), "Record created from Equinix Metal inventory");
                report.created += 1;
            }
            Err(e) if e.is_already_exists() => {
                debug!(kind = R::KIND, name = %record.name(), "Record already exists");
                report.existing += 1;
            }
            Err(e) => {
                error!(kind = R::KIND, name = %record.name(), error = %e, "Failed to create record");
                report.failed += 1;
            }
        }
    }
}

pub async fn apply_device_plan(store: &dyn RecordStore<Device>, plan: DevicePlan) -> SyncReport {
    let mut report = SyncReport::default();
    create_records(store, plan.create, &mut report).await;

    for name in plan.delete {
        info!(device = %name, "Removing Device from store");
        match store.delete(&name).await {
            Ok(()) => report.deleted.push(name),
            Err(e) if e.is_not_found() => {
                debug!(device = %name, "Device already removed");
                report.deleted.push(name);
            }
            Err(e) => {
                error!(device = %name, error = %e, "Failed to remove Device");
                report.failed += 1;
            }
        }
    }

    report
}

pub async fn apply_eip_plan(store: &dyn RecordStore<Eip>, plan: EipPlan) -> SyncReport {
    let mut report = SyncReport::default();
    create_records(store, plan.create, &mut report).await;
    report
}

/// List device records, then plan and apply against `provider`.
pub async fn sync_devices(
    store: &dyn RecordStore<Device>,
    provider: &[metal::Device],
    namespace: &str,
) -> ketal_store::Result<SyncReport> {
    let records = store.list().await?;
    let plan = plan_devices(provider, &records, namespace);
    Ok(apply_device_plan(store, plan).await)
}

/// List elastic IP records, then plan and apply against `provider`.
pub async fn sync_eips(
    store: &dyn RecordStore<Eip>,
    provider: &[metal::IpAddress],
    namespace: &str,
) -> ketal_store::Result<SyncReport> {
    let records = store.list().await?;
    let plan = plan_eips(provider, &records, namespace);
    Ok(apply_eip_plan(store, plan).await)
}
