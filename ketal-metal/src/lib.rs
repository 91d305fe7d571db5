//! Equinix Metal API client.
//!
//! Only the calls ketal needs are implemented: listing devices and IP
//! reservations of a project, provisioning devices, and listing projects as a
//! connectivity check. Consumers depend on the [`MetalApi`] trait so tests can
//! substitute a fake inventory.

mod api;
mod client;
mod error;
mod types;

pub use api::MetalApi;
pub use client::{DEFAULT_BASE_URL, MetalClient};
pub use error::{MetalError, Result};
pub use types::{
    Device, DeviceCreateRequest, Facility, IpAddress, Metro, OperatingSystem, Plan, Project,
};
