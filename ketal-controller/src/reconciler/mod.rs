//! Declared-record reconcilers.
//!
//! Each reconciler is level-triggered: on every event it re-reads the record
//! and the provider inventory instead of trusting the event, so missed,
//! repeated or reordered events are harmless.

pub mod device;
pub mod eip;

use anyhow::Result;
use async_trait::async_trait;

pub use device::DeviceReconciler;
pub use eip::EipReconciler;

/// What a reconcile pass found or did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The provider already lists a matching resource.
    Present { id: String },
    /// A provisioning request was accepted by the provider.
    Provisioned { id: String },
    /// Provisioning was requested earlier and is not in inventory yet.
    Pending { id: String },
    /// The provider rejected the create as a duplicate.
    AlreadyExists,
    /// The provider has no matching resource and none will be created.
    Missing,
    /// The record is gone or being deleted.
    Deleted,
}

/// Trait for per-kind record reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Record kind handled, for logging.
    fn kind(&self) -> &'static str;

    /// Reconcile the record called `name`.
    async fn reconcile(&self, name: &str) -> Result<Outcome>;
}
