//! Declarative record store for ketal.
//!
//! Records mirror Equinix Metal inventory as named, namespaced objects in the
//! `ketal.equinix.metal/v1` API group. The engine only talks to stores through
//! the [`RecordStore`] trait, so the backend can be swapped freely.
//!
//! # Architecture
//!
//! ```text
//! poller / reconcilers → Arc<dyn RecordStore<Device>>
//!                              ↓
//!                        MemoryStore<Device>     // in-process, tests and standalone runs
//!                        KubeStore<Device>       // custom resources on a Kubernetes API server
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ketal_store::{Device, DeviceSpec, MemoryStore, RecordStore};
//!
//! let store = MemoryStore::<Device>::new("default");
//! store.create(&Device::new("node-1", "default", DeviceSpec::default())).await?;
//! let devices = store.list().await?;
//! ```

mod error;
mod event;
mod kube_store;
mod memory_store;
mod record;
mod traits;

pub use error::{Result, StoreError};
pub use event::{EventType, WatchEvent, WatchStream};
pub use kube_store::{KubeConfig, KubeStore};
pub use memory_store::MemoryStore;
pub use record::{
    API_VERSION, Device, DeviceSpec, DeviceStatus, Eip, EipSpec, EipStatus, GROUP, ObjectMeta,
    Resource, VERSION,
};
pub use traits::RecordStore;
