//! ketal controller: keeps `Device` and `Eip` records eventually consistent
//! with Equinix Metal inventory.
//!
//! Two paths run side by side:
//! - the [`Poller`](poller::Poller) copies provider inventory into the store
//!   on a timer (provider → store), and
//! - one [`Controller`](controller::Controller) per kind reacts to store
//!   events and provisions declared devices (store → provider).
//!
//! Both paths race on the same identities. Duplicate creates on either side
//! are absorbed as no-ops.

pub mod cache;
pub mod config;
pub mod controller;
pub mod engine;
pub mod poller;
pub mod reconciler;
pub mod sync;

pub use cache::IdentityCache;
pub use config::{EngineConfig, MetalConfig};
pub use engine::{Engine, EngineHandle};
