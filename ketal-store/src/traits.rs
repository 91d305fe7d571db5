//! Store trait consumed by the reconciliation engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::event::WatchStream;
use crate::record::Resource;

/// Namespaced CRUD + watch access to records of one kind.
///
/// Record names are unique within a store; `create` on an existing name
/// fails with [`StoreError::AlreadyExists`](crate::StoreError::AlreadyExists).
#[async_trait]
pub trait RecordStore<R: Resource>: Send + Sync {
    /// List all records.
    async fn list(&self) -> Result<Vec<R>>;

    /// Get a record by name.
    async fn get(&self, name: &str) -> Result<R>;

    /// Create a new record, returning it as stored.
    async fn create(&self, record: &R) -> Result<R>;

    /// Delete a record by name.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Subscribe to change events.
    ///
    /// Delivery is at-least-once. A stream that ends or yields an error should
    /// be re-opened by the caller.
    async fn watch(&self) -> Result<WatchStream>;
}
