//! In-process record store backed by a map and a broadcast channel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::event::{EventType, WatchEvent, WatchStream};
use crate::record::Resource;
use crate::traits::RecordStore;

/// Record store held entirely in memory.
///
/// Nothing is persisted; a restart starts from an empty store and the poller
/// repopulates it from provider inventory.
pub struct MemoryStore<R> {
    namespace: String,
    records: RwLock<BTreeMap<String, R>>,
    revision: AtomicU64,
    events: broadcast::Sender<WatchEvent>,
}

impl<R: Resource> MemoryStore<R> {
    pub fn new(namespace: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            namespace: namespace.into(),
            records: RwLock::new(BTreeMap::new()),
            revision: AtomicU64::new(0),
            events,
        }
    }

    fn emit(&self, event_type: EventType, name: &str) {
        // No subscribers is fine.
        let _ = self.events.send(WatchEvent::new(event_type, name));
    }
}

#[async_trait]
impl<R: Resource> RecordStore<R> for MemoryStore<R> {
    async fn list(&self) -> Result<Vec<R>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn get(&self, name: &str) -> Result<R> {
        let records = self.records.read().await;
        records
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", R::KIND, name)))
    }

    async fn create(&self, record: &R) -> Result<R> {
        let name = record.name().to_string();
        if name.is_empty() {
            return Err(StoreError::Invalid(format!("{} without a name", R::KIND)));
        }

        let mut records = self.records.write().await;
        if records.contains_key(&name) {
            return Err(StoreError::AlreadyExists(format!("{} {}", R::KIND, name)));
        }

        let mut stored = record.clone();
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let meta = stored.meta_mut();
        meta.namespace = Some(self.namespace.clone());
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
        meta.resource_version = Some(revision.to_string());
        meta.creation_timestamp = Some(Utc::now().to_rfc3339());

        records.insert(name.clone(), stored.clone());
        drop(records);

        debug!(kind = R::KIND, name = %name, "Record created");
        self.emit(EventType::Added, &name);
        Ok(stored)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let removed = self.records.write().await.remove(name);
        match removed {
            Some(_) => {
                debug!(kind = R::KIND, name = %name, "Record deleted");
                self.emit(EventType::Deleted, name);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("{} {}", R::KIND, name))),
        }
    }

    async fn watch(&self) -> Result<WatchStream> {
        let stream = BroadcastStream::new(self.events.subscribe()).filter_map(|item| async move {
            match item {
                Ok(event) => Some(Ok(event)),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(kind = R::KIND, skipped, "Watch subscriber lagged, events dropped");
                    Some(Err(StoreError::Lagged(skipped)))
                }
            }
        });
        Ok(stream.boxed())
    }
}
