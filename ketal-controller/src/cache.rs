//! Identity → provider resource ID cache.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::trace;

/// Last known provider resource ID per identity key (hostname or address).
///
/// Owned by the engine and shared between the poller and the device
/// reconciler. Entries are never evicted by age; this assumes inventories small
/// enough to hold in memory. An entry is dropped only when the poller removes
/// the matching record because the provider no longer lists it.
#[derive(Debug)]
pub struct IdentityCache {
    kind: &'static str,
    entries: RwLock<HashMap<String, String>>,
}

impl IdentityCache {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    /// Record `id` for `key`, returning the previous ID if any.
    pub async fn put(&self, key: &str, id: &str) -> Option<String> {
        let previous = self
            .entries
            .write()
            .await
            .insert(key.to_string(), id.to_string());
        if previous.as_deref() != Some(id) {
            trace!(kind = self.kind, key, id, "Identity cached");
        }
        previous
    }

    pub async fn remove(&self, key: &str) -> Option<String> {
        self.entries.write().await.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let cache = IdentityCache::new("device");
        assert_eq!(cache.put("node-1", "id-1").await, None);
        assert_eq!(cache.get("node-1").await.as_deref(), Some("id-1"));

        assert_eq!(cache.put("node-1", "id-2").await.as_deref(), Some("id-1"));
        assert_eq!(cache.get("node-1").await.as_deref(), Some("id-2"));

        assert_eq!(cache.remove("node-1").await.as_deref(), Some("id-2"));
        assert_eq!(cache.get("node-1").await, None);
    }
}
