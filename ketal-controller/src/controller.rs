//! Watch loop driving one reconciler from store events.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use ketal_store::{EventType, RecordStore, Resource};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::reconciler::{Outcome, Reconciler};

/// Subscribes to a store and reconciles every record named by an event.
///
/// After each (re)subscribe the controller lists the store and reconciles
/// every record, so events lost while disconnected are recovered.
pub struct Controller<R: Resource> {
    store: Arc<dyn RecordStore<R>>,
    reconciler: Arc<dyn Reconciler>,
    retry_delay: Duration,
}

impl<R: Resource> Controller<R> {
    pub fn new(
        store: Arc<dyn RecordStore<R>>,
        reconciler: Arc<dyn Reconciler>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            store,
            reconciler,
            retry_delay,
        }
    }

    /// Run until `shutdown` flips to true (or its sender is dropped).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let kind = self.reconciler.kind();
        info!(kind, "Starting controller");

        'outer: loop {
            if *shutdown.borrow() {
                break;
            }

            match self.store.watch().await {
                Ok(mut events) => {
                    debug!(kind, "Watch established");
                    self.resync().await;

                    loop {
                        tokio::select! {
                            next = events.next() => match next {
                                Some(Ok(event)) => {
                                    if event.event_type == EventType::Deleted {
                                        debug!(kind, name = %event.name, "Record deleted");
                                    }
                                    self.reconcile(&event.name).await;
                                }
                                Some(Err(e)) => {
                                    warn!(kind, error = %e, "Watch failed");
                                    break;
                                }
                                None => {
                                    warn!(kind, "Watch stream ended");
                                    break;
                                }
                            },
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    break 'outer;
                                }
                            }
                        }
                    }
                }
                Err(e) => error!(kind, error = %e, "Failed to watch records"),
            }

            warn!(kind, delay = ?self.retry_delay, "Re-subscribing after delay");
            tokio::select! {
                _ = tokio::time::sleep(self.retry_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(kind, "Controller stopped");
    }

    async fn resync(&self) {
        let kind = self.reconciler.kind();
        match self.store.list().await {
            Ok(records) => {
                debug!(kind, count = records.len(), "Resyncing records");
                for record in &records {
                    self.reconcile(record.name()).await;
                }
            }
            Err(e) => error!(kind, error = %e, "Failed to list records for resync"),
        }
    }

    async fn reconcile(&self, name: &str) {
        let kind = self.reconciler.kind();
        match self.reconciler.reconcile(name).await {
            Ok(Outcome::Deleted) | Ok(Outcome::Present { .. }) => {}
            Ok(outcome) => debug!(kind, name, ?outcome, "Reconciled"),
            Err(e) => error!(kind, name, "Reconcile failed: {:#}", e),
        }
    }
}
