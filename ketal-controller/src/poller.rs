//! Inventory poller - copies Equinix Metal inventory into the record store.

use std::sync::Arc;
use std::time::Duration;

use ketal_metal::MetalApi;
use ketal_store::{Device, Eip, RecordStore};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cache::IdentityCache;
use crate::config::EngineConfig;
use crate::sync::{self, SyncReport};

/// Result of one poll for one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindOutcome {
    Synced(SyncReport),
    /// Provider inventory could not be fetched; the store was left alone.
    ProviderUnavailable,
    /// Store records could not be listed; nothing was written.
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub devices: KindOutcome,
    pub eips: KindOutcome,
}

impl PollOutcome {
    /// False when any provider fetch failed in this poll.
    pub fn provider_healthy(&self) -> bool {
        self.devices != KindOutcome::ProviderUnavailable
            && self.eips != KindOutcome::ProviderUnavailable
    }
}

/// Delay before the next poll after `failures` consecutive provider failures.
pub fn next_delay(interval: Duration, max_backoff: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return interval;
    }
    let factor = 1u32 << failures.min(16);
    interval
        .saturating_mul(factor)
        .min(max_backoff.max(interval))
}

fn stopping(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Periodically converges Device and Eip records onto provider inventory.
pub struct Poller {
    metal: Arc<dyn MetalApi>,
    devices: Arc<dyn RecordStore<Device>>,
    eips: Arc<dyn RecordStore<Eip>>,
    device_cache: Arc<IdentityCache>,
    config: EngineConfig,
}

impl Poller {
    pub fn new(
        metal: Arc<dyn MetalApi>,
        devices: Arc<dyn RecordStore<Device>>,
        eips: Arc<dyn RecordStore<Eip>>,
        device_cache: Arc<IdentityCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            metal,
            devices,
            eips,
            device_cache,
            config,
        }
    }

    /// Poll until `shutdown` flips to true (or its sender is dropped).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            project = %self.config.project_id,
            interval = ?self.config.poll_interval,
            "Starting inventory poller"
        );

        let mut failures: u32 = 0;
        loop {
            let Some(outcome) = self.poll_once(&shutdown).await else {
                break;
            };

            if outcome.provider_healthy() {
                failures = 0;
            } else {
                failures = failures.saturating_add(1);
            }

            let delay = next_delay(self.config.poll_interval, self.config.max_backoff, failures);
            if failures > 0 {
                warn!(failures, delay = ?delay, "Equinix Metal API unavailable, backing off");
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Inventory poller stopped");
    }

    /// Run one poll over both kinds. Returns `None` if shutdown was requested
    /// before a fetch.
    pub async fn poll_once(&self, shutdown: &watch::Receiver<bool>) -> Option<PollOutcome> {
        if stopping(shutdown) {
            return None;
        }
        let devices = self.sync_devices().await;

        if stopping(shutdown) {
            return None;
        }
        let eips = self.sync_eips().await;

        Some(PollOutcome { devices, eips })
    }

    async fn sync_devices(&self) -> KindOutcome {
        let provider = match self.metal.list_devices(&self.config.project_id).await {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "Failed to list devices from Equinix Metal");
                return KindOutcome::ProviderUnavailable;
            }
        };

        for device in provider.iter().filter(|d| !d.hostname.is_empty()) {
            self.device_cache.put(&device.hostname, &device.id).await;
        }

        match sync::sync_devices(&*self.devices, &provider, &self.config.namespace).await {
            Ok(report) => {
                for name in &report.deleted {
                    self.device_cache.remove(name).await;
                }
                log_report("Device", &report);
                KindOutcome::Synced(report)
            }
            Err(e) => {
                error!(error = %e, "Failed to list Device records");
                KindOutcome::StoreUnavailable
            }
        }
    }

    async fn sync_eips(&self) -> KindOutcome {
        let provider = match self.metal.list_ips(&self.config.project_id).await {
            Ok(ips) => ips,
            Err(e) => {
                error!(error = %e, "Failed to list IP reservations from Equinix Metal");
                return KindOutcome::ProviderUnavailable;
            }
        };

        match sync::sync_eips(&*self.eips, &provider, &self.config.namespace).await {
            Ok(report) => {
                log_report("Eip", &report);
                KindOutcome::Synced(report)
            }
            Err(e) => {
                error!(error = %e, "Failed to list Eip records");
                KindOutcome::StoreUnavailable
            }
        }
    }
}

fn log_report(kind: &str, report: &SyncReport) {
    if report.mutations() > 0 || report.failed > 0 {
        info!(
            kind,
            created = report.created,
            deleted = report.deleted.len(),
            failed = report.failed,
            "Inventory synced"
        );
    } else {
        debug!(kind, existing = report.existing, "Inventory unchanged");
    }
}
