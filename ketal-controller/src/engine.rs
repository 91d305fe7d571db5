//! Wires the poller and both controllers around the shared device cache.

use std::sync::Arc;

use ketal_metal::MetalApi;
use ketal_store::{Device, Eip, RecordStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cache::IdentityCache;
use crate::config::EngineConfig;
use crate::controller::Controller;
use crate::poller::Poller;
use crate::reconciler::{DeviceReconciler, EipReconciler};

pub struct Engine {
    poller: Poller,
    devices: Controller<Device>,
    eips: Controller<Eip>,
    device_cache: Arc<IdentityCache>,
}

impl Engine {
    pub fn new(
        metal: Arc<dyn MetalApi>,
        device_store: Arc<dyn RecordStore<Device>>,
        eip_store: Arc<dyn RecordStore<Eip>>,
        config: EngineConfig,
    ) -> Self {
        let device_cache = Arc::new(IdentityCache::new("device"));

        let device_reconciler = DeviceReconciler::new(
            device_store.clone(),
            metal.clone(),
            device_cache.clone(),
            config.project_id.clone(),
            config.billing_cycle.clone(),
        );
        let eip_reconciler =
            EipReconciler::new(eip_store.clone(), metal.clone(), config.project_id.clone());

        let devices = Controller::new(
            device_store.clone(),
            Arc::new(device_reconciler),
            config.watch_retry,
        );
        let eips = Controller::new(eip_store.clone(), Arc::new(eip_reconciler), config.watch_retry);

        let poller = Poller::new(
            metal,
            device_store,
            eip_store,
            device_cache.clone(),
            config,
        );

        Self {
            poller,
            devices,
            eips,
            device_cache,
        }
    }

    pub fn device_cache(&self) -> Arc<IdentityCache> {
        self.device_cache.clone()
    }

    /// Spawn the poller and both controllers. All three stop once `shutdown`
    /// carries `true`.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> EngineHandle {
        let handles = vec![
            tokio::spawn(self.poller.run(shutdown.clone())),
            tokio::spawn(self.devices.run(shutdown.clone())),
            tokio::spawn(self.eips.run(shutdown)),
        ];
        EngineHandle { handles }
    }
}

pub struct EngineHandle {
    handles: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Wait for every engine task to finish.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Engine task failed: {}", e);
            }
        }
        info!("Engine stopped");
    }
}
