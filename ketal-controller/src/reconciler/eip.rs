//! Elastic IP reconciler - reports declared addresses the provider lacks.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use ketal_metal::MetalApi;
use ketal_store::{Eip, RecordStore, Resource};
use tracing::{info, warn};

use super::{Outcome, Reconciler};

/// Elastic IP records are a read-mostly mirror: nothing is provisioned for
/// them, a declared address missing from inventory is only logged.
pub struct EipReconciler {
    store: Arc<dyn RecordStore<Eip>>,
    metal: Arc<dyn MetalApi>,
    project_id: String,
}

impl EipReconciler {
    pub fn new(
        store: Arc<dyn RecordStore<Eip>>,
        metal: Arc<dyn MetalApi>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            metal,
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl Reconciler for EipReconciler {
    fn kind(&self) -> &'static str {
        Eip::KIND
    }

    async fn reconcile(&self, name: &str) -> Result<Outcome> {
        let eip = match self.store.get(name).await {
            Ok(eip) => eip,
            Err(e) if e.is_not_found() => {
                info!(eip = %name, "Elastic IP removed from store");
                return Ok(Outcome::Deleted);
            }
            Err(e) => return Err(e).context("unable to fetch Elastic IP"),
        };

        if eip.is_deleting() {
            info!(eip = %name, "Elastic IP is being deleted");
            return Ok(Outcome::Deleted);
        }

        let ips = self
            .metal
            .list_ips(&self.project_id)
            .await
            .context("failed to list IP reservations from Equinix Metal")?;

        match ips.iter().find(|ip| ip.is_ipv4() && ip.address == name) {
            Some(ip) => Ok(Outcome::Present { id: ip.id.clone() }),
            None => {
                warn!(
                    eip = %name,
                    "Elastic IP not in Equinix Metal inventory, provisioning is not supported"
                );
                Ok(Outcome::Missing)
            }
        }
    }
}
