//! ketal-controller: keeps Device and Eip records in sync with Equinix Metal.
//!
//! This daemon:
//! - Polls Equinix Metal devices and IP reservations into the record store
//! - Removes Device records whose provider device is gone
//! - Provisions devices declared in the store but missing from the provider

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ketal_controller::{Engine, EngineConfig, MetalConfig};
use ketal_metal::{MetalApi, MetalClient};
use ketal_store::{Device, Eip, KubeConfig, KubeStore, MemoryStore, RecordStore};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreBackend {
    /// Custom resources on the Kubernetes API server
    Kube,
    /// In-process store, lost on exit
    Memory,
}

/// ketal controller
#[derive(Parser, Debug)]
#[command(name = "ketal-controller", version, about)]
struct Args {
    /// Equinix Metal provider config (JSON with apiKey, projectId, base-url)
    #[arg(long, env = "KETAL_PROVIDER_CONFIG", default_value = "/cloud-sa.json")]
    provider_config: PathBuf,

    /// Namespace holding Device and Eip records
    #[arg(long, env = "KETAL_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Inventory poll interval in seconds
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Maximum poll delay in seconds while the provider API keeps failing
    #[arg(long, default_value = "60")]
    max_backoff: u64,

    /// Billing cycle for declared devices that do not name one
    #[arg(long, default_value = "hourly")]
    billing_cycle: String,

    /// Record store backend
    #[arg(long, value_enum, default_value = "kube")]
    store: StoreBackend,

    /// Kubernetes API server URL (defaults to in-cluster configuration)
    #[arg(long, env = "KETAL_KUBE_API_URL")]
    kube_api_url: Option<String>,

    /// Bearer token file for --kube-api-url
    #[arg(long)]
    kube_token_file: Option<PathBuf>,
}

type Stores = (Arc<dyn RecordStore<Device>>, Arc<dyn RecordStore<Eip>>);

async fn build_stores(args: &Args) -> Result<Stores> {
    match args.store {
        StoreBackend::Memory => {
            info!(namespace = %args.namespace, "Using in-memory record store");
            Ok((
                Arc::new(MemoryStore::<Device>::new(&args.namespace)),
                Arc::new(MemoryStore::<Eip>::new(&args.namespace)),
            ))
        }
        StoreBackend::Kube => {
            let config = match &args.kube_api_url {
                Some(url) => {
                    let config = KubeConfig::new(url);
                    match &args.kube_token_file {
                        Some(path) => config
                            .with_token_file(path)
                            .await
                            .context("failed to read Kubernetes token")?,
                        None => config,
                    }
                }
                None => KubeConfig::in_cluster()
                    .await
                    .context("failed to load in-cluster Kubernetes configuration")?,
            };
            info!(api = %config.api_url, namespace = %args.namespace, "Using Kubernetes record store");

            let devices = KubeStore::<Device>::new(&config, &args.namespace)
                .context("failed to create Device store")?;
            let eips = KubeStore::<Eip>::new(&config, &args.namespace)
                .context("failed to create Eip store")?;
            Ok((Arc::new(devices), Arc::new(eips)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ketal_controller=info,ketal_store=info,ketal_metal=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting ketal-controller {}", env!("CARGO_PKG_VERSION"));

    let metal_config = MetalConfig::load(&args.provider_config)?;
    info!(project = %metal_config.project_id, "Loaded Equinix Metal configuration");

    let client = MetalClient::new(&metal_config.auth_token, metal_config.base_url.as_deref())
        .context("failed to create Equinix Metal client")?;

    // Fail fast on bad credentials
    let projects = client
        .list_projects()
        .await
        .context("failed to connect to Equinix Metal API")?;
    info!(projects = projects.len(), "Connected to Equinix Metal API");

    let (device_store, eip_store) = build_stores(&args).await?;

    let mut config = EngineConfig::new(metal_config.project_id.clone());
    config.namespace = args.namespace.clone();
    config.poll_interval = Duration::from_secs(args.poll_interval.max(1));
    config.max_backoff = Duration::from_secs(args.max_backoff);
    config.billing_cycle = args.billing_cycle.clone();

    let metal: Arc<dyn MetalApi> = Arc::new(client);
    let engine = Engine::new(metal, device_store, eip_store, config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = engine.spawn(shutdown_rx);

    // Wait for shutdown signal
    let ctrl_c = signal::ctrl_c();
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = sigterm.recv() => info!("Received SIGTERM"),
    }

    let _ = shutdown_tx.send(true);
    handle.join().await;

    info!("Shutdown complete");
    Ok(())
}
