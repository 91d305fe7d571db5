//! Record store backed by custom resources on a Kubernetes API server.

use std::marker::PhantomData;
use std::path::Path;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::event::{EventType, WatchEvent, WatchStream};
use crate::record::{GROUP, Resource, VERSION};
use crate::traits::RecordStore;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Connection settings for the Kubernetes API server.
#[derive(Debug, Clone, Default)]
pub struct KubeConfig {
    /// Base URL, e.g. `https://10.96.0.1:443`.
    pub api_url: String,
    /// Bearer token sent on every request.
    pub token: Option<String>,
    /// Extra PEM bundle trusted for the API server certificate.
    pub ca_pem: Option<Vec<u8>>,
}

impl KubeConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Read the bearer token from a file (trailing whitespace trimmed).
    pub async fn with_token_file(mut self, path: &Path) -> Result<Self> {
        let token = tokio::fs::read_to_string(path).await.map_err(|e| {
            StoreError::Config(format!("failed to read token file {}: {}", path.display(), e))
        })?;
        self.token = Some(token.trim().to_string());
        Ok(self)
    }

    /// Build the configuration of a pod's service account.
    pub async fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| StoreError::Config("KUBERNETES_SERVICE_HOST is not set".into()))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".into());
        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host
        };

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let config = Self::new(format!("https://{}:{}", host, port))
            .with_token_file(&dir.join("token"))
            .await?;
        let ca_pem = tokio::fs::read(dir.join("ca.crt")).await.map_err(|e| {
            StoreError::Config(format!("failed to read service account CA bundle: {}", e))
        })?;

        Ok(Self {
            ca_pem: Some(ca_pem),
            ..config
        })
    }
}

/// Namespaced custom-resource client for one record kind.
pub struct KubeStore<R> {
    client: reqwest::Client,
    collection_url: String,
    token: Option<String>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Resource> KubeStore<R> {
    pub fn new(config: &KubeConfig, namespace: &str) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("ketal/", env!("CARGO_PKG_VERSION")));
        if let Some(pem) = &config.ca_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }

        let collection_url = format!(
            "{}/apis/{}/{}/namespaces/{}/{}",
            config.api_url.trim_end_matches('/'),
            GROUP,
            VERSION,
            namespace,
            R::PLURAL
        );
        info!(kind = R::KIND, url = %collection_url, "Using Kubernetes record store");

        Ok(Self {
            client: builder.build()?,
            collection_url,
            token: config.token.clone(),
            _kind: PhantomData,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn item_url(&self, name: &str) -> String {
        format!("{}/{}", self.collection_url, name)
    }

    /// Map non-success responses onto the store error taxonomy.
    async fn check(response: Response, name: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiStatus>(&body)
            .map(|s| s.message)
            .unwrap_or(body);

        Err(match status.as_u16() {
            404 => StoreError::NotFound(format!("{} {}", R::KIND, name)),
            409 => StoreError::AlreadyExists(format!("{} {}", R::KIND, name)),
            code => StoreError::Api {
                status: code,
                message,
            },
        })
    }
}

/// `meta/v1 Status` body returned on failures.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: u16,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "R: Resource")]
struct RecordList<R> {
    #[serde(default = "Vec::new")]
    items: Vec<R>,
}

#[derive(Debug, Deserialize)]
struct RawWatchEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    object: serde_json::Value,
}

/// Decode one line of a watch response.
///
/// Returns `Ok(None)` for blank lines and for event types that do not concern
/// a record (bookmarks).
fn parse_watch_line(line: &[u8]) -> Result<Option<WatchEvent>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: RawWatchEvent = serde_json::from_slice(line)?;
    let event_type = match raw.event_type.as_str() {
        "ADDED" => EventType::Added,
        "MODIFIED" => EventType::Modified,
        "DELETED" => EventType::Deleted,
        "ERROR" => {
            let status: ApiStatus = serde_json::from_value(raw.object)?;
            return Err(StoreError::Api {
                status: status.code,
                message: status.message,
            });
        }
        _ => return Ok(None),
    };

    let name = raw.object["metadata"]["name"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    Ok(Some(WatchEvent { event_type, name }))
}

#[async_trait]
impl<R: Resource> RecordStore<R> for KubeStore<R> {
    async fn list(&self) -> Result<Vec<R>> {
        let response = self
            .request(Method::GET, &self.collection_url)
            .send()
            .await?;
        let body = Self::check(response, "").await?.bytes().await?;
        let list: RecordList<R> = serde_json::from_slice(&body)?;
        Ok(list.items)
    }

    async fn get(&self, name: &str) -> Result<R> {
        let response = self
            .request(Method::GET, &self.item_url(name))
            .send()
            .await?;
        let body = Self::check(response, name).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn create(&self, record: &R) -> Result<R> {
        let name = record.name();
        if name.is_empty() {
            return Err(StoreError::Invalid(format!("{} without a name", R::KIND)));
        }

        let response = self
            .request(Method::POST, &self.collection_url)
            .json(record)
            .send()
            .await?;
        let body = Self::check(response, name).await?.bytes().await?;
        debug!(kind = R::KIND, name = %name, "Record created");
        Ok(serde_json::from_slice(&body)?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, &self.item_url(name))
            .send()
            .await?;
        Self::check(response, name).await?;
        debug!(kind = R::KIND, name = %name, "Record deleted");
        Ok(())
    }

    async fn watch(&self) -> Result<WatchStream> {
        // Without a resourceVersion the server first replays every existing
        // record as ADDED, which gives the reconcilers their initial pass.
        let response = self
            .request(Method::GET, &self.collection_url)
            .query(&[("watch", "1")])
            .send()
            .await?;
        let mut body = Box::pin(Self::check(response, "").await?.bytes_stream());

        let events = stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = body.next().await {
                match chunk {
                    Ok(chunk) => buffer.extend_from_slice(&chunk),
                    Err(e) => {
                        yield Err(StoreError::Transport(e));
                        return;
                    }
                }

                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    match parse_watch_line(&line) {
                        Ok(Some(event)) => yield Ok(event),
                        Ok(None) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        };
        Ok(events.boxed())
    }
}
