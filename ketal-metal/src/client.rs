//! HTTP implementation of [`MetalApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::MetalApi;
use crate::error::{MetalError, Result};
use crate::types::{Device, DeviceCreateRequest, IpAddress, Project};

/// Public Equinix Metal API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.equinix.com/metal/v1/";

const PER_PAGE: u32 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pagination block returned on list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageMeta {
    last_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DevicePage {
    devices: Vec<Device>,
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectPage {
    projects: Vec<Project>,
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IpAddressList {
    ip_addresses: Vec<IpAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    errors: Vec<String>,
    error: Option<String>,
}

/// Client for the Equinix Metal REST API.
#[derive(Clone)]
pub struct MetalClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MetalClient {
    /// Create a client authenticating with `token`, against `base_url` or the
    /// public endpoint.
    pub fn new(token: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(MetalError::Config("auth token is empty".into()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("ketal/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("GET {} {:?}", path, query);
        let response = self
            .http
            .get(self.url(path))
            .header("X-Auth-Token", &self.token)
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .header("X-Auth-Token", &self.token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let mut errors = body.errors;
        errors.extend(body.error);
        if errors.is_empty() && !text.is_empty() {
            errors.push(text);
        }

        Err(MetalError::Api {
            status: status.as_u16(),
            errors,
        })
    }

    fn page_query(page: u32) -> Vec<(&'static str, String)> {
        vec![("page", page.to_string()), ("per_page", PER_PAGE.to_string())]
    }
}

#[async_trait]
impl MetalApi for MetalClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = Vec::new();
        let mut page = 1;
        loop {
            let body: ProjectPage = self.get("projects", &Self::page_query(page)).await?;
            projects.extend(body.projects);
            match body.meta.last_page {
                Some(last) if last > page => page += 1,
                _ => break,
            }
        }
        Ok(projects)
    }

    async fn list_devices(&self, project_id: &str) -> Result<Vec<Device>> {
        let path = format!("projects/{}/devices", project_id);
        let mut devices = Vec::new();
        let mut page = 1;
        loop {
            let body: DevicePage = self.get(&path, &Self::page_query(page)).await?;
            devices.extend(body.devices);
            match body.meta.last_page {
                Some(last) if last > page => page += 1,
                _ => break,
            }
        }
        debug!("Listed {} devices in project {}", devices.len(), project_id);
        Ok(devices)
    }

    async fn create_device(&self, request: &DeviceCreateRequest) -> Result<Device> {
        let path = format!("projects/{}/devices", request.project_id);
        self.post(&path, request).await
    }

    async fn list_ips(&self, project_id: &str) -> Result<Vec<IpAddress>> {
        let path = format!("projects/{}/ips", project_id);
        let body: IpAddressList = self.get(&path, &[]).await?;
        debug!("Listed {} IP reservations in project {}", body.ip_addresses.len(), project_id);
        Ok(body.ip_addresses)
    }
}
