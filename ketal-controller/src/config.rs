//! Provider credentials and engine settings.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::debug;

/// Environment variable holding the Equinix Metal API key.
pub const API_KEY_ENV: &str = "METAL_API_KEY";
/// Environment variable holding the Equinix Metal project ID.
pub const PROJECT_ID_ENV: &str = "METAL_PROJECT_ID";

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);
pub const DEFAULT_BILLING_CYCLE: &str = "hourly";
pub const DEFAULT_WATCH_RETRY: Duration = Duration::from_secs(5);

/// Provider config file as mounted from a secret.
#[derive(Debug, Default, Deserialize)]
struct ProviderFile {
    #[serde(rename = "apiKey", default)]
    api_key: String,
    #[serde(rename = "projectId", default)]
    project_id: String,
    #[serde(rename = "base-url", default)]
    base_url: Option<String>,
}

/// Credentials and endpoint for the Equinix Metal API.
#[derive(Clone)]
pub struct MetalConfig {
    pub auth_token: String,
    pub project_id: String,
    /// Override of the public API endpoint.
    pub base_url: Option<String>,
}

impl fmt::Debug for MetalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetalConfig")
            .field("auth_token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl MetalConfig {
    /// Load from the config file at `path` and the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::resolve(Some(path), |name| std::env::var(name).ok())
    }

    /// Merge the config file with environment values; non-empty environment
    /// values win. A missing file is not an error as long as the environment
    /// supplies both values.
    pub fn resolve(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = match path {
            Some(path) => read_provider_file(path)?,
            None => ProviderFile::default(),
        };

        let auth_token = env(API_KEY_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or(file.api_key);
        let project_id = env(PROJECT_ID_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or(file.project_id);

        if auth_token.is_empty() {
            bail!(
                "no Equinix Metal API key: set {} or apiKey in the provider config",
                API_KEY_ENV
            );
        }
        if project_id.is_empty() {
            bail!(
                "no Equinix Metal project: set {} or projectId in the provider config",
                PROJECT_ID_ENV
            );
        }

        Ok(Self {
            auth_token,
            project_id,
            base_url: file.base_url.filter(|u| !u.is_empty()),
        })
    }
}

fn read_provider_file(path: &Path) -> Result<ProviderFile> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).with_context(|| {
            format!(
                "failed to process json of configuration file at path {}",
                path.display()
            )
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No provider config at {}, using environment only", path.display());
            Ok(ProviderFile::default())
        }
        Err(e) => Err(e).with_context(|| {
            format!("failed to read configuration file at path {}", path.display())
        }),
    }
}

/// Settings shared by the poller and the reconcilers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub project_id: String,
    /// Namespace all records live in.
    pub namespace: String,
    pub poll_interval: Duration,
    /// Upper bound of the poll delay while the provider API keeps failing.
    pub max_backoff: Duration,
    /// Billing cycle for devices whose record does not name one.
    pub billing_cycle: String,
    /// Delay before re-opening a failed watch.
    pub watch_retry: Duration,
}

impl EngineConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
            billing_cycle: DEFAULT_BILLING_CYCLE.to_string(),
            watch_retry: DEFAULT_WATCH_RETRY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_values_used_without_env() {
        let file = config_file(
            r#"{"apiKey": "file-key", "projectId": "file-project", "base-url": "https://metal.example/v1/"}"#,
        );
        let config = MetalConfig::resolve(Some(file.path()), env_of(&[])).unwrap();
        assert_eq!(config.auth_token, "file-key");
        assert_eq!(config.project_id, "file-project");
        assert_eq!(config.base_url.as_deref(), Some("https://metal.example/v1/"));
    }

    #[test]
    fn test_env_takes_precedence() {
        let file = config_file(r#"{"apiKey": "file-key", "projectId": "file-project"}"#);
        let env = env_of(&[(API_KEY_ENV, "env-key"), (PROJECT_ID_ENV, "")]);
        let config = MetalConfig::resolve(Some(file.path()), env).unwrap();
        assert_eq!(config.auth_token, "env-key");
        // Empty env values fall back to the file.
        assert_eq!(config.project_id, "file-project");
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn test_missing_file_uses_env_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud-sa.json");
        let env = env_of(&[(API_KEY_ENV, "env-key"), (PROJECT_ID_ENV, "env-project")]);
        let config = MetalConfig::resolve(Some(&path), env).unwrap();
        assert_eq!(config.project_id, "env-project");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let err = MetalConfig::resolve(None, env_of(&[(PROJECT_ID_ENV, "p")])).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));

        let err = MetalConfig::resolve(None, env_of(&[(API_KEY_ENV, "k")])).unwrap_err();
        assert!(err.to_string().contains(PROJECT_ID_ENV));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let file = config_file("not json");
        let err = MetalConfig::resolve(Some(file.path()), env_of(&[])).unwrap_err();
        assert!(err.to_string().contains("failed to process json"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = MetalConfig {
            auth_token: "super-secret".into(),
            project_id: "p".into(),
            base_url: None,
        };
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
