//! Record types stored under the `ketal.equinix.metal/v1` API group.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// API group of all ketal records.
pub const GROUP: &str = "ketal.equinix.metal";
/// API version of all ketal records.
pub const VERSION: &str = "v1";
/// `apiVersion` field value written on every record.
pub const API_VERSION: &str = "ketal.equinix.metal/v1";

/// Metadata common to every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<String>,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }
}

/// A named record kind that can live in a [`RecordStore`](crate::RecordStore).
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Value of the `kind` field.
    const KIND: &'static str;
    /// Plural resource name used in API paths.
    const PLURAL: &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Record name, which is also its identity key.
    fn name(&self) -> &str {
        &self.meta().name
    }

    /// True once deletion of the record has been requested.
    fn is_deleting(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }
}

fn api_version() -> String {
    API_VERSION.to_string()
}

fn device_kind() -> String {
    Device::KIND.to_string()
}

fn eip_kind() -> String {
    Eip::KIND.to_string()
}

// =============================================================================
// Device
// =============================================================================

/// Desired/observed attributes of an Equinix Metal device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceSpec {
    /// Hostname of the device; matches the record name.
    pub hostname: String,
    /// Equinix Metal device ID.
    pub uuid: String,
    /// Plan name (e.g. `c3.small.x86`).
    pub device_type: String,
    /// Primary public IPv4 address.
    pub address: String,
    /// Facility, formatted as `name(code)` when mirrored from the provider.
    pub facility: String,
    pub metro: String,
    /// Operating system distro (or slug when provisioning).
    pub os: String,
    /// Billing cycle used when provisioning this device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {}

/// Device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "device_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DeviceSpec,
    #[serde(default)]
    pub status: DeviceStatus,
}

impl Device {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: DeviceSpec) -> Self {
        Self {
            api_version: api_version(),
            kind: device_kind(),
            metadata: ObjectMeta::new(name, namespace),
            spec,
            status: DeviceStatus::default(),
        }
    }
}

impl Resource for Device {
    const KIND: &'static str = "Device";
    const PLURAL: &'static str = "devices";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

// =============================================================================
// Elastic IP
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EipSpec {
    /// Equinix Metal IP reservation ID.
    pub uuid: String,
    /// The external address of the EIP.
    pub address: String,
    /// Whether this is a public or private EIP.
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EipStatus {}

/// Elastic IP record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "eip_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: EipSpec,
    #[serde(default)]
    pub status: EipStatus,
}

impl Eip {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, spec: EipSpec) -> Self {
        Self {
            api_version: api_version(),
            kind: eip_kind(),
            metadata: ObjectMeta::new(name, namespace),
            spec,
            status: EipStatus::default(),
        }
    }
}

impl Resource for Eip {
    const KIND: &'static str = "Eip";
    const PLURAL: &'static str = "eips";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_serializes_camel_case() {
        let device = Device::new(
            "node-1",
            "default",
            DeviceSpec {
                hostname: "node-1".to_string(),
                uuid: "abc".to_string(),
                device_type: "c3.small.x86".to_string(),
                address: "147.75.1.1".to_string(),
                facility: "Amsterdam(am6)".to_string(),
                metro: "Amsterdam".to_string(),
                os: "ubuntu".to_string(),
                billing_cycle: None,
            },
        );

        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["apiVersion"], "ketal.equinix.metal/v1");
        assert_eq!(value["kind"], "Device");
        assert_eq!(value["metadata"]["name"], "node-1");
        assert_eq!(value["metadata"]["namespace"], "default");
        assert!(value["metadata"].get("uid").is_none());
        assert_eq!(value["spec"]["deviceType"], "c3.small.x86");
        assert!(value["spec"].get("billingCycle").is_none());
    }

    #[test]
    fn test_deserialize_tolerates_unknown_fields() {
        let value = json!({
            "apiVersion": "ketal.equinix.metal/v1",
            "kind": "Eip",
            "metadata": {
                "name": "147.75.1.2",
                "namespace": "default",
                "labels": {"team": "infra"},
                "deletionTimestamp": "2021-05-01T00:00:00Z"
            },
            "spec": {"address": "147.75.1.2", "public": true}
        });

        let eip: Eip = serde_json::from_value(value).unwrap();
        assert_eq!(eip.name(), "147.75.1.2");
        assert!(eip.spec.public);
        assert!(eip.spec.uuid.is_empty());
        assert!(eip.is_deleting());
    }
}
