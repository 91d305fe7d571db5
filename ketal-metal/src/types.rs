//! Equinix Metal API resources (subset of fields ketal reads).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metro {
    pub id: String,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    pub id: String,
    pub name: String,
    pub code: String,
    pub metro: Option<Metro>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingSystem {
    pub name: String,
    pub slug: String,
    pub distro: String,
    pub version: String,
}

/// An IP address, either a project reservation or a device assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpAddress {
    pub id: String,
    pub address: String,
    /// 4 or 6.
    pub address_family: u8,
    pub public: bool,
    pub management: bool,
}

impl IpAddress {
    pub fn is_ipv4(&self) -> bool {
        self.address_family == 4
    }
}

/// A compute node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub id: String,
    pub hostname: String,
    pub state: String,
    pub plan: Option<Plan>,
    pub facility: Option<Facility>,
    pub metro: Option<Metro>,
    pub operating_system: Option<OperatingSystem>,
    pub ip_addresses: Vec<IpAddress>,
}

impl Device {
    /// First public IPv4 address assigned to the device.
    pub fn public_ipv4(&self) -> Option<&str> {
        self.ip_addresses
            .iter()
            .find(|ip| ip.public && ip.is_ipv4())
            .map(|ip| ip.address.as_str())
    }

    pub fn plan_name(&self) -> &str {
        self.plan.as_ref().map(|p| p.name.as_str()).unwrap_or_default()
    }

    /// Facility rendered as `name(code)`, empty when unknown.
    pub fn facility_label(&self) -> String {
        self.facility
            .as_ref()
            .map(|f| format!("{}({})", f.name, f.code))
            .unwrap_or_default()
    }

    /// Metro name, taken from the facility and falling back to the device.
    pub fn metro_name(&self) -> &str {
        self.facility
            .as_ref()
            .and_then(|f| f.metro.as_ref())
            .or(self.metro.as_ref())
            .map(|m| m.name.as_str())
            .unwrap_or_default()
    }

    pub fn os_distro(&self) -> &str {
        self.operating_system
            .as_ref()
            .map(|os| os.distro.as_str())
            .unwrap_or_default()
    }
}

/// Body of `POST /projects/{id}/devices`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCreateRequest {
    pub hostname: String,
    pub plan: String,
    pub facility: Vec<String>,
    pub operating_system: String,
    pub billing_cycle: String,
    pub project_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_device() -> Device {
        serde_json::from_value(json!({
            "id": "8f3c2a9e",
            "hostname": "node-1",
            "state": "active",
            "plan": {"id": "p1", "name": "c3.small.x86", "slug": "c3.small.x86"},
            "facility": {
                "name": "Amsterdam",
                "code": "am6",
                "metro": {"name": "Amsterdam", "code": "am"}
            },
            "operating_system": {"slug": "ubuntu_20_04", "distro": "ubuntu", "version": "20.04"},
            "ip_addresses": [
                {"id": "a", "address": "2604:1380::1", "address_family": 6, "public": true},
                {"id": "b", "address": "10.0.0.3", "address_family": 4, "public": false},
                {"id": "c", "address": "147.75.1.1", "address_family": 4, "public": true}
            ],
            "tags": ["ignored"]
        }))
        .unwrap()
    }

    #[test]
    fn test_device_accessors() {
        let device = sample_device();
        assert_eq!(device.public_ipv4(), Some("147.75.1.1"));
        assert_eq!(device.plan_name(), "c3.small.x86");
        assert_eq!(device.facility_label(), "Amsterdam(am6)");
        assert_eq!(device.metro_name(), "Amsterdam");
        assert_eq!(device.os_distro(), "ubuntu");
    }

    #[test]
    fn test_device_accessors_with_missing_fields() {
        let device = Device {
            id: "x".into(),
            hostname: "bare".into(),
            metro: Some(Metro {
                name: "Dallas".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(device.public_ipv4(), None);
        assert_eq!(device.plan_name(), "");
        assert_eq!(device.facility_label(), "");
        assert_eq!(device.metro_name(), "Dallas");
        assert_eq!(device.os_distro(), "");
    }
}
