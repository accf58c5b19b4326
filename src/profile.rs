/// Device profile returned by WURFL Cloud
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Response fields that change on every server deploy/restart.
///
/// They are removed before a profile is cached or returned so cached
/// entries compare equal across deploys.
pub const VOLATILE_FIELDS: [&str; 2] = ["apiVersion", "mtime"];

/// A single capability value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl CapabilityValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CapabilityValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CapabilityValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CapabilityValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

impl From<bool> for CapabilityValue {
    fn from(value: bool) -> Self {
        CapabilityValue::Bool(value)
    }
}

impl From<&str> for CapabilityValue {
    fn from(value: &str) -> Self {
        CapabilityValue::Text(value.to_string())
    }
}

impl From<i64> for CapabilityValue {
    fn from(value: i64) -> Self {
        CapabilityValue::Number(value.into())
    }
}

pub type Capabilities = BTreeMap<String, CapabilityValue>;

/// Normalized detection result for one User-Agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// WURFL device identifier
    pub id: String,
    pub capabilities: Capabilities,
    /// Per-capability errors reported by the service, passed through as-is
    pub errors: BTreeMap<String, String>,
}

impl DeviceProfile {
    /// Parse a success body, dropping the volatile fields first
    pub fn from_response_body(body: &str) -> Result<Self, serde_json::Error> {
        let mut object: Map<String, Value> = serde_json::from_str(body)?;
        for field in VOLATILE_FIELDS {
            object.remove(field);
        }
        serde_json::from_value(Value::Object(object))
    }

    pub fn capability(&self, name: &str) -> Option<&CapabilityValue> {
        self.capabilities.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
        "apiVersion": "WurflCloud 1.5.0.2",
        "mtime": 1403122184,
        "id": "generic_ms_phone_os7_5",
        "capabilities": {
            "is_wireless_device": true,
            "mobile_browser": "IEMobile",
            "pointing_method": "touchscreen",
            "device_os": "Windows Phone OS",
            "resolution_width": 480
        },
        "errors": {}
    }"#;

    #[test]
    fn test_strips_volatile_fields() {
        let profile = DeviceProfile::from_response_body(REPLY).unwrap();
        assert_eq!(profile.id, "generic_ms_phone_os7_5");

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("apiVersion").is_none());
        assert!(json.get("mtime").is_none());
    }

    #[test]
    fn test_capability_types() {
        let profile = DeviceProfile::from_response_body(REPLY).unwrap();
        assert_eq!(profile.capability("is_wireless_device").and_then(|c| c.as_bool()), Some(true));
        assert_eq!(
            profile.capability("mobile_browser").and_then(|c| c.as_str()),
            Some("IEMobile")
        );
        assert_eq!(profile.capability("resolution_width").and_then(|c| c.as_i64()), Some(480));
        assert!(profile.capability("unknown").is_none());
    }

    #[test]
    fn test_empty_object_is_valid() {
        let profile = DeviceProfile::from_response_body("{}").unwrap();
        assert_eq!(profile, DeviceProfile::default());
    }

    #[test]
    fn test_errors_are_opaque() {
        let profile = DeviceProfile::from_response_body(
            r#"{"id":"generic","capabilities":{},"errors":{"brand_name":"not permitted"}}"#,
        )
        .unwrap();
        assert_eq!(profile.errors.get("brand_name").map(String::as_str), Some("not permitted"));
    }

    #[test]
    fn test_rejects_truncated_and_non_object_bodies() {
        assert!(DeviceProfile::from_response_body(r#"{"foo"#).is_err());
        assert!(DeviceProfile::from_response_body("[1, 2]").is_err());
        assert!(DeviceProfile::from_response_body("\"text\"").is_err());
    }
}
