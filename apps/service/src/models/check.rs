use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol used to reach a check's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// URL scheme for this protocol
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scheme())
    }
}

/// HTTP method a check probes with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Uppercased wire form, as sent on the request line
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reachability state of a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    /// A check that has never been evaluated starts down
    #[default]
    Down,
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// A user-registered endpoint-monitoring configuration.
///
/// Field names follow the stored JSON record schema shared with the CRUD
/// layer; `state` and `lastChecked` are the only fields the engine mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    /// Opaque 20-character identifier
    pub id: String,

    /// Owner reference: 10-digit phone number
    #[serde(rename = "userPhone")]
    pub user_phone: String,

    pub protocol: Protocol,

    /// Host plus optional path/query, without a scheme
    pub url: String,

    pub method: HttpMethod,

    /// Status codes considered "up"
    #[serde(rename = "successCodes")]
    pub success_codes: Vec<u16>,

    /// Probe timeout; valid range is 1 < value <= 5
    #[serde(rename = "timeoutSeconds")]
    pub timeout_seconds: u8,

    #[serde(default)]
    pub state: CheckState,

    /// Absent until the engine evaluates the check for the first time
    #[serde(
        rename = "lastChecked",
        with = "chrono::serde::ts_milliseconds_option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_checked: Option<DateTime<Utc>>,
}

impl Check {
    /// Full request target, e.g. `https://example.com/ping?x=1`
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol.scheme(), self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "abcdefghij0123456789",
            "userPhone": "5551234567",
            "protocol": "https",
            "url": "example.com/status",
            "method": "get",
            "successCodes": [200, 201],
            "timeoutSeconds": 3
        })
    }

    #[test]
    fn deserializes_record_with_defaults() {
        let check: Check = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(check.state, CheckState::Down);
        assert!(check.last_checked.is_none());
        assert_eq!(check.target(), "https://example.com/status");
    }

    #[test]
    fn last_checked_round_trips_as_epoch_millis() {
        let mut check: Check = serde_json::from_value(sample_json()).unwrap();
        check.last_checked = DateTime::from_timestamp_millis(1_700_000_000_000);

        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(value["lastChecked"], serde_json::json!(1_700_000_000_000u64));

        let back: Check = serde_json::from_value(value).unwrap();
        assert_eq!(back, check);
    }

    #[test]
    fn state_serializes_lowercase() {
        let mut check: Check = serde_json::from_value(sample_json()).unwrap();
        check.state = CheckState::Up;
        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(value["state"], "up");
    }
}
