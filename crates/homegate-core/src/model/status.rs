// ── Gateway status and operation outcomes ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mac::MacAddress;

const UNKNOWN: &str = "Unknown";

/// Facts from the gateway's status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStatus {
    pub status: String,
    pub uptime: String,
    pub connected_devices: u32,
    pub model: String,
    pub firmware: String,
    pub ssid: String,
}

impl RouterStatus {
    /// Every field unknown. Returned instead of an error so callers never
    /// have to special-case a missing status.
    pub fn unknown() -> Self {
        Self {
            status: UNKNOWN.into(),
            uptime: UNKNOWN.into(),
            connected_devices: 0,
            model: UNKNOWN.into(),
            firmware: UNKNOWN.into(),
            ssid: UNKNOWN.into(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

impl Default for RouterStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Byte counters for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficData {
    pub mac: MacAddress,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub sampled_at: DateTime<Utc>,
}

/// Result of a restart request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_downtime_secs: Option<u64>,
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub message: String,
}

impl LoginOutcome {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: "Logged in".into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
