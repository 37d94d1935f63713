// Raw records scraped from the gateway admin pages.
//
// Field values are kept close to what the page shows; `homegate-core`
// converts them into the canonical domain types.

use serde::{Deserialize, Serialize};

/// One row of the connected-devices table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub mac: String,
    pub hostname: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    /// `DHCP` or `Reserved IP` as printed by the gateway.
    pub addressing: Option<String>,
    /// Connection column, e.g. `Ethernet` or `Wi-Fi 5G`.
    pub connection: Option<String>,
    /// RSSI in dBm, absent for wired devices (`NA`).
    pub rssi_dbm: Option<i32>,
    pub blocked: bool,
    pub online: bool,
    /// Free-form comment the owner attached to the device.
    pub comment: Option<String>,
}

/// Labeled fields of the network-setup page.
///
/// Every field is optional on the page; missing text fields read `"Unknown"`
/// and a missing count reads `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFields {
    pub internet: String,
    pub uptime: String,
    pub connected_devices: u32,
    pub model: String,
    pub firmware: String,
    pub ssid: String,
}

impl Default for StatusFields {
    fn default() -> Self {
        Self {
            internet: UNKNOWN.into(),
            uptime: UNKNOWN.into(),
            connected_devices: 0,
            model: UNKNOWN.into(),
            firmware: UNKNOWN.into(),
            ssid: UNKNOWN.into(),
        }
    }
}

/// Placeholder for fields the page did not provide.
pub const UNKNOWN: &str = "Unknown";

/// Per-device byte counters from the traffic page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficEntry {
    pub mac: String,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}
