// ── Device domain types ──

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::mac::MacAddress;

/// Physical link a device uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum LinkType {
    Ethernet,
    #[strum(serialize = "Wi-Fi")]
    Wifi,
    #[strum(serialize = "MoCA")]
    Moca,
    Unknown,
}

/// Wi-Fi band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Band {
    #[strum(serialize = "2.4GHz")]
    #[serde(rename = "2.4GHz")]
    Ghz2_4,
    #[strum(serialize = "5GHz")]
    #[serde(rename = "5GHz")]
    Ghz5,
    #[strum(serialize = "6GHz")]
    #[serde(rename = "6GHz")]
    Ghz6,
}

/// How the device got its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Addressing {
    #[strum(serialize = "DHCP")]
    Dhcp,
    #[strum(serialize = "Reserved")]
    Reserved,
}

/// A device known to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub mac: MacAddress,
    pub hostname: String,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub link: LinkType,
    pub band: Option<Band>,
    /// Signal strength in dBm, wireless only.
    pub signal_dbm: Option<i32>,
    pub addressing: Addressing,
    pub blocked: bool,
    pub online: bool,
    /// Owner-assigned name.
    pub custom_name: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    /// Custom name if set, hostname otherwise.
    pub fn display_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or(&self.hostname)
    }
}

/// Sort by hostname ignoring case, MAC breaking ties.
pub fn sort_by_hostname(devices: &mut [Device]) {
    devices.sort_by(|a, b| {
        a.hostname
            .to_lowercase()
            .cmp(&b.hostname.to_lowercase())
            .then_with(|| a.mac.cmp(&b.mac))
    });
}
