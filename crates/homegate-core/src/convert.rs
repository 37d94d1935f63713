// ── API-to-domain type conversions ──
//
// Bridges raw `homegate_api` records into canonical `homegate_core::model`
// types. Each `From` impl parses the page's strings into strong types and
// fills sensible defaults for anything the page left out.

use chrono::Utc;

use homegate_api::models::{DeviceEntry, StatusFields, TrafficEntry};

use crate::model::{Addressing, Band, Device, LinkType, MacAddress, RouterStatus, TrafficData};

// ── Helpers ────────────────────────────────────────────────────────

/// Parse an optional string into an address, silently dropping bad values.
fn parse_addr<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|s| s.trim().parse().ok())
}

/// Link type and band from the connection column (`Ethernet`, `Wi-Fi 5G`,
/// `MoCA`, ...).
fn classify_connection(raw: Option<&str>) -> (LinkType, Option<Band>) {
    let Some(raw) = raw else {
        return (LinkType::Unknown, None);
    };
    let lower = raw.to_ascii_lowercase();

    if lower.contains("ethernet") || lower.contains("wired") {
        (LinkType::Ethernet, None)
    } else if lower.contains("moca") {
        (LinkType::Moca, None)
    } else if lower.contains("wi-fi") || lower.contains("wifi") || lower.contains("wireless") {
        let band = if lower.contains("2.4") {
            Some(Band::Ghz2_4)
        } else if lower.contains("6g") {
            Some(Band::Ghz6)
        } else if lower.contains("5g") || lower.contains("5 g") {
            Some(Band::Ghz5)
        } else {
            None
        };
        (LinkType::Wifi, band)
    } else {
        (LinkType::Unknown, None)
    }
}

fn classify_addressing(raw: Option<&str>) -> Addressing {
    match raw {
        Some(s) if s.to_ascii_lowercase().contains("reserved") => Addressing::Reserved,
        _ => Addressing::Dhcp,
    }
}

// ── Device ─────────────────────────────────────────────────────────

impl From<DeviceEntry> for Device {
    fn from(entry: DeviceEntry) -> Self {
        let (link, band) = classify_connection(entry.connection.as_deref());
        let online = entry.online;
        Self {
            mac: MacAddress::new(&entry.mac),
            hostname: entry.hostname,
            ipv4: parse_addr(entry.ipv4.as_deref()),
            ipv6: parse_addr(entry.ipv6.as_deref()),
            link,
            band,
            signal_dbm: entry.rssi_dbm.filter(|_| link == LinkType::Wifi),
            addressing: classify_addressing(entry.addressing.as_deref()),
            blocked: entry.blocked,
            online,
            custom_name: entry.comment,
            last_seen: online.then(Utc::now),
        }
    }
}

// ── Status ─────────────────────────────────────────────────────────

impl From<StatusFields> for RouterStatus {
    fn from(fields: StatusFields) -> Self {
        Self {
            status: fields.internet,
            uptime: fields.uptime,
            connected_devices: fields.connected_devices,
            model: fields.model,
            firmware: fields.firmware,
            ssid: fields.ssid,
        }
    }
}

// ── Traffic ────────────────────────────────────────────────────────

impl From<TrafficEntry> for TrafficData {
    fn from(entry: TrafficEntry) -> Self {
        Self {
            mac: MacAddress::new(&entry.mac),
            bytes_sent: entry.bytes_sent,
            bytes_received: entry.bytes_received,
            sampled_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(connection: &str) -> DeviceEntry {
        DeviceEntry {
            mac: "AA-BB-CC-00-00-01".into(),
            hostname: "phone".into(),
            ipv4: Some("10.0.0.7".into()),
            ipv6: Some("not an address".into()),
            addressing: Some("Reserved IP".into()),
            connection: Some(connection.into()),
            rssi_dbm: Some(-60),
            blocked: false,
            online: true,
            comment: None,
        }
    }

    #[test]
    fn wireless_entry_converts() {
        let device = Device::from(entry("Wi-Fi 5G"));
        assert_eq!(device.mac.as_str(), "aa:bb:cc:00:00:01");
        assert_eq!(device.link, LinkType::Wifi);
        assert_eq!(device.band, Some(Band::Ghz5));
        assert_eq!(device.signal_dbm, Some(-60));
        assert_eq!(device.addressing, Addressing::Reserved);
        assert_eq!(device.ipv4, Some(std::net::Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(device.ipv6, None);
    }

    #[test]
    fn wired_entry_drops_signal() {
        let device = Device::from(entry("Ethernet"));
        assert_eq!(device.link, LinkType::Ethernet);
        assert_eq!(device.band, None);
        assert_eq!(device.signal_dbm, None);
    }

    #[test]
    fn band_detection() {
        assert_eq!(classify_connection(Some("Wi-Fi 2.4G")).1, Some(Band::Ghz2_4));
        assert_eq!(classify_connection(Some("Wi-Fi 6G")).1, Some(Band::Ghz6));
        assert_eq!(classify_connection(Some("MoCA")).0, LinkType::Moca);
        assert_eq!(classify_connection(None).0, LinkType::Unknown);
    }
}
