// ── Fixture gateway ──
//
// An in-process stand-in for the gateway. Serves seeded devices, a fixed
// status, and deterministic traffic counters after a simulated latency.
// Block and unblock mutate the seeded records so a session feels live.

use std::net::Ipv4Addr;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use homegate_api::extract;

use crate::config::DEFAULT_FIXTURE_LATENCY;
use crate::error::CoreError;
use crate::live::RESTART_DOWNTIME_SECS;
use crate::model::{
    Addressing, Band, Device, LinkType, MacAddress, RestartOutcome, RouterStatus, TrafficData,
};
use crate::registry::DeviceRegistry;

/// Router and device services without a network.
#[derive(Debug)]
pub struct FixtureGateway {
    latency: Duration,
    registry: DeviceRegistry,
    status: RouterStatus,
}

impl Default for FixtureGateway {
    fn default() -> Self {
        Self::seeded(DEFAULT_FIXTURE_LATENCY)
    }
}

impl FixtureGateway {
    /// The built-in household of devices.
    pub fn seeded(latency: Duration) -> Self {
        Self::with_devices(seed_devices(), latency)
    }

    pub fn with_devices(devices: Vec<Device>, latency: Duration) -> Self {
        let registry = DeviceRegistry::new();
        registry.apply_refresh(devices);
        let online = registry.snapshot().iter().filter(|d| d.online).count();
        Self {
            latency,
            registry,
            status: seed_status(u32::try_from(online).unwrap_or(u32::MAX)),
        }
    }

    /// Seed from captured admin pages, run through the same extractors the
    /// live gateway uses. Without a status page every status field reads
    /// unknown.
    pub fn from_pages(devices_page: &str, status_page: Option<&str>, latency: Duration) -> Result<Self, CoreError> {
        let entries = extract::extract_devices(devices_page)?;
        let mut fixture = Self::with_devices(entries.into_iter().map(Device::from).collect(), latency);
        fixture.status = status_page.map_or_else(RouterStatus::unknown, |page| {
            extract::extract_status(page).into()
        });
        Ok(fixture)
    }

    pub fn with_status(mut self, status: RouterStatus) -> Self {
        self.status = status;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    pub async fn check_connection(&self) -> bool {
        self.pause().await;
        true
    }

    pub async fn authenticate(&self, _force: bool) -> bool {
        self.pause().await;
        true
    }

    pub async fn get_router_info(&self) -> RouterStatus {
        self.pause().await;
        self.status.clone()
    }

    pub async fn restart_router(&self) -> RestartOutcome {
        self.pause().await;
        debug!("fixture restart");
        RestartOutcome {
            success: true,
            message: "Restart initiated (mock)".into(),
            estimated_downtime_secs: Some(RESTART_DOWNTIME_SECS),
        }
    }

    /// All seeded devices, sorted by hostname.
    pub async fn get_devices(&self) -> Result<Vec<Device>, CoreError> {
        self.pause().await;
        Ok(self.registry.snapshot())
    }

    pub async fn block_device(&self, mac: &MacAddress) -> bool {
        self.pause().await;
        self.registry.set_blocked(mac, true)
    }

    pub async fn unblock_device(&self, mac: &MacAddress) -> bool {
        self.pause().await;
        self.registry.set_blocked(mac, false)
    }

    /// Counters derived from the MAC, stable across calls.
    pub async fn get_traffic_data(&self, mac: &MacAddress) -> Result<TrafficData, CoreError> {
        self.pause().await;
        if self.registry.get(mac).is_none() {
            return Err(CoreError::DeviceNotFound {
                mac: mac.to_string(),
            });
        }
        let seed = mac
            .as_str()
            .bytes()
            .fold(0_u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        let sent = (seed % 900 + 100) * 1_048_576;
        Ok(TrafficData {
            mac: mac.clone(),
            bytes_sent: sent,
            bytes_received: sent * 4 + (seed % 1_000_000),
            sampled_at: Utc::now(),
        })
    }
}

fn seed_status(connected: u32) -> RouterStatus {
    RouterStatus {
        status: "Active".into(),
        uptime: "3 days 4h:12m:09s".into(),
        connected_devices: connected,
        model: "TG1682G".into(),
        firmware: "9.1.103AL.2".into(),
        ssid: "HomeNet".into(),
    }
}

#[allow(clippy::too_many_arguments)]
fn device(
    mac: &str,
    hostname: &str,
    ip: [u8; 4],
    link: LinkType,
    band: Option<Band>,
    signal_dbm: Option<i32>,
    online: bool,
    custom_name: Option<&str>,
) -> Device {
    Device {
        mac: MacAddress::new(mac),
        hostname: hostname.into(),
        ipv4: Some(Ipv4Addr::from(ip)),
        ipv6: None,
        link,
        band,
        signal_dbm,
        addressing: Addressing::Dhcp,
        blocked: false,
        online,
        custom_name: custom_name.map(str::to_owned),
        last_seen: online.then(Utc::now),
    }
}

fn seed_devices() -> Vec<Device> {
    let mut tv = device(
        "3c:2a:f4:10:22:01",
        "living-room-tv",
        [10, 0, 0, 20],
        LinkType::Ethernet,
        None,
        None,
        true,
        Some("Streaming box & TV"),
    );
    tv.addressing = Addressing::Reserved;

    vec![
        device(
            "a4:83:e7:5c:10:9d",
            "Zeta-Phone",
            [10, 0, 0, 31],
            LinkType::Wifi,
            Some(Band::Ghz5),
            Some(-52),
            true,
            None,
        ),
        device(
            "f0:18:98:2b:44:c1",
            "Alpha-Laptop",
            [10, 0, 0, 12],
            LinkType::Wifi,
            Some(Band::Ghz5),
            Some(-61),
            true,
            None,
        ),
        tv,
        device(
            "b8:27:eb:9a:01:7e",
            "printer",
            [10, 0, 0, 40],
            LinkType::Wifi,
            Some(Band::Ghz2_4),
            Some(-70),
            true,
            None,
        ),
        device(
            "64:16:66:0c:3f:88",
            "thermostat",
            [10, 0, 0, 41],
            LinkType::Wifi,
            Some(Band::Ghz2_4),
            Some(-66),
            true,
            Some("Hallway thermostat"),
        ),
        device(
            "dc:a6:32:71:5e:02",
            "old-tablet",
            [10, 0, 0, 55],
            LinkType::Wifi,
            Some(Band::Ghz2_4),
            None,
            false,
            None,
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fixture() -> FixtureGateway {
        FixtureGateway::seeded(Duration::ZERO)
    }

    #[tokio::test]
    async fn devices_come_back_sorted() {
        let names: Vec<String> = fixture()
            .get_devices()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.hostname)
            .collect();
        assert_eq!(
            names,
            ["Alpha-Laptop", "living-room-tv", "old-tablet", "printer", "thermostat", "Zeta-Phone"]
        );
    }

    #[tokio::test]
    async fn block_mutates_the_seeded_record() {
        let fixture = fixture();
        let mac = MacAddress::new("A4-83-E7-5C-10-9D");

        assert!(fixture.block_device(&mac).await);
        let blocked = fixture.get_devices().await.unwrap();
        assert!(blocked.iter().any(|d| d.mac == mac && d.blocked));

        assert!(fixture.unblock_device(&mac).await);
        assert!(!fixture.block_device(&MacAddress::new("00:00:00:00:00:00")).await);
    }

    #[tokio::test]
    async fn traffic_is_stable_per_device() {
        let fixture = fixture();
        let mac = MacAddress::new("f0:18:98:2b:44:c1");
        let first = fixture.get_traffic_data(&mac).await.unwrap();
        let second = fixture.get_traffic_data(&mac).await.unwrap();
        assert_eq!(first.bytes_sent, second.bytes_sent);
        assert!(first.bytes_received > first.bytes_sent);

        let missing = fixture.get_traffic_data(&MacAddress::new("00:00:00:00:00:01")).await;
        assert!(matches!(missing, Err(CoreError::DeviceNotFound { .. })));
    }

    #[tokio::test]
    async fn status_counts_online_devices() {
        let status = fixture().get_router_info().await;
        assert_eq!(status.connected_devices, 5);
        assert_eq!(status.model, "TG1682G");
    }

    fn captured_devices_page(rows: &[(&str, &str)]) -> String {
        let body: String = rows
            .iter()
            .map(|(name, mac)| {
                format!(
                    r##"<tr><td headers="host-name"><a href="javascript:void(0)" class="label device-name">{name}</a>
<div class="device-info"><dl><dd><b>IPv4 Address</b>10.0.0.50</dd><dd><b>MAC Address</b>{mac}</dd></dl></div></td>
<td headers="dhcp">DHCP</td><td headers="connection">Wi-Fi 5G</td><td headers="rssi">-60 dBm</td>
<td headers="edit-device"><a href="#" class="btn block-device">Block</a></td></tr>"##
                )
            })
            .collect();
        format!(
            r#"<html><body><div id="online-private"><table>
<tr><th>Host Name</th><th>DHCP/Reserved IP</th><th>Connection Type</th><th>RSSI Level</th><th>&nbsp;</th></tr>
{body}
<tr class="table-footer"><td colspan="5">&nbsp;</td></tr>
</table></div></body></html>"#
        )
    }

    #[tokio::test]
    async fn captured_pages_serve_sorted_devices_and_unknown_status() {
        let page = captured_devices_page(&[
            ("Zeta-Phone", "AA:BB:CC:00:00:31"),
            ("Alpha-Laptop", "AA:BB:CC:00:00:05"),
        ]);
        let fixture = FixtureGateway::from_pages(&page, None, Duration::ZERO).unwrap();

        let names: Vec<String> = fixture
            .get_devices()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.hostname)
            .collect();
        assert_eq!(names, ["Alpha-Laptop", "Zeta-Phone"]);
        assert!(fixture.get_router_info().await.is_unknown());

        let mac = MacAddress::new("aa:bb:cc:00:00:31");
        assert!(fixture.block_device(&mac).await);
        assert!(fixture.get_devices().await.unwrap().iter().any(|d| d.mac == mac && d.blocked));
    }

    #[test]
    fn captured_page_without_device_table_is_rejected() {
        let result = FixtureGateway::from_pages("<html><body></body></html>", None, Duration::ZERO);
        assert!(matches!(result, Err(CoreError::StructuralParseFailure { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_wait_out_the_latency() {
        let fixture = FixtureGateway::seeded(Duration::from_millis(300));
        let started = tokio::time::Instant::now();
        assert!(fixture.check_connection().await);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
