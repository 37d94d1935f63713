// Connected-device endpoints
//
// Device listing, traffic counters and the block/unblock action.

use tracing::debug;

use super::client::GatewayClient;
use super::{DEVICES_PATH, MANAGED_DEVICES_PATH, TRAFFIC_PATH};
use crate::error::Error;
use crate::extract;
use crate::models::{DeviceEntry, TrafficEntry};

impl GatewayClient {
    /// List online and offline devices.
    ///
    /// `GET /connected_devices_computers.jst`
    pub async fn list_devices(&self) -> Result<Vec<DeviceEntry>, Error> {
        debug!("listing connected devices");
        let body = self.fetch_protected(DEVICES_PATH).await?;
        extract::extract_devices(&body)
    }

    /// Block or unblock a device by MAC.
    ///
    /// `POST /actionHandler/ajax_managed_devices.jst` with
    /// `action=block|unblock` and `mac`. Returns whether the gateway
    /// accepted the action; the new state is not re-read.
    pub async fn set_device_blocked(&self, mac: &str, blocked: bool) -> Result<bool, Error> {
        let action = if blocked { "block" } else { "unblock" };
        debug!(mac, action, "managing device");
        self.post_action(MANAGED_DEVICES_PATH, &[("action", action), ("mac", mac)])
            .await
    }

    /// Per-device traffic counters.
    ///
    /// `GET /network_traffic.jst`
    pub async fn traffic(&self) -> Result<Vec<TrafficEntry>, Error> {
        debug!("fetching traffic counters");
        let body = self.fetch_protected(TRAFFIC_PATH).await?;
        extract::extract_traffic(&body)
    }
}
