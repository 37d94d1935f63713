// ── Device registry ──
//
// Every device ever seen, keyed by MAC. A refresh upserts what the gateway
// listed and marks the rest offline; records are never removed.

use dashmap::DashMap;
use tracing::debug;

use crate::model::{Device, MacAddress, sort_by_hostname};

/// Concurrent device store keyed by normalized MAC.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: DashMap<MacAddress, Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fresh device list. Devices missing from `fresh` stay, marked
    /// offline. Returns how many devices were new.
    pub fn apply_refresh(&self, fresh: Vec<Device>) -> usize {
        let mut added = 0;
        let seen: std::collections::HashSet<MacAddress> =
            fresh.iter().map(|d| d.mac.clone()).collect();

        for device in fresh {
            if self.devices.insert(device.mac.clone(), device).is_none() {
                added += 1;
            }
        }

        let mut went_offline = 0;
        for mut entry in self.devices.iter_mut() {
            if !seen.contains(entry.key()) && entry.online {
                entry.online = false;
                went_offline += 1;
            }
        }

        debug!(added, went_offline, total = self.devices.len(), "device registry refreshed");
        added
    }

    /// Flip the blocked flag in place. `false` if the device is unknown.
    pub fn set_blocked(&self, mac: &MacAddress, blocked: bool) -> bool {
        self.devices
            .get_mut(mac)
            .map(|mut device| device.blocked = blocked)
            .is_some()
    }

    pub fn get(&self, mac: &MacAddress) -> Option<Device> {
        self.devices.get(mac).map(|d| d.clone())
    }

    /// All devices, sorted by hostname then MAC.
    pub fn snapshot(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.iter().map(|d| d.value().clone()).collect();
        sort_by_hostname(&mut devices);
        devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
