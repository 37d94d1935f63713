// ── Scheduled blocking ──
//
// Daily time windows during which a device is kept off the network. The
// windows live in the persisted store under `SCHEDULE_KEY`; enforcing them
// compares every scheduled device's wanted state with what the gateway
// reports and blocks or unblocks the difference.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use homegate_api::KeyValueStore;

use crate::error::CoreError;
use crate::model::MacAddress;
use crate::service::DeviceService;

/// Key under which the block schedule is persisted.
pub const SCHEDULE_KEY: &str = "block.schedule";

/// One daily window. A window whose end is not after its start runs past
/// midnight and closes on the following day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Days the window opens on. Empty means every day.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<Weekday>,
}

impl BlockWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, CoreError> {
        if start == end {
            return Err(CoreError::Config {
                message: format!("block window {start} to {end} is empty"),
            });
        }
        Ok(Self {
            start,
            end,
            days: Vec::new(),
        })
    }

    /// Restrict the window to the given opening days.
    pub fn on_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days = days.into_iter().collect();
        self.days.sort_by_key(|day| day.num_days_from_monday());
        self.days.dedup();
        self
    }

    pub fn overnight(&self) -> bool {
        self.end < self.start
    }

    fn opens_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    /// Whether `at` (local wall-clock time) falls inside the window.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        let today = at.weekday();
        if self.overnight() {
            (self.opens_on(today) && time >= self.start)
                || (self.opens_on(today.pred()) && time < self.end)
        } else {
            self.opens_on(today) && time >= self.start && time < self.end
        }
    }
}

impl fmt::Display for BlockWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))?;
        if !self.days.is_empty() {
            let days: Vec<String> = self.days.iter().map(ToString::to_string).collect();
            write!(f, " ({})", days.join(","))?;
        }
        Ok(())
    }
}

/// Every scheduled device and its windows, keyed by MAC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockSchedule {
    devices: BTreeMap<MacAddress, Vec<BlockWindow>>,
}

impl BlockSchedule {
    /// Read the schedule from `store`. A missing entry is an empty schedule.
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, CoreError> {
        match store.get(SCHEDULE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| CoreError::Internal(format!("block schedule is unreadable: {e}"))),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), CoreError> {
        if self.is_empty() {
            store.remove(SCHEDULE_KEY)?;
            return Ok(());
        }
        let raw = serde_json::to_string(self)
            .map_err(|e| CoreError::Internal(format!("block schedule: {e}")))?;
        store.set(SCHEDULE_KEY, &raw)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Add a window for `mac`. An identical window is not added twice.
    pub fn add(&mut self, mac: MacAddress, window: BlockWindow) {
        let windows = self.devices.entry(mac).or_default();
        if !windows.contains(&window) {
            windows.push(window);
        }
    }

    /// Drop every window for `mac`. `false` if it had none.
    pub fn remove(&mut self, mac: &MacAddress) -> bool {
        self.devices.remove(mac).is_some()
    }

    pub fn windows(&self, mac: &MacAddress) -> &[BlockWindow] {
        self.devices.get(mac).map_or(&[][..], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MacAddress, &[BlockWindow])> {
        self.devices.iter().map(|(mac, windows)| (mac, windows.as_slice()))
    }

    /// Wanted block state for `mac` at `at`; `None` for unscheduled devices.
    pub fn wants_blocked(&self, mac: &MacAddress, at: NaiveDateTime) -> Option<bool> {
        self.devices
            .get(mac)
            .map(|windows| windows.iter().any(|w| w.contains(at)))
    }
}

/// A block state change made while enforcing the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledChange {
    pub mac: MacAddress,
    pub blocked: bool,
    /// The gateway accepted the change.
    pub applied: bool,
}

/// Reads, edits and enforces the persisted block schedule.
#[derive(Clone)]
pub struct BlockScheduler {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for BlockScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockScheduler").finish_non_exhaustive()
    }
}

impl BlockScheduler {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn schedule(&self) -> Result<BlockSchedule, CoreError> {
        BlockSchedule::load(&*self.store)
    }

    pub fn add_window(&self, mac: MacAddress, window: BlockWindow) -> Result<(), CoreError> {
        let mut schedule = self.schedule()?;
        debug!(%mac, %window, "adding block window");
        schedule.add(mac, window);
        schedule.save(&*self.store)
    }

    /// Remove every window for `mac`. `Ok(false)` if it had none.
    pub fn clear(&self, mac: &MacAddress) -> Result<bool, CoreError> {
        let mut schedule = self.schedule()?;
        if !schedule.remove(mac) {
            return Ok(false);
        }
        schedule.save(&*self.store)?;
        Ok(true)
    }

    /// Bring every scheduled device to its wanted state at `at`.
    ///
    /// Devices the gateway does not list are skipped and devices already in
    /// the wanted state are left alone. A scheduled device blocked by hand
    /// outside its windows is unblocked.
    pub async fn apply<S>(&self, service: &S, at: NaiveDateTime) -> Result<Vec<ScheduledChange>, CoreError>
    where
        S: DeviceService + ?Sized,
    {
        let schedule = self.schedule()?;
        if schedule.is_empty() {
            return Ok(Vec::new());
        }

        let devices = service.get_devices().await?;
        let mut changes = Vec::new();
        for (mac, windows) in schedule.iter() {
            let Some(device) = devices.iter().find(|d| &d.mac == mac) else {
                debug!(%mac, "scheduled device not on the gateway");
                continue;
            };
            let wanted = windows.iter().any(|w| w.contains(at));
            if device.blocked == wanted {
                continue;
            }

            let applied = if wanted {
                service.block_device(mac).await
            } else {
                service.unblock_device(mac).await
            };
            if applied {
                info!(%mac, blocked = wanted, "block schedule applied");
            } else {
                warn!(%mac, blocked = wanted, "gateway did not accept scheduled change");
            }
            changes.push(ScheduledChange {
                mac: mac.clone(),
                blocked: wanted,
                applied,
            });
        }
        Ok(changes)
    }

    /// Enforce the schedule against local time every `every` until
    /// `cancel` fires. Failed rounds are logged and retried on the next tick.
    pub async fn run<S>(&self, service: &S, every: Duration, cancel: &CancellationToken)
    where
        S: DeviceService + ?Sized,
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("block scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.apply(service, Local::now().naive_local()).await {
                        warn!(error = %e, "block schedule round failed");
                    }
                }
            }
        }
    }
}
