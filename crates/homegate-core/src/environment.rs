// ── Execution environment ──
//
// Decides once, without I/O, whether this process can reach a LAN gateway
// at all and how aggressively to probe. Everything downstream consumes the
// verdict; nothing re-derives it.

use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString};
use tracing::debug;

use homegate_api::probe::DEFAULT_PROBE_TIMEOUT;

/// Environment variable that overrides the detected verdict.
pub const ENVIRONMENT_OVERRIDE_VAR: &str = "HOMEGATE_ENVIRONMENT";

/// Where the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Platform {
    /// Sandboxed browser: no raw access to LAN hosts.
    RestrictedBrowser,
    MobileNative,
    /// Simulator or emulator, usually behind a NAT of its own.
    Emulator,
    Unknown,
}

/// The classifier's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentVerdict {
    pub platform: Platform,
    /// Whether a local gateway can be reached in principle.
    pub local_network_reachable: bool,
    /// Human-readable explanation, surfaced verbatim in advice.
    pub reason: String,
}

impl EnvironmentVerdict {
    pub fn new(platform: Platform) -> Self {
        let (reachable, reason) = match platform {
            Platform::RestrictedBrowser => (
                false,
                "Running in a browser sandbox, which blocks requests to local network devices",
            ),
            Platform::Emulator => (
                true,
                "Running in an emulator; the gateway may only be reachable through the host network",
            ),
            Platform::MobileNative => (true, "Running as a native mobile app"),
            Platform::Unknown => (true, "Running on a desktop or server host"),
        };
        Self {
            platform,
            local_network_reachable: reachable,
            reason: reason.to_owned(),
        }
    }

    pub fn is_restricted(&self) -> bool {
        !self.local_network_reachable
    }

    /// Probe deadline suited to this environment.
    pub fn probe_timeout(&self) -> Duration {
        match self.platform {
            Platform::Emulator => DEFAULT_PROBE_TIMEOUT / 2,
            _ => DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Source of the environment verdict.
pub trait EnvironmentClassifier: Send + Sync {
    fn classify(&self) -> EnvironmentVerdict;
}

/// Classifies the real host from compile target and process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostEnvironment;

impl HostEnvironment {
    fn detect() -> Platform {
        if let Ok(raw) = std::env::var(ENVIRONMENT_OVERRIDE_VAR) {
            match raw.parse::<Platform>() {
                Ok(platform) => return platform,
                Err(_) => debug!(value = %raw, "ignoring unrecognised environment override"),
            }
        }

        if cfg!(target_family = "wasm") {
            return Platform::RestrictedBrowser;
        }

        let mobile = cfg!(any(target_os = "android", target_os = "ios"));
        let emulated = std::env::var_os("ANDROID_EMULATOR").is_some()
            || std::env::var_os("SIMULATOR_DEVICE_NAME").is_some();

        match (mobile, emulated) {
            (_, true) => Platform::Emulator,
            (true, false) => Platform::MobileNative,
            (false, false) => Platform::Unknown,
        }
    }
}

impl EnvironmentClassifier for HostEnvironment {
    fn classify(&self) -> EnvironmentVerdict {
        let verdict = EnvironmentVerdict::new(Self::detect());
        debug!(platform = %verdict.platform, reachable = verdict.local_network_reachable, "classified environment");
        verdict
    }
}

/// Always answers the same verdict. For tests and for hosts that know better.
#[derive(Debug, Clone)]
pub struct FixedEnvironment(pub EnvironmentVerdict);

impl FixedEnvironment {
    pub fn new(platform: Platform) -> Self {
        Self(EnvironmentVerdict::new(platform))
    }
}

impl EnvironmentClassifier for FixedEnvironment {
    fn classify(&self) -> EnvironmentVerdict {
        self.0.clone()
    }
}
