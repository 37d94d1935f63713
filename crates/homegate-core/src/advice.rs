// ── Connection advice ──
//
// Explains to a human why a live connection is or is not possible and what
// to try next. Derived on demand, never persisted.

use serde::Serialize;

use homegate_api::ProbeError;

use crate::environment::{EnvironmentVerdict, Platform};
use crate::error::CoreError;

/// Whether a live connection is possible, and what to do if not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionAdvice {
    pub can_connect: bool,
    pub reason: String,
    pub suggestions: Vec<String>,
}

impl ConnectionAdvice {
    pub fn connected(address: &str) -> Self {
        Self {
            can_connect: true,
            reason: format!("Gateway reachable at {address}"),
            suggestions: Vec::new(),
        }
    }

    /// Advice from the environment verdict alone, before any network I/O.
    pub fn from_environment(verdict: &EnvironmentVerdict) -> Self {
        let suggestions = match verdict.platform {
            Platform::RestrictedBrowser => vec![
                "Run homegate natively on a machine on the same network as the gateway".into(),
                "Use mock mode to explore the interface without a gateway".into(),
            ],
            Platform::Emulator => vec![
                "Make sure the emulator shares the host's network".into(),
                "Set the gateway address explicitly instead of relying on discovery".into(),
            ],
            Platform::MobileNative | Platform::Unknown => Vec::new(),
        };
        Self {
            can_connect: verdict.local_network_reachable,
            reason: verdict.reason.clone(),
            suggestions,
        }
    }

    /// Advice after discovery found nothing. `last_probe` is the failure tag
    /// of the configured address, if it was probed.
    pub fn unreachable(verdict: &EnvironmentVerdict, last_probe: Option<ProbeError>) -> Self {
        let detail = match last_probe {
            Some(ProbeError::Refused) => "the configured address refused the connection",
            Some(ProbeError::Timeout) => "the configured address did not answer in time",
            Some(ProbeError::Dns) => "the configured host name did not resolve",
            Some(ProbeError::Blocked) => "the runtime blocked the request",
            Some(ProbeError::Other) | None => "no gateway answered",
        };
        let mut suggestions = vec![
            "Check that this device is connected to the gateway's network".to_owned(),
            "Verify the gateway address in the configuration".to_owned(),
        ];
        if verdict.platform == Platform::Emulator {
            suggestions.push("Emulators often need the host's LAN address instead of 10.0.0.1".into());
        }
        suggestions.push("Use mock mode to keep working offline".into());

        Self {
            can_connect: false,
            reason: format!("Gateway not found: {detail}"),
            suggestions,
        }
    }

    /// Advice for an error raised by a live call.
    pub fn from_error(err: &CoreError) -> Self {
        let (reason, suggestions): (String, Vec<String>) = match err {
            CoreError::AuthenticationFailed { message } => (
                format!("The gateway rejected the login: {message}"),
                vec!["Check the username and password".into()],
            ),
            CoreError::SessionExpired => (
                "The gateway session expired".into(),
                vec!["Log in again".into()],
            ),
            CoreError::StructuralParseFailure { .. } => (
                err.to_string(),
                vec!["The gateway firmware may not be supported".into()],
            ),
            CoreError::EnvironmentRestricted { reason } => (
                reason.clone(),
                vec!["Use mock mode to keep working offline".into()],
            ),
            CoreError::GatewayHttp { status } if *status >= 500 => (
                format!("The gateway is reachable but failing (HTTP {status})"),
                vec!["Wait a minute and try again, or restart the gateway".into()],
            ),
            CoreError::GatewayHttp { status } => (
                format!("The gateway refused the request (HTTP {status})"),
                vec!["The gateway firmware may not support this page".into()],
            ),
            _ => (
                err.to_string(),
                vec!["Check that the gateway is powered on and reachable".into()],
            ),
        };
        Self {
            can_connect: false,
            reason,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_browser_reason_is_verbatim() {
        let verdict = EnvironmentVerdict::new(Platform::RestrictedBrowser);
        let advice = ConnectionAdvice::from_environment(&verdict);
        assert!(!advice.can_connect);
        assert_eq!(advice.reason, verdict.reason);
        assert!(!advice.suggestions.is_empty());
    }

    #[test]
    fn gateway_status_errors_read_as_gateway_failures() {
        let failing = ConnectionAdvice::from_error(&CoreError::GatewayHttp { status: 503 });
        assert!(failing.reason.contains("HTTP 503"));
        assert!(failing.reason.contains("reachable"));

        let refused = ConnectionAdvice::from_error(&CoreError::GatewayHttp { status: 404 });
        assert!(refused.reason.contains("refused"));
        assert!(!refused.reason.contains("Internal"));
    }

    #[test]
    fn unreachable_names_probe_failure() {
        let verdict = EnvironmentVerdict::new(Platform::Emulator);
        let advice = ConnectionAdvice::unreachable(&verdict, Some(ProbeError::Refused));
        assert!(advice.reason.contains("refused"));
        assert!(advice.suggestions.iter().any(|s| s.contains("Emulators")));
    }
}
