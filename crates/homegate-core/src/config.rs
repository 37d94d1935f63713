// ── Runtime router configuration ──
//
// Describes *how* to reach and talk to the gateway. Carries credentials and
// tuning but never touches disk: the CLI (or any other host) builds a
// `RouterConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::retry::RetryPolicy;

/// Address tried when nothing else is configured.
pub const DEFAULT_ADDRESS: &str = "http://10.0.0.1/";

/// Simulated latency of the fixture backend.
pub const DEFAULT_FIXTURE_LATENCY: Duration = Duration::from_millis(300);

/// Session lifetime assumed after a successful login; the gateway does not
/// advertise one.
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Login credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Configuration for one gateway.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Configured gateway address. Discovery may correct it.
    pub address: Url,
    /// Saved credentials. Without them login and automatic re-login are
    /// impossible.
    pub credentials: Option<Credentials>,
    /// Use the fixture backend instead of the network.
    pub mock: bool,
    /// Per-request deadline for admin page calls.
    pub request_timeout: Duration,
    /// Reachability probe deadline. `None` picks the environment default.
    pub probe_timeout: Option<Duration>,
    /// Overall deadline for the concurrent discovery sweep.
    pub discovery_budget: Duration,
    /// Candidate addresses for discovery. `None` uses the common list.
    pub candidates: Option<Vec<Url>>,
    pub session_lifetime: Duration,
    /// How long before expiry the session is refreshed.
    pub renewal_lead: Duration,
    pub retry: RetryPolicy,
    pub fixture_latency: Duration,
}

impl RouterConfig {
    pub fn new(address: Url) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.credentials = Some(Credentials {
            username: username.into(),
            password,
        });
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            address: Url::parse(DEFAULT_ADDRESS).expect("default address is valid"),
            credentials: None,
            mock: false,
            request_timeout: Duration::from_secs(10),
            probe_timeout: None,
            discovery_budget: homegate_api::discovery::DEFAULT_DISCOVERY_BUDGET,
            candidates: None,
            session_lifetime: DEFAULT_SESSION_LIFETIME,
            renewal_lead: homegate_api::session::DEFAULT_RENEWAL_LEAD,
            retry: RetryPolicy::default(),
            fixture_latency: DEFAULT_FIXTURE_LATENCY,
        }
    }
}
