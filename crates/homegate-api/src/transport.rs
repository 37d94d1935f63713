// Shared transport configuration for building reqwest::Client instances.
//
// The gateway client and the connectivity probe share timeout and user-agent
// settings through this module. Redirects are never followed automatically:
// the login flow needs to see the 302 that carries `Set-Cookie`.

use std::time::Duration;

use reqwest::redirect::Policy;

use crate::error::Error;

const USER_AGENT: &str = concat!("homegate/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request deadline for admin page calls.
    pub timeout: Duration,
    /// Connect deadline; kept short because gateways live on the LAN.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = self.connect_timeout.min(timeout);
        self
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Cookies are not handled by reqwest: the session manager owns them so
    /// they can be persisted and scoped per host.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)
    }
}
