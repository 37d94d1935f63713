// Connectivity probe
//
// Cheapest possible "is anything answering HTTP here?" check. HEAD first,
// GET only when the gateway rejects HEAD. Never returns an error: every
// failure collapses into an unreachable outcome with a classified tag.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default probe deadline.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// HTTP method that produced the probe verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeMethod {
    Head,
    Get,
}

/// Why a probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeError {
    /// Host name did not resolve.
    Dns,
    /// TCP connection refused or reset.
    Refused,
    /// No answer before the deadline.
    Timeout,
    /// The runtime refused to issue the request (browser CORS and friends).
    Blocked,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Dns => "name resolution failed",
            Self::Refused => "connection refused",
            Self::Timeout => "timed out",
            Self::Blocked => "request blocked by the runtime",
            Self::Other => "request failed",
        };
        f.write_str(label)
    }
}

/// Result of probing a single address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub address: Url,
    pub reachable: bool,
    pub method: ProbeMethod,
    pub status: Option<u16>,
    pub error: Option<ProbeError>,
}

/// Issues reachability probes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Prober {
    http: reqwest::Client,
}

impl Prober {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Probe `address` with the given deadline.
    ///
    /// Any HTTP answer (even 401 or 404) counts as reachable: something is
    /// serving the admin interface at that address.
    pub async fn probe(&self, address: &Url, timeout: Duration) -> ProbeOutcome {
        debug!(%address, ?timeout, "probing");

        match self.send(Method::HEAD, address, timeout).await {
            Ok(status)
                if status == StatusCode::METHOD_NOT_ALLOWED
                    || status == StatusCode::NOT_IMPLEMENTED =>
            {
                trace!(%address, %status, "HEAD rejected, retrying with GET");
                self.finish(address, ProbeMethod::Get, self.send(Method::GET, address, timeout).await)
            }
            other => self.finish(address, ProbeMethod::Head, other),
        }
    }

    async fn send(
        &self,
        method: Method,
        address: &Url,
        timeout: Duration,
    ) -> Result<StatusCode, reqwest::Error> {
        let resp = self
            .http
            .request(method, address.clone())
            .timeout(timeout)
            .send()
            .await?;
        Ok(resp.status())
    }

    #[allow(clippy::unused_self)]
    fn finish(
        &self,
        address: &Url,
        method: ProbeMethod,
        result: Result<StatusCode, reqwest::Error>,
    ) -> ProbeOutcome {
        match result {
            Ok(status) => {
                debug!(%address, %status, ?method, "probe answered");
                ProbeOutcome {
                    address: address.clone(),
                    reachable: true,
                    method,
                    status: Some(status.as_u16()),
                    error: None,
                }
            }
            Err(e) => {
                let error = classify(&e);
                debug!(%address, ?method, %error, "probe failed");
                ProbeOutcome {
                    address: address.clone(),
                    reachable: false,
                    method,
                    status: None,
                    error: Some(error),
                }
            }
        }
    }
}

/// Map a reqwest failure onto the probe error tags.
pub fn classify(err: &reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        return ProbeError::Timeout;
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted => return ProbeError::Refused,
                io::ErrorKind::TimedOut => return ProbeError::Timeout,
                _ => {}
            }
        }
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return ProbeError::Dns;
        }
        if text.contains("cors") || text.contains("blocked") {
            return ProbeError::Blocked;
        }
        source = cause.source();
    }

    if err.is_connect() {
        ProbeError::Refused
    } else {
        ProbeError::Other
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober() -> Prober {
        Prober::new(&TransportConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn head_answer_is_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let outcome = prober().probe(&url, Duration::from_secs(1)).await;

        assert!(outcome.reachable);
        assert_eq!(outcome.method, ProbeMethod::Head);
        assert_eq!(outcome.status, Some(200));
    }

    #[tokio::test]
    async fn rejected_head_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let outcome = prober().probe(&url, Duration::from_secs(1)).await;

        assert!(outcome.reachable);
        assert_eq!(outcome.method, ProbeMethod::Get);
    }

    #[tokio::test]
    async fn unauthorized_still_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let outcome = prober().probe(&url, Duration::from_secs(1)).await;
        assert!(outcome.reachable);
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let outcome = prober().probe(&url, Duration::from_millis(150)).await;

        assert!(!outcome.reachable);
        assert_eq!(outcome.error, Some(ProbeError::Timeout));
    }

    #[tokio::test]
    async fn closed_port_is_refused() {
        // Bind then drop to obtain a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let outcome = prober().probe(&url, Duration::from_secs(1)).await;

        assert!(!outcome.reachable);
        assert_eq!(outcome.error, Some(ProbeError::Refused));
    }
}
