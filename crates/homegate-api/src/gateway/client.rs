// Gateway HTTP client
//
// Wraps `reqwest::Client` with base-URL handling and cookie bookkeeping.
// Every request carries the session manager's `Cookie` header for the
// target host and every response is fed back through `absorb_cookies`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{COOKIE, LOCATION};
use reqwest::{RequestBuilder, StatusCode};
use tracing::debug;
use url::Url;

use super::{LOGIN_PAGE_MARKERS, LOGIN_REDIRECT_TARGETS};
use crate::error::Error;
use crate::session::SessionManager;
use crate::transport::TransportConfig;

/// A fetched admin page, redirects not followed.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    /// `Location` header of a redirect answer.
    pub location: Option<String>,
    pub body: String,
    /// Session cookie value, if this response set one.
    pub session_token: Option<String>,
}

impl Page {
    /// 2xx or 3xx.
    pub fn is_accepted(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }

    /// Whether the gateway bounced us back to the login screen.
    pub fn is_login_redirect(&self) -> bool {
        let redirected = self
            .location
            .as_deref()
            .is_some_and(|loc| LOGIN_REDIRECT_TARGETS.iter().any(|t| loc.contains(t)));
        redirected || LOGIN_PAGE_MARKERS.iter().any(|m| self.body.contains(m))
    }
}

/// Raw HTTP client for the gateway's admin pages.
///
/// Holds no session state of its own: cookies belong to the shared
/// [`SessionManager`]. The base URL can be swapped after discovery finds the
/// gateway somewhere else.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: RwLock<Url>,
    session: Arc<SessionManager>,
    /// Per-request deadline the `reqwest::Client` was built with, if known.
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url().as_str())
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        session: Arc<SessionManager>,
    ) -> Result<Self, Error> {
        let mut client = Self::with_client(transport.build_client()?, base_url, session);
        client.request_timeout = Some(transport.timeout);
        Ok(client)
    }

    /// Create a client with a pre-built `reqwest::Client`. The client must
    /// not follow redirects.
    pub fn with_client(http: reqwest::Client, base_url: Url, session: Arc<SessionManager>) -> Self {
        Self {
            http,
            base_url: RwLock::new(base_url),
            session,
            request_timeout: None,
        }
    }

    pub fn base_url(&self) -> Url {
        self.base_url.read().expect("base url lock poisoned").clone()
    }

    /// Point the client at a different gateway address.
    pub fn set_base_url(&self, url: Url) {
        debug!(%url, "gateway base url changed");
        *self.base_url.write().expect("base url lock poisoned") = url;
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url().join(path)?)
    }

    /// GET a page.
    pub(crate) async fn get_page(&self, path: &str) -> Result<Page, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        let request = self.http.get(url.clone());
        self.send(&url, request).await
    }

    /// POST a form-encoded body.
    pub(crate) async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Page, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        let request = self.http.post(url.clone()).form(form);
        self.send(&url, request).await
    }

    /// GET a page that requires a session, returning its body.
    ///
    /// A bounce to the login screen or a 401/403 is `SessionExpired`; any
    /// other non-2xx/3xx status is `Http`.
    pub(crate) async fn fetch_protected(&self, path: &str) -> Result<String, Error> {
        let page = self.get_page(path).await?;
        Self::require_session(&page)?;
        if !page.is_accepted() {
            return Err(Error::Http {
                status: page.status.as_u16(),
            });
        }
        Ok(page.body)
    }

    /// POST an action that requires a session. `Ok(false)` when the gateway
    /// answered with a non-success status.
    pub(crate) async fn post_action(&self, path: &str, form: &[(&str, &str)]) -> Result<bool, Error> {
        let page = self.post_form(path, form).await?;
        Self::require_session(&page)?;
        Ok(page.is_accepted())
    }

    fn require_session(page: &Page) -> Result<(), Error> {
        if matches!(page.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || page.is_login_redirect()
        {
            return Err(Error::SessionExpired);
        }
        if page.status.is_server_error() {
            return Err(Error::Http {
                status: page.status.as_u16(),
            });
        }
        Ok(())
    }

    async fn send(&self, url: &Url, mut request: RequestBuilder) -> Result<Page, Error> {
        if let Some(cookie) = self.session.cookie_header(url) {
            request = request.header(COOKIE, cookie);
        }

        let resp = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let session_token = self.session.absorb_cookies(url, resp.headers());
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "gateway response");
        Ok(Page {
            status,
            location,
            body,
            session_token,
        })
    }

    /// Timeouts become `Error::Timeout` carrying the configured deadline.
    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.request_timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            _ => Error::Transport(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page(status: u16, location: Option<&str>, body: &str) -> Page {
        Page {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
            location: location.map(str::to_owned),
            body: body.to_owned(),
            session_token: None,
        }
    }

    #[test]
    fn redirect_to_logged_out_page_is_login_redirect() {
        assert!(page(302, Some("home_loggedout.jst"), "").is_login_redirect());
        assert!(!page(302, Some("at_a_glance.jst"), "").is_login_redirect());
    }

    #[test]
    fn login_form_in_body_is_login_redirect() {
        let body = r#"<form action="check.jst" method="post" name="loginForm">"#;
        assert!(page(200, None, body).is_login_redirect());
    }

    #[test]
    fn logout_link_alone_is_not_a_redirect() {
        let body = r#"<a href="home_loggedout.jst">Logout</a><div id="online-private"></div>"#;
        assert!(!page(200, None, body).is_login_redirect());
    }

    #[test]
    fn server_errors_are_surfaced_as_http() {
        let err = GatewayClient::require_session(&page(503, None, "")).unwrap_err();
        assert!(matches!(err, Error::Http { status: 503 }));
    }
}
