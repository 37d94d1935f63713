// Login, logout and session verification endpoints
//
// The gateway has no auth API: login is the browser form post and success
// can only be inferred from the answer. These calls report what the gateway
// said; the session lifecycle (store, renew, clear) is driven by
// `homegate-core`.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::{GatewayClient, Page};
use super::{LOGIN_FAILURE_MARKERS, LOGIN_PAGE_PATH, LOGIN_PATH, LOGOUT_PATH, PROTECTED_PATH};
use crate::error::Error;

impl GatewayClient {
    /// Fetch the login page as a liveness check.
    ///
    /// `GET /`. Anything that is not a server error counts as alive.
    pub async fn fetch_login_page(&self) -> Result<(), Error> {
        let page = self.get_page(LOGIN_PAGE_PATH).await?;
        if page.status.is_server_error() {
            return Err(Error::Http {
                status: page.status.as_u16(),
            });
        }
        Ok(())
    }

    /// Submit credentials.
    ///
    /// `POST /check.jst` with `username` and `password`. Cookies from the
    /// answer are absorbed by the session manager as for any response.
    /// Success is a best-effort heuristic: a 2xx/3xx status, no known
    /// failure text in the body, and no redirect back to the login screen.
    ///
    /// Returns the session token: the session cookie if the gateway set one,
    /// otherwise a locally generated id.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<String, Error> {
        debug!(username, "submitting login form");
        let page = self
            .post_form(
                LOGIN_PATH,
                &[("username", username), ("password", password.expose_secret())],
            )
            .await?;

        if let Some(message) = login_rejection(&page) {
            warn!(username, status = page.status.as_u16(), %message, "login rejected");
            return Err(Error::Authentication { message });
        }

        let token = page.session_token.unwrap_or_else(|| {
            debug!("login answer carried no session cookie, using a local id");
            Uuid::new_v4().to_string()
        });
        info!(username, "login accepted");
        Ok(token)
    }

    /// Check the current cookies against a protected page.
    ///
    /// `GET /at_a_glance.jst`. `Err(SessionExpired)` when the gateway bounces
    /// to the login screen.
    pub async fn verify(&self) -> Result<(), Error> {
        self.fetch_protected(PROTECTED_PATH).await.map(|_| ())
    }

    /// End the session on the gateway side.
    ///
    /// `GET /home_loggedout.jst`. The answer is not inspected.
    pub async fn logout(&self) -> Result<(), Error> {
        let page = self.get_page(LOGOUT_PATH).await?;
        debug!(status = page.status.as_u16(), "logged out");
        Ok(())
    }
}

/// Why a login answer counts as a rejection, or `None` if it looks accepted.
fn login_rejection(page: &Page) -> Option<String> {
    if !page.is_accepted() {
        return Some(format!("gateway answered HTTP {}", page.status.as_u16()));
    }
    let body = page.body.to_lowercase();
    if let Some(marker) = LOGIN_FAILURE_MARKERS
        .iter()
        .find(|m| body.contains(&m.to_lowercase()))
    {
        return Some(format!("gateway reported: {marker}"));
    }
    if page.is_login_redirect() {
        return Some("gateway returned to the login page".into());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn page(status: StatusCode, location: Option<&str>, body: &str) -> Page {
        Page {
            status,
            location: location.map(str::to_owned),
            body: body.to_owned(),
            session_token: None,
        }
    }

    #[test]
    fn redirect_to_home_page_is_accepted() {
        let answer = page(StatusCode::FOUND, Some("at_a_glance.jst"), "");
        assert_eq!(login_rejection(&answer), None);
    }

    #[test]
    fn failure_text_is_rejected_case_insensitively() {
        let answer = page(StatusCode::OK, None, "<p>INCORRECT USER NAME OR PASSWORD</p>");
        assert!(login_rejection(&answer).is_some());
    }

    #[test]
    fn bounce_to_login_is_rejected() {
        let answer = page(StatusCode::FOUND, Some("home_loggedout.jst"), "");
        assert!(login_rejection(&answer).is_some_and(|m| m.contains("login page")));
    }

    #[test]
    fn client_error_is_rejected() {
        let answer = page(StatusCode::UNAUTHORIZED, None, "");
        assert!(login_rejection(&answer).is_some_and(|m| m.contains("401")));
    }
}
