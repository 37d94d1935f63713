// ── Authentication orchestrator ──
//
// Drives the session lifecycle on top of the raw login/verify endpoints:
// coalesced logins, local-expiry-first verification, one-shot automatic
// re-login from saved credentials, and proactive refresh when the session
// manager's renewal timer fires. The session manager stays the only writer
// of session state; this module only asks it for transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use homegate_api::{GatewayClient, SessionManager};

use crate::config::Credentials;
use crate::error::CoreError;
use crate::model::LoginOutcome;
use crate::retry::RetryPolicy;

/// Login, verification and renewal for one gateway.
pub struct Authenticator {
    client: Arc<GatewayClient>,
    credentials: Option<Credentials>,
    session_lifetime: Duration,
    retry: RetryPolicy,
    /// Held for the duration of a login; keeps the last outcome for callers
    /// that queued behind it.
    in_flight: tokio::sync::Mutex<Option<LoginOutcome>>,
    /// Bumped after every completed login.
    generation: AtomicU64,
    listener: Mutex<Option<CancellationToken>>,
}

impl Authenticator {
    pub fn new(client: Arc<GatewayClient>, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
            session_lifetime: crate::config::DEFAULT_SESSION_LIFETIME,
            retry: RetryPolicy::default(),
            in_flight: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
            listener: Mutex::new(None),
        }
    }

    pub fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.client.session()
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Log in, coalescing with any login already in flight: a caller that
    /// arrives while another login runs waits for it and shares its outcome
    /// instead of posting the form again.
    pub async fn login(&self, username: &str, password: &SecretString) -> LoginOutcome {
        let observed = self.generation.load(Ordering::Acquire);
        let mut last = self.in_flight.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(outcome) = last.as_ref() {
                debug!(username, "joined in-flight login");
                return outcome.clone();
            }
        }

        let outcome = self.login_once(username, password).await;
        *last = Some(outcome.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    async fn login_once(&self, username: &str, password: &SecretString) -> LoginOutcome {
        let session = self.session();
        session.begin_login();

        let result = self
            .retry
            .run("login", CoreError::is_retryable, |_| async move {
                self.client
                    .login(username, password)
                    .await
                    .map_err(CoreError::from)
            })
            .await;

        match result {
            Ok(token) => {
                session.store(&token, username, self.expiry());
                info!(username, "authenticated");
                LoginOutcome::accepted()
            }
            Err(failure) => {
                session.abort_login();
                warn!(username, attempts = failure.attempts, error = %failure.error, "login failed");
                LoginOutcome::rejected(failure.error.to_string())
            }
        }
    }

    // ── Verification ─────────────────────────────────────────────────

    /// Whether the current session is still good.
    ///
    /// Local expiry is checked first: an expired session is cleared and
    /// `false` returned without touching the network. Otherwise a protected
    /// page is fetched; a bounce to the login screen clears the session.
    pub async fn verify_session(&self) -> bool {
        let session = self.session();
        match session.session() {
            None => {
                debug!("no session to verify");
                return false;
            }
            Some(current) if current.is_expired(Utc::now()) => {
                info!(expired_at = %current.expires_at, "session expired locally");
                session.clear();
                return false;
            }
            Some(_) => {}
        }

        match self.client.verify().await {
            Ok(()) => true,
            Err(homegate_api::Error::SessionExpired) => {
                info!("gateway no longer accepts the session");
                session.clear();
                false
            }
            Err(e) => {
                warn!(error = %e, "session verification failed");
                false
            }
        }
    }

    /// Log in again with the saved credentials. Tries once; a rejection
    /// surfaces as `AuthenticationFailed` and is not retried further.
    pub async fn auto_relogin(&self) -> Result<(), CoreError> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Err(CoreError::AuthenticationFailed {
                message: "no saved credentials".into(),
            });
        };

        info!(username = %credentials.username, "re-authenticating with saved credentials");
        let outcome = self.login(&credentials.username, &credentials.password).await;
        if outcome.success {
            Ok(())
        } else {
            Err(CoreError::AuthenticationFailed {
                message: outcome.message,
            })
        }
    }

    /// `true` when a session is usable afterwards. Reuses a verified session
    /// unless `force`; otherwise logs in with the saved credentials.
    pub async fn authenticate(&self, force: bool) -> bool {
        if !force && self.verify_session().await {
            return true;
        }
        match self.credentials.as_ref() {
            Some(c) => self.login(&c.username, &c.password).await.success,
            None => {
                debug!("no saved credentials, cannot authenticate");
                false
            }
        }
    }

    /// Ensure a session for a protected call, re-logging in when needed.
    pub async fn ensure_session(&self) -> Result<(), CoreError> {
        if self.verify_session().await {
            return Ok(());
        }
        self.auto_relogin().await
    }

    // ── Renewal ──────────────────────────────────────────────────────

    /// Extend the session ahead of expiry. Verifies against the gateway and
    /// pushes the expiry forward; falls back to a re-login on failure.
    pub async fn refresh_session(&self) -> bool {
        let session = self.session();
        if session.session().is_some() {
            match self.client.verify().await {
                Ok(()) => {
                    session.extend(self.expiry());
                    debug!("session refreshed");
                    return true;
                }
                Err(homegate_api::Error::SessionExpired) => session.clear(),
                Err(e) => warn!(error = %e, "session refresh check failed"),
            }
        }
        match self.auto_relogin().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "session renewal failed");
                false
            }
        }
    }

    /// Refresh the session every time the session manager's renewal timer
    /// fires. Replaces any previous listener; stops when the authenticator
    /// is dropped.
    pub fn spawn_renewal_listener(self: &Arc<Self>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, renewal listener not started");
            return;
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let due = self.session().renewal_due();
        let weak: Weak<Self> = Arc::downgrade(self);

        runtime.spawn(async move {
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    () = due.notified() => {
                        let Some(this) = weak.upgrade() else { break };
                        debug!("renewal due, refreshing session");
                        this.refresh_session().await;
                    }
                }
            }
        });

        if let Some(previous) = self
            .listener
            .lock()
            .expect("listener lock poisoned")
            .replace(token)
        {
            previous.cancel();
        }
    }

    // ── Logout ───────────────────────────────────────────────────────

    /// End the session on the gateway and forget it locally. Local state is
    /// cleared even when the gateway cannot be reached.
    pub async fn logout(&self) -> Result<(), CoreError> {
        let session = self.session();
        let result = if session.session().is_some() {
            self.client.logout().await.map_err(CoreError::from)
        } else {
            Ok(())
        };
        session.clear();
        match &result {
            Ok(()) => info!("logged out"),
            Err(e) => warn!(error = %e, "gateway logout failed, local session cleared"),
        }
        result
    }

    fn expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + TimeDelta::from_std(self.session_lifetime).unwrap_or(TimeDelta::minutes(30))
    }
}

impl Drop for Authenticator {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(token) = slot.take() {
                token.cancel();
            }
        }
    }
}
