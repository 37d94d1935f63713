// Session manager
//
// Sole owner of the session record and the cookie set. Everything else only
// asks for transitions. State is persisted after every mutation and a single
// renewal timer is kept armed ahead of expiry.

pub mod cookies;

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::store::{COOKIES_KEY, KeyValueStore, SESSION_KEY};

pub use cookies::{CookieSet, SetCookie, host_key};

/// Cookie carrying the gateway's session token.
pub const SESSION_COOKIE: &str = "DUKSID";

/// How long before expiry the renewal timer fires.
pub const DEFAULT_RENEWAL_LEAD: Duration = Duration::from_secs(5 * 60);

/// Lifecycle of the gateway session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// The renewal timer fired; a refresh is due.
    Expiring,
}

/// An authenticated session with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub valid: bool,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.valid || self.expires_at <= now
    }
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    session: Option<Session>,
    cookies: CookieSet,
}

/// Holds cookies and the session token, persists them, and schedules renewal.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    lead_time: Duration,
    inner: Arc<RwLock<Inner>>,
    renewal: Mutex<Option<CancellationToken>>,
    renewal_due: Arc<Notify>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("lead_time", &self.lead_time)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lead_time: DEFAULT_RENEWAL_LEAD,
            inner: Arc::new(RwLock::new(Inner {
                state: SessionState::Unauthenticated,
                session: None,
                cookies: CookieSet::new(),
            })),
            renewal: Mutex::new(None),
            renewal_due: Arc::new(Notify::new()),
        }
    }

    pub fn with_lead_time(mut self, lead_time: Duration) -> Self {
        self.lead_time = lead_time;
        self
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.inner.read().expect("session lock poisoned").state
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.read().expect("session lock poisoned").session.clone()
    }

    pub fn cookies(&self) -> CookieSet {
        self.inner.read().expect("session lock poisoned").cookies.clone()
    }

    /// Whether a session exists and has not passed its expiry.
    pub fn has_live_session(&self, now: DateTime<Utc>) -> bool {
        self.session().is_some_and(|s| !s.is_expired(now))
    }

    /// Signalled each time the renewal timer fires.
    pub fn renewal_due(&self) -> Arc<Notify> {
        Arc::clone(&self.renewal_due)
    }

    pub fn renewal_armed(&self) -> bool {
        self.renewal
            .lock()
            .expect("renewal lock poisoned")
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// The `Cookie` header to send to `url`, if any.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .cookies
            .header_for(url)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Load the persisted session and cookies.
    ///
    /// A session whose expiry is still in the future becomes `Authenticated`
    /// and arms the renewal timer; anything else is wiped. Returns whether a
    /// live session was restored.
    pub fn restore(&self) -> bool {
        let session = self.load::<Session>(SESSION_KEY);
        let cookies = self.load::<CookieSet>(COOKIES_KEY).unwrap_or_default();

        match session {
            Some(session) if !session.is_expired(Utc::now()) => {
                info!(username = %session.username, expires_at = %session.expires_at, "restored session");
                let expires_at = session.expires_at;
                {
                    let mut guard = self.inner.write().expect("session lock poisoned");
                    guard.session = Some(session);
                    guard.cookies = cookies;
                    guard.state = SessionState::Authenticated;
                }
                self.arm_renewal(expires_at);
                true
            }
            _ => {
                debug!("no live session to restore");
                self.clear();
                false
            }
        }
    }

    /// Mark a login as in progress.
    pub fn begin_login(&self) {
        self.inner.write().expect("session lock poisoned").state = SessionState::Authenticating;
    }

    /// Abandon an in-progress login without touching an existing session.
    pub fn abort_login(&self) {
        let mut guard = self.inner.write().expect("session lock poisoned");
        if guard.state == SessionState::Authenticating {
            guard.state = if guard.session.is_some() {
                SessionState::Authenticated
            } else {
                SessionState::Unauthenticated
            };
        }
    }

    /// Record a successful login, persist it, and arm the renewal timer at
    /// `expires_at - lead_time`.
    pub fn store(&self, session_id: &str, username: &str, expires_at: DateTime<Utc>) -> Session {
        let session = Session {
            id: session_id.to_owned(),
            username: username.to_owned(),
            created_at: Utc::now(),
            expires_at,
            valid: true,
        };
        {
            let mut guard = self.inner.write().expect("session lock poisoned");
            guard.session = Some(session.clone());
            guard.state = SessionState::Authenticated;
        }
        info!(username, %expires_at, "session stored");
        self.persist_session();
        self.arm_renewal(expires_at);
        session
    }

    /// Push the expiry of the current session forward (after a successful
    /// verification). Re-arms the renewal timer.
    pub fn extend(&self, expires_at: DateTime<Utc>) -> bool {
        let extended = {
            let mut guard = self.inner.write().expect("session lock poisoned");
            match guard.session.as_mut() {
                Some(session) => {
                    session.expires_at = expires_at;
                    session.valid = true;
                    guard.state = SessionState::Authenticated;
                    true
                }
                None => false,
            }
        };
        if extended {
            debug!(%expires_at, "session extended");
            self.persist_session();
            self.arm_renewal(expires_at);
        }
        extended
    }

    /// Absorb every `Set-Cookie` header of a response from `url`.
    ///
    /// The session cookie also updates the live session id. Returns the
    /// session cookie value if the response carried one.
    pub fn absorb_cookies(&self, url: &Url, headers: &HeaderMap) -> Option<String> {
        let (applied, session_token) = {
            let mut guard = self.inner.write().expect("session lock poisoned");
            let applied = guard.cookies.absorb(url, headers, Utc::now());
            let token = applied
                .iter()
                .find(|c| c.name == SESSION_COOKIE && !c.expired && !c.value.is_empty())
                .map(|c| c.value.clone());
            if let (Some(token), Some(session)) = (token.as_ref(), guard.session.as_mut()) {
                session.id.clone_from(token);
            }
            (applied, token)
        };

        if !applied.is_empty() {
            debug!(count = applied.len(), "absorbed cookies");
            self.persist_cookies();
            if session_token.is_some() {
                self.persist_session();
            }
        }
        session_token
    }

    /// Forget everything: cancel the timer, wipe session and cookies, and
    /// persist the empty state. Outgoing requests carry no cookies afterwards.
    pub fn clear(&self) {
        self.disarm_renewal();
        {
            let mut guard = self.inner.write().expect("session lock poisoned");
            guard.session = None;
            guard.cookies.clear();
            guard.state = SessionState::Unauthenticated;
        }
        for key in [SESSION_KEY, COOKIES_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to clear persisted state");
            }
        }
        debug!("session cleared");
    }

    // ── Renewal timer ────────────────────────────────────────────────

    fn arm_renewal(&self, expires_at: DateTime<Utc>) {
        let mut slot = self.renewal.lock().expect("renewal lock poisoned");
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, renewal timer not armed");
            return;
        };

        let lead = TimeDelta::from_std(self.lead_time).unwrap_or(TimeDelta::zero());
        let wait = (expires_at - lead - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let inner = Arc::clone(&self.inner);
        let due = Arc::clone(&self.renewal_due);

        runtime.spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(wait) => {
                    {
                        let mut guard = inner.write().expect("session lock poisoned");
                        if guard.state == SessionState::Authenticated {
                            guard.state = SessionState::Expiring;
                        }
                    }
                    debug!("session renewal due");
                    due.notify_one();
                }
            }
        });

        debug!(?wait, "renewal timer armed");
        *slot = Some(token);
    }

    fn disarm_renewal(&self) {
        if let Some(token) = self.renewal.lock().expect("renewal lock poisoned").take() {
            token.cancel();
        }
    }

    // ── Persistence ──────────────────────────────────────────────────

    fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key) {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .inspect_err(|e| warn!(key, error = %e, "discarding unreadable persisted value"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted state");
                None
            }
        }
    }

    fn persist_session(&self) {
        let session = self.session();
        let result = match session {
            Some(ref s) => serde_json::to_string(s)
                .map_err(|e| Error::Store(e.to_string()))
                .and_then(|raw| self.store.set(SESSION_KEY, &raw)),
            None => self.store.remove(SESSION_KEY),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist session");
        }
    }

    fn persist_cookies(&self) {
        let cookies = self.cookies();
        let result = serde_json::to_string(&cookies)
            .map_err(|e| Error::Store(e.to_string()))
            .and_then(|raw| self.store.set(COOKIES_KEY, &raw));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist cookies");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.renewal.lock() {
            if let Some(token) = slot.take() {
                token.cancel();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use reqwest::header::{HeaderValue, SET_COOKIE};

    fn manager() -> (Arc<MemoryStore>, SessionManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone());
        (store, manager)
    }

    fn url() -> Url {
        Url::parse("http://10.0.0.1/check.jst").unwrap()
    }

    #[tokio::test]
    async fn store_persists_and_authenticates() {
        let (store, manager) = manager();
        let expires = Utc::now() + TimeDelta::hours(1);

        manager.store("tok", "admin", expires);

        assert_eq!(manager.state(), SessionState::Authenticated);
        assert!(manager.renewal_armed());
        let raw = store.get(SESSION_KEY).unwrap().unwrap();
        let persisted: Session = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted.id, "tok");
        assert_eq!(persisted.username, "admin");
    }

    #[tokio::test]
    async fn restore_live_session() {
        let (store, first) = manager();
        first.store("tok", "admin", Utc::now() + TimeDelta::hours(1));
        drop(first);

        let second = SessionManager::new(store);
        assert!(second.restore());
        assert_eq!(second.state(), SessionState::Authenticated);
        assert!(second.renewal_armed());
    }

    #[tokio::test]
    async fn restore_expired_session_clears_everything() {
        let (store, manager) = manager();
        let stale = Session {
            id: "old".into(),
            username: "admin".into(),
            created_at: Utc::now() - TimeDelta::hours(2),
            expires_at: Utc::now() - TimeDelta::hours(1),
            valid: true,
        };
        store
            .set(SESSION_KEY, &serde_json::to_string(&stale).unwrap())
            .unwrap();
        store.set(COOKIES_KEY, r#"{"10.0.0.1":{"DUKSID":"old"}}"#).unwrap();

        assert!(!manager.restore());
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(store.get(SESSION_KEY).unwrap().is_none());
        assert!(store.get(COOKIES_KEY).unwrap().is_none());
        assert!(manager.cookie_header(&url()).is_none());
    }

    #[tokio::test]
    async fn session_cookie_updates_live_session_id() {
        let (store, manager) = manager();
        manager.store("initial", "admin", Utc::now() + TimeDelta::hours(1));

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("DUKSID=rotated; Path=/"));
        let token = manager.absorb_cookies(&url(), &headers);

        assert_eq!(token.as_deref(), Some("rotated"));
        assert_eq!(manager.session().unwrap().id, "rotated");
        assert!(store.get(COOKIES_KEY).unwrap().unwrap().contains("rotated"));
        assert_eq!(manager.cookie_header(&url()).as_deref(), Some("DUKSID=rotated"));
    }

    #[tokio::test]
    async fn clear_wipes_state_and_disarms_timer() {
        let (store, manager) = manager();
        manager.store("tok", "admin", Utc::now() + TimeDelta::hours(1));
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("DUKSID=tok"));
        manager.absorb_cookies(&url(), &headers);

        manager.clear();

        assert_eq!(manager.state(), SessionState::Unauthenticated);
        assert!(!manager.renewal_armed());
        assert!(manager.cookie_header(&url()).is_none());
        assert!(store.get(SESSION_KEY).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_ahead_of_expiry() {
        let (_, manager) = manager();
        let manager = manager.with_lead_time(Duration::from_secs(60));
        let due = manager.renewal_due();

        manager.store("tok", "admin", Utc::now() + TimeDelta::seconds(61));
        tokio::time::timeout(Duration::from_secs(5), due.notified())
            .await
            .unwrap();

        assert_eq!(manager.state(), SessionState::Expiring);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_cancels_previous_timer() {
        let (_, manager) = manager();
        let manager = manager.with_lead_time(Duration::from_secs(60));

        manager.store("tok", "admin", Utc::now() + TimeDelta::seconds(61));
        manager.store("tok", "admin", Utc::now() + TimeDelta::hours(2));
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(manager.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn abort_login_restores_previous_state() {
        let (_, manager) = manager();
        manager.begin_login();
        assert_eq!(manager.state(), SessionState::Authenticating);
        manager.abort_login();
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }
}
