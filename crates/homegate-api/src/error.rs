use thiserror::Error;

/// Top-level error type for the `homegate-api` crate.
///
/// Covers every failure mode of the gateway admin surface: authentication,
/// transport, HTML structure, and session persistence. `homegate-core` maps
/// these into the user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (failure marker in the body, or HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A protected page answered with the login-redirect marker.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request exceeded its deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The gateway answered with an unexpected HTTP status.
    #[error("Gateway returned HTTP {status}")]
    Http { status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// The page did not contain the container the extractor needs.
    #[error("Unexpected page structure: {container} not found")]
    StructuralParse { container: &'static str },

    // ── Persistence ─────────────────────────────────────────────────
    /// Reading or writing the persisted key-value store failed.
    #[error("Session store error: {0}")]
    Store(String),
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` for network/timeout-class failures worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::Http { status } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the failure was a deadline rather than a refusal.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}
