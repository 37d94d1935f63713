// ── Core error types ──
//
// User-facing errors from homegate-core. Consumers never see reqwest
// errors or HTTP status codes directly: the `From<homegate_api::Error>`
// impl translates transport-layer failures into this taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// No address answered, or the request never reached the gateway.
    #[error("Gateway unreachable: {reason}")]
    NetworkUnreachable { reason: String },

    /// The host platform forbids local network access.
    #[error("Local network access is not available here: {reason}")]
    EnvironmentRestricted { reason: String },

    /// A network call exceeded its deadline. Treated like
    /// `NetworkUnreachable` for retry and advice. `timeout_ms` is 0 when the
    /// deadline is not known.
    #[error("Gateway did not answer {}", deadline(.timeout_ms))]
    Timeout { timeout_ms: u64 },

    /// The gateway answered, but with an error status.
    #[error("Gateway answered HTTP {status}")]
    GatewayHttp { status: u16 },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A protected page bounced back to the login screen.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Data errors ──────────────────────────────────────────────────
    /// The page lacked the container the extractor needs.
    #[error("Unexpected page layout: {container} not found")]
    StructuralParseFailure { container: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Device not found: {mac}")]
    DeviceNotFound { mac: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn deadline(timeout_ms: &u64) -> String {
    match *timeout_ms {
        0 => "in time".to_owned(),
        ms => format!("within {ms}ms"),
    }
}

impl CoreError {
    /// Network/timeout-class failures and gateway 5xx: worth another attempt.
    /// Authentication and layout failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkUnreachable { .. } | Self::Timeout { .. } => true,
            Self::GatewayHttp { status } => *status >= 500,
            _ => false,
        }
    }

    /// Whether re-authenticating could clear this error.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::SessionExpired
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<homegate_api::Error> for CoreError {
    fn from(err: homegate_api::Error) -> Self {
        use homegate_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::SessionExpired => CoreError::SessionExpired,
            Api::Transport(ref e) if e.is_timeout() => CoreError::Timeout { timeout_ms: 0 },
            Api::Transport(e) => CoreError::NetworkUnreachable {
                reason: e.to_string(),
            },
            Api::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            Api::Http { status } => CoreError::GatewayHttp { status },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid gateway address: {e}"),
            },
            Api::StructuralParse { container } => CoreError::StructuralParseFailure {
                container: container.to_owned(),
            },
            Api::Store(message) => CoreError::Internal(format!("state store: {message}")),
        }
    }
}
