//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use homegate_config::ConfigError;
use homegate_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the gateway: {reason}")]
    #[diagnostic(
        code(homegate::connection_failed),
        help(
            "Check that this machine is on the gateway's network.\n\
             Run: homegate advice\n\
             Or use --mock to explore with sample data."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Local network access is not available here")]
    #[diagnostic(code(homegate::environment_restricted), help("{reason}"))]
    EnvironmentRestricted { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(homegate::auth_failed),
        help(
            "Verify the username and password for this profile.\n\
             Run: homegate config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("Session expired")]
    #[diagnostic(code(homegate::session_expired), help("Run: homegate login"))]
    SessionExpired,

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(homegate::no_credentials),
        help(
            "Configure credentials with: homegate config init\n\
             Or set HOMEGATE_USERNAME and HOMEGATE_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(homegate::not_found),
        help("Run: homegate {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Gateway ──────────────────────────────────────────────────────
    #[error("Unexpected page layout: {container} not found")]
    #[diagnostic(
        code(homegate::page_layout),
        help("The gateway firmware may not be supported. Rerun with -vv for details.")
    )]
    PageLayout { container: String },

    #[error("The gateway answered HTTP {status}")]
    #[diagnostic(
        code(homegate::gateway_status),
        help(
            "The gateway is reachable but did not serve the page.\n\
             Run: homegate advice"
        )
    )]
    GatewayStatus { status: u16 },

    #[error("{message}")]
    #[diagnostic(code(homegate::operation_failed))]
    OperationFailed { message: String },

    #[error("Operation '{operation}' is not supported")]
    #[diagnostic(code(homegate::unsupported))]
    Unsupported { operation: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(homegate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(homegate::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: homegate config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(homegate::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(homegate::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("The gateway did not answer in time")]
    #[diagnostic(
        code(homegate::timeout),
        help("Increase timeout with --timeout or check that the gateway is responsive.")
    )]
    Timeout,

    // ── IO / Internal ────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(homegate::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::EnvironmentRestricted { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::SessionExpired | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::GatewayStatus { status } if *status >= 500 => exit_code::CONNECTION,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NetworkUnreachable { reason } => CliError::ConnectionFailed { reason },
            CoreError::EnvironmentRestricted { reason } => CliError::EnvironmentRestricted { reason },
            CoreError::Timeout { .. } => CliError::Timeout,
            CoreError::GatewayHttp { status } => CliError::GatewayStatus { status },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "current".into(),
                message,
            },
            CoreError::SessionExpired => CliError::SessionExpired,
            CoreError::StructuralParseFailure { container } => CliError::PageLayout { container },
            CoreError::DeviceNotFound { mac } => CliError::NotFound {
                resource_type: "device".into(),
                identifier: mac,
                list_command: "devices list".into(),
            },
            CoreError::Unsupported { operation } => CliError::Unsupported { operation },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(other),
        }
    }
}
