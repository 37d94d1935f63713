// Gateway admin endpoints
//
// Hand-written client for the gateway's HTML admin surface. Transport
// mechanics live in `client`; each endpoint family is an inherent-method
// file on `GatewayClient`.

pub mod auth;
pub mod client;
pub mod devices;
pub mod system;

pub use client::{GatewayClient, Page};

// ── Paths ────────────────────────────────────────────────────────────

/// Login page; also used as the liveness check.
pub const LOGIN_PAGE_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/check.jst";
pub const LOGOUT_PATH: &str = "/home_loggedout.jst";
/// Cheap protected page used to verify a session.
pub const PROTECTED_PATH: &str = "/at_a_glance.jst";
pub const DEVICES_PATH: &str = "/connected_devices_computers.jst";
pub const STATUS_PATH: &str = "/network_setup.jst";
pub const TRAFFIC_PATH: &str = "/network_traffic.jst";
pub const MANAGED_DEVICES_PATH: &str = "/actionHandler/ajax_managed_devices.jst";
pub const RESTART_PATH: &str = "/actionHandler/ajaxSet_Reset_Restore.jst";

// ── Markers ──────────────────────────────────────────────────────────

/// A `Location` header containing one of these sends the browser back to
/// the login screen.
pub const LOGIN_REDIRECT_TARGETS: &[&str] = &["home_loggedout.jst", "index.jst"];

/// Body fragments that only appear on the login screen or on the script
/// stub that bounces an unauthenticated browser to it.
pub const LOGIN_PAGE_MARKERS: &[&str] = &[
    r#"name="loginForm""#,
    r#"location.href="home_loggedout.jst""#,
    r#"location.href = "home_loggedout.jst""#,
];

/// Body fragments the firmware prints when it rejects credentials.
pub const LOGIN_FAILURE_MARKERS: &[&str] = &[
    "Incorrect user name or password",
    "incorrect password",
    "Login failed",
    "too many failed attempts",
];
