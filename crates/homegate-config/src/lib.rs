//! Shared configuration for the homegate CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), the
//! persisted state file location, and translation to
//! `homegate_core::RouterConfig`. The CLI adds flag-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use homegate_core::config::DEFAULT_ADDRESS;
use homegate_core::{Credentials, RouterConfig};

/// Keyring service name for stored passwords.
const KEYRING_SERVICE: &str = "homegate";

/// Environment variable consulted for the password when the profile names
/// none of its own.
pub const PASSWORD_ENV: &str = "HOMEGATE_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// The named profile, or the default one. A missing default profile
    /// yields an empty profile pointing at the default address.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        match name {
            Some(name) => self
                .profiles
                .get(name)
                .cloned()
                .map(|p| (name.to_owned(), p))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() }),
            None => {
                let name = self.default_profile.clone().unwrap_or_else(|| "default".into());
                let profile = self.profiles.get(&name).cloned().unwrap_or_default();
                Ok((name, profile))
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named gateway profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Gateway base URL (e.g., "http://10.0.0.1/").
    #[serde(default = "default_address")]
    pub address: String,

    /// Admin username.
    pub username: Option<String>,

    /// Admin password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Serve fixture data instead of talking to a gateway.
    #[serde(default)]
    pub mock: bool,

    /// Override the request timeout, in seconds.
    pub timeout: Option<u64>,

    pub probe_timeout_ms: Option<u64>,

    pub session_lifetime_secs: Option<u64>,

    /// Discovery candidates, tried after the configured address.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            address: default_address(),
            username: None,
            password: None,
            password_env: None,
            mock: false,
            timeout: None,
            probe_timeout_ms: None,
            session_lifetime_secs: None,
            candidates: Vec::new(),
        }
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("rs", "homegate", "homegate")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where session, cookies and the known-good address are persisted.
pub fn state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state.json"),
        |dirs| dirs.data_dir().join("state.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("homegate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. Layers: built-in defaults, then the TOML
/// file (if present), then `HOMEGATE_`-prefixed environment variables
/// (`__` separates nested keys, e.g. `HOMEGATE_DEFAULTS__TIMEOUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HOMEGATE_").split("__"));

    Ok(figment.extract()?)
}

/// Load config, returning a default if the file doesn't exist or is bad.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

/// Resolve the password: the profile's `password_env`, then
/// `HOMEGATE_PASSWORD`, then the keyring, then plaintext in the config.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env vars
    let env_names = profile.password_env.as_deref().into_iter().chain([PASSWORD_ENV]);
    for name in env_names {
        if let Ok(pw) = std::env::var(name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Credentials for the profile, or `None` when no username is configured.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<Credentials>, ConfigError> {
    let Some(username) = profile
        .username
        .clone()
        .or_else(|| std::env::var("HOMEGATE_USERNAME").ok())
    else {
        return Ok(None);
    };
    let password = resolve_password(profile, profile_name)?;
    Ok(Some(Credentials { username, password }))
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `RouterConfig` from a profile -- no CLI flag overrides.
///
/// Mock profiles skip credential resolution entirely.
pub fn profile_to_router_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<RouterConfig, ConfigError> {
    let address = parse_url("address", &profile.address)?;
    let mut config = RouterConfig::new(address);

    config.mock = profile.mock;
    if !profile.mock {
        config.credentials = resolve_credentials(profile, profile_name)?;
    }
    if let Some(secs) = profile.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    config.probe_timeout = profile.probe_timeout_ms.map(Duration::from_millis);
    if let Some(secs) = profile.session_lifetime_secs {
        config.session_lifetime = Duration::from_secs(secs);
    }
    if !profile.candidates.is_empty() {
        let candidates = profile
            .candidates
            .iter()
            .map(|raw| parse_url("candidates", raw))
            .collect::<Result<Vec<_>, _>>()?;
        config.candidates = Some(candidates);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::ExposeSecret;

    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.output, "table");

        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile.address, DEFAULT_ADDRESS);
    }

    #[test]
    fn profiles_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "home"

[defaults]
output = "json"

[profiles.home]
address = "http://192.168.0.1/"
username = "admin"
password = "plain"
password_env = "HOMEGATE_TEST_UNSET_VARIABLE"
timeout = 5
probe_timeout_ms = 800
session_lifetime_secs = 600
candidates = ["http://192.168.1.1/"]
"#,
        );

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.defaults.output, "json");
        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "home");

        let router = profile_to_router_config(&profile, "homegate-test-profile").unwrap();
        assert_eq!(router.address.as_str(), "http://192.168.0.1/");
        assert_eq!(router.request_timeout, Duration::from_secs(5));
        assert_eq!(router.probe_timeout, Some(Duration::from_millis(800)));
        assert_eq!(router.session_lifetime, Duration::from_secs(600));
        assert_eq!(router.candidates.unwrap().len(), 1);

        let credentials = router.credentials.unwrap();
        assert_eq!(credentials.username, "admin");
        assert!(!credentials.password.expose_secret().is_empty());
    }

    #[test]
    fn mock_profile_needs_no_password() {
        let profile = Profile {
            username: Some("admin".into()),
            mock: true,
            ..Profile::default()
        };
        let router = profile_to_router_config(&profile, "homegate-test-mock").unwrap();
        assert!(router.mock);
        assert!(router.credentials.is_none());
    }

    #[test]
    fn bad_address_is_a_validation_error() {
        let profile = Profile {
            address: "not a url".into(),
            ..Profile::default()
        };
        let err = profile_to_router_config(&profile, "x").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "address"));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let err = Config::default().profile(Some("office")).unwrap_err();
        assert!(err.to_string().contains("office"));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                address: "http://10.1.1.1/".into(),
                ..Profile::default()
            },
        );

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].address, "http://10.1.1.1/");
    }
}
