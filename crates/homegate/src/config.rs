//! CLI flag overrides on top of `homegate_config` profiles, and the runtime
//! context handed to the core.
//!
//! Core never sees profile types -- it receives a pre-built `Context`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use homegate_api::{JsonFileStore, KeyValueStore, MemoryStore};
use homegate_config::{Config, Profile};
use homegate_core::{Context, Credentials, HostEnvironment, RouterConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The active profile. An explicitly requested profile must exist; the
/// default one may be absent, in which case flags and defaults apply.
pub fn active_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    match config.profiles.get(&name) {
        Some(profile) => Ok((name, profile.clone())),
        None if global.profile.is_some() => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            })
        }
        None => Ok((name, Profile::default())),
    }
}

/// A `RouterConfig` plus the profile facts commands still need.
#[derive(Debug)]
pub struct Resolved {
    pub profile: String,
    /// Configured username, even when no password could be resolved.
    pub username: Option<String>,
    pub config: RouterConfig,
}

/// Translate the active profile + global flags into a `RouterConfig`.
///
/// This is the single boundary where CLI config types cross into core types.
pub fn build_router_config(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = homegate_config::load_config_or_default();
    let (name, mut profile) = active_profile(global, &cfg)?;

    // Flags override the profile before credential resolution.
    if let Some(ref address) = global.address {
        profile.address.clone_from(address);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    profile.mock |= global.mock;
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    let username = profile.username.clone();

    let mut config = match homegate_config::profile_to_router_config(&profile, &name) {
        Ok(config) => config,
        // Without a password the gateway can still be probed; commands that
        // need a session report the missing credentials themselves.
        Err(homegate_config::ConfigError::NoCredentials { .. }) => {
            debug!(profile = %name, "no password resolved");
            let stripped = Profile {
                username: None,
                ..profile
            };
            homegate_config::profile_to_router_config(&stripped, &name)?
        }
        Err(e) => return Err(e.into()),
    };

    config.request_timeout = Duration::from_secs(timeout);

    Ok(Resolved {
        profile: name,
        username,
        config,
    })
}

/// Attach credentials obtained interactively.
pub fn with_credentials(mut config: RouterConfig, credentials: Credentials) -> RouterConfig {
    config.credentials = Some(credentials);
    config
}

/// Build the runtime context: host environment and the persisted state
/// store. Mock runs keep state in memory.
pub fn build_context(config: RouterConfig) -> Context {
    let store: Arc<dyn KeyValueStore> = if config.mock {
        Arc::new(MemoryStore::new())
    } else {
        let path = homegate_config::state_path();
        match JsonFileStore::open(&path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "state file unusable, keeping state in memory");
                Arc::new(MemoryStore::new())
            }
        }
    };
    Context::new(config, &HostEnvironment, store)
}
