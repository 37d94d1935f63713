// ── Explicit runtime context ──
//
// Built once at startup and passed to every backend. Carries the
// configuration, the environment verdict, and the persisted store; nothing
// in the crate reaches for ambient globals.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use url::Url;

use homegate_api::store::ADDRESS_KEY;
use homegate_api::{KeyValueStore, MemoryStore, TransportConfig};

use crate::config::RouterConfig;
use crate::environment::{EnvironmentClassifier, EnvironmentVerdict, HostEnvironment};

/// Everything a backend needs to know about where and how it runs.
pub struct Context {
    pub config: RouterConfig,
    pub environment: EnvironmentVerdict,
    pub store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Classify the environment once and bundle it with config and store.
    pub fn new(
        config: RouterConfig,
        classifier: &dyn EnvironmentClassifier,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            environment: classifier.classify(),
            store,
        }
    }

    /// Host environment and a volatile store.
    pub fn in_memory(config: RouterConfig) -> Self {
        Self::new(config, &HostEnvironment, Arc::new(MemoryStore::new()))
    }

    /// Probe deadline: configured, or the environment's default.
    pub fn probe_timeout(&self) -> Duration {
        self.config
            .probe_timeout
            .unwrap_or_else(|| self.environment.probe_timeout())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig::default().with_timeout(self.config.request_timeout)
    }

    /// Address discovery last persisted, if any.
    pub fn saved_address(&self) -> Option<Url> {
        match self.store.get(ADDRESS_KEY) {
            Ok(raw) => raw.and_then(|s| Url::parse(&s).ok()),
            Err(e) => {
                warn!(error = %e, "failed to read saved gateway address");
                None
            }
        }
    }

    /// Persist a discovered address so the next start skips discovery.
    pub fn save_address(&self, address: &Url) {
        if let Err(e) = self.store.set(ADDRESS_KEY, address.as_str()) {
            warn!(error = %e, "failed to persist gateway address");
        }
    }
}
