// ── Live gateway ──
//
// The network-backed implementation of the router and device services.
// Gates on the environment verdict, resolves the gateway address through
// discovery, keeps the session alive through the authenticator, and merges
// device listings into the registry.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};
use url::Url;

use homegate_api::{GatewayClient, GatewayDiscovery, Prober, SessionManager};

use crate::advice::ConnectionAdvice;
use crate::auth::Authenticator;
use crate::context::Context;
use crate::error::CoreError;
use crate::model::{Device, MacAddress, RestartOutcome, RouterStatus, TrafficData};
use crate::registry::DeviceRegistry;

/// How long the gateway is typically gone after a restart.
pub const RESTART_DOWNTIME_SECS: u64 = 90;

/// Router and device services backed by the real gateway.
pub struct LiveGateway {
    ctx: Arc<Context>,
    client: Arc<GatewayClient>,
    auth: Arc<Authenticator>,
    discovery: GatewayDiscovery,
    registry: DeviceRegistry,
    advice: RwLock<ConnectionAdvice>,
    /// Set once discovery confirmed the current base URL in this process.
    resolved: AtomicBool,
}

impl LiveGateway {
    /// Build the live stack from the context. Restores any persisted
    /// session and starts the renewal listener when a runtime is present;
    /// no network I/O happens here.
    pub fn new(ctx: Arc<Context>) -> Result<Self, CoreError> {
        let config = &ctx.config;
        let transport = ctx.transport();

        let session = Arc::new(
            SessionManager::new(Arc::clone(&ctx.store)).with_lead_time(config.renewal_lead),
        );
        if session.restore() {
            debug!("restored persisted session");
        }

        let saved = ctx.saved_address();
        let address = saved.clone().unwrap_or_else(|| config.address.clone());
        let client = Arc::new(GatewayClient::new(address, &transport, session)?);

        let mut discovery = GatewayDiscovery::new(Prober::new(&transport)?)
            .with_probe_timeout(ctx.probe_timeout())
            .with_budget(config.discovery_budget)
            .with_last_known_good(saved);
        if let Some(candidates) = &config.candidates {
            discovery = discovery.with_candidates(candidates.clone());
        }

        let auth = Arc::new(
            Authenticator::new(Arc::clone(&client), config.credentials.clone())
                .with_session_lifetime(config.session_lifetime)
                .with_retry(config.retry),
        );
        auth.spawn_renewal_listener();

        let advice = ConnectionAdvice::from_environment(&ctx.environment);

        Ok(Self {
            ctx,
            client,
            auth,
            discovery,
            registry: DeviceRegistry::new(),
            advice: RwLock::new(advice),
            resolved: AtomicBool::new(false),
        })
    }

    pub fn client(&self) -> &Arc<GatewayClient> {
        &self.client
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.auth
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Current gateway address (configured, persisted, or discovered).
    pub fn address(&self) -> Url {
        self.client.base_url()
    }

    /// Latest explanation of whether a live connection is possible.
    pub fn connection_advice(&self) -> ConnectionAdvice {
        self.advice.read().expect("advice lock poisoned").clone()
    }

    fn set_advice(&self, advice: ConnectionAdvice) {
        *self.advice.write().expect("advice lock poisoned") = advice;
    }

    // ── Connection ───────────────────────────────────────────────────

    /// `true` when the gateway answers its login page.
    pub async fn check_connection(&self) -> bool {
        match self.connect().await {
            Ok(address) => {
                debug!(%address, "gateway reachable");
                true
            }
            Err(e) => {
                info!(error = %e, "gateway not reachable");
                false
            }
        }
    }

    /// Environment gate, then address resolution, then a liveness GET of
    /// the login page. Updates the connection advice either way.
    pub async fn connect(&self) -> Result<Url, CoreError> {
        let environment = &self.ctx.environment;
        if environment.is_restricted() {
            self.set_advice(ConnectionAdvice::from_environment(environment));
            return Err(CoreError::EnvironmentRestricted {
                reason: environment.reason.clone(),
            });
        }

        let address = self.resolve_address().await?;

        if let Err(e) = self.client.fetch_login_page().await {
            let err = CoreError::from(e);
            self.set_advice(ConnectionAdvice::from_error(&err));
            return Err(err);
        }

        self.set_advice(ConnectionAdvice::connected(address.as_str()));
        Ok(address)
    }

    async fn resolve_address(&self) -> Result<Url, CoreError> {
        let current = self.client.base_url();
        let mut excluded = HashSet::new();

        if self.resolved.load(Ordering::Acquire) {
            let outcome = self
                .discovery
                .prober()
                .probe(&current, self.discovery.probe_timeout())
                .await;
            if outcome.reachable {
                return Ok(current);
            }
            info!(address = %current, "known-good gateway address stopped answering");
            self.resolved.store(false, Ordering::Release);
            self.discovery.forget();
            excluded.insert(current.clone());
        }

        let Some(found) = self
            .discovery
            .resolve(&self.ctx.config.address, &excluded)
            .await
        else {
            let advice = ConnectionAdvice::unreachable(
                &self.ctx.environment,
                self.discovery.last_probe_error(),
            );
            let reason = advice.reason.clone();
            self.set_advice(advice);
            return Err(CoreError::NetworkUnreachable { reason });
        };

        if found != current {
            info!(from = %current, to = %found, "gateway address corrected");
            self.client.set_base_url(found.clone());
        }
        self.ctx.save_address(&found);
        self.resolved.store(true, Ordering::Release);
        Ok(found)
    }

    // ── Session ──────────────────────────────────────────────────────

    pub async fn authenticate(&self, force: bool) -> bool {
        self.auth.authenticate(force).await
    }

    pub async fn logout(&self) -> Result<(), CoreError> {
        self.auth.logout().await
    }

    // ── Router ───────────────────────────────────────────────────────

    /// Status page facts. Never fails: authentication or fetch problems
    /// yield an all-unknown status.
    pub async fn get_router_info(&self) -> RouterStatus {
        match self.call("status", GatewayClient::status).await {
            Ok(fields) => fields.into(),
            Err(e) => {
                warn!(error = %e, "router status unavailable");
                RouterStatus::unknown()
            }
        }
    }

    /// Ask the gateway to reboot. Retried on network failures up to the
    /// attempt cap; the outcome message names the attempt count on failure.
    pub async fn restart_router(&self) -> RestartOutcome {
        if let Err(e) = self.auth.ensure_session().await {
            return RestartOutcome {
                success: false,
                message: format!("Restart failed: {e}"),
                estimated_downtime_secs: None,
            };
        }

        let client = &*self.client;
        let result = self
            .ctx
            .config
            .retry
            .run("restart", CoreError::is_retryable, |attempt| async move {
                debug!(attempt, "requesting restart");
                client.restart().await.map_err(CoreError::from)
            })
            .await;

        match result {
            Ok(()) => {
                info!("gateway restart initiated");
                RestartOutcome {
                    success: true,
                    message: "Restart initiated".into(),
                    estimated_downtime_secs: Some(RESTART_DOWNTIME_SECS),
                }
            }
            Err(failure) => RestartOutcome {
                success: false,
                message: format!(
                    "Restart failed after {} attempts: {}",
                    failure.attempts, failure.error
                ),
                estimated_downtime_secs: None,
            },
        }
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Fetch the device tables, merge them into the registry, and return
    /// every known device sorted by hostname.
    pub async fn get_devices(&self) -> Result<Vec<Device>, CoreError> {
        let entries = self.call("devices", GatewayClient::list_devices).await?;
        let fresh: Vec<Device> = entries.into_iter().map(Device::from).collect();
        self.registry.apply_refresh(fresh);
        Ok(self.registry.snapshot())
    }

    pub async fn block_device(&self, mac: &MacAddress) -> bool {
        self.set_blocked(mac, true).await
    }

    pub async fn unblock_device(&self, mac: &MacAddress) -> bool {
        self.set_blocked(mac, false).await
    }

    async fn set_blocked(&self, mac: &MacAddress, blocked: bool) -> bool {
        let wire = mac.as_str().to_uppercase();
        let operation = if blocked { "block" } else { "unblock" };
        match self
            .call(operation, |client| client.set_device_blocked(&wire, blocked))
            .await
        {
            Ok(true) => {
                self.registry.set_blocked(mac, blocked);
                info!(%mac, blocked, "device access updated");
                true
            }
            Ok(false) => {
                warn!(%mac, blocked, "gateway refused the change");
                false
            }
            Err(e) => {
                warn!(%mac, blocked, error = %e, "device access change failed");
                false
            }
        }
    }

    /// Byte counters for one device.
    pub async fn get_traffic_data(&self, mac: &MacAddress) -> Result<TrafficData, CoreError> {
        let entries = self.call("traffic", GatewayClient::traffic).await?;
        entries
            .into_iter()
            .map(TrafficData::from)
            .find(|t| t.mac == *mac)
            .ok_or_else(|| CoreError::DeviceNotFound {
                mac: mac.to_string(),
            })
    }

    // ── Protected calls ──────────────────────────────────────────────

    /// Run a protected request with a live session and bounded retries. A
    /// session the gateway rejects mid-call triggers one re-login and one
    /// more round.
    async fn call<'c, T, F, Fut>(&'c self, operation: &str, request: F) -> Result<T, CoreError>
    where
        F: Fn(&'c GatewayClient) -> Fut,
        Fut: Future<Output = Result<T, homegate_api::Error>>,
    {
        self.auth.ensure_session().await?;
        match self.retried(operation, &request).await {
            Err(CoreError::SessionExpired) => {
                info!(operation, "session rejected, logging in again");
                self.auth.session().clear();
                self.auth.auto_relogin().await?;
                self.retried(operation, &request).await
            }
            other => other,
        }
    }

    async fn retried<'c, T, F, Fut>(&'c self, operation: &str, request: &F) -> Result<T, CoreError>
    where
        F: Fn(&'c GatewayClient) -> Fut,
        Fut: Future<Output = Result<T, homegate_api::Error>>,
    {
        let client: &'c GatewayClient = &self.client;
        self.ctx
            .config
            .retry
            .run(operation, CoreError::is_retryable, |_| {
                let pending = request(client);
                async move { pending.await.map_err(CoreError::from) }
            })
            .await
            .map_err(|failure| failure.error)
    }
}

impl std::fmt::Debug for LiveGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveGateway")
            .field("address", &self.client.base_url().as_str())
            .field("devices", &self.registry.len())
            .finish_non_exhaustive()
    }
}
