// ── Gateway façade ──
//
// What the CLI talks to. Holds the active backend behind an `ArcSwap` and
// flips to the fixture backend when the live one cannot reach a gateway,
// keeping the advice that explains why.

use std::sync::{Arc, RwLock};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::advice::ConnectionAdvice;
use crate::context::Context;
use crate::error::CoreError;
use crate::fixture::FixtureGateway;
use crate::model::{Device, MacAddress, RestartOutcome, RouterStatus, TrafficData};
use crate::service::{Backend, BackendKind, DeviceService, RouterService, select_backend};

/// Router and device services with automatic fallback to fixtures.
pub struct Gateway {
    ctx: Arc<Context>,
    active: ArcSwap<Backend>,
    fallback: RwLock<Option<ConnectionAdvice>>,
}

impl Gateway {
    /// Choose the initial backend: fixtures when mock mode is configured or
    /// the environment forbids local network access, live otherwise.
    pub fn new(ctx: Arc<Context>) -> Result<Self, CoreError> {
        let restricted = ctx.environment.is_restricted();
        let backend = select_backend(Arc::clone(&ctx), ctx.config.mock || restricted)?;

        let fallback = (restricted && !ctx.config.mock).then(|| {
            info!(reason = %ctx.environment.reason, "local network unavailable, serving fixtures");
            ConnectionAdvice::from_environment(&ctx.environment)
        });

        Ok(Self {
            ctx,
            active: ArcSwap::from_pointee(backend),
            fallback: RwLock::new(fallback),
        })
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    pub fn backend(&self) -> Arc<Backend> {
        self.active.load_full()
    }

    pub fn kind(&self) -> BackendKind {
        self.active.load().kind()
    }

    /// Whether the fixture backend replaced the live one.
    pub fn is_fallback(&self) -> bool {
        self.fallback_advice().is_some()
    }

    /// Why the fixture backend is serving, when it took over.
    pub fn fallback_advice(&self) -> Option<ConnectionAdvice> {
        self.fallback.read().expect("fallback lock poisoned").clone()
    }

    fn fall_back(&self, advice: ConnectionAdvice) {
        warn!(reason = %advice.reason, "switching to fixture backend");
        self.active
            .store(Arc::new(Backend::Fixture(FixtureGateway::seeded(self.ctx.config.fixture_latency))));
        *self.fallback.write().expect("fallback lock poisoned") = Some(advice);
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("kind", &self.kind())
            .field("fallback", &self.is_fallback())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RouterService for Gateway {
    /// Live connection check. When the environment is restricted or no
    /// gateway answers, the fixture backend takes over for later calls and
    /// this returns `false`.
    async fn check_connection(&self) -> bool {
        let backend = self.active.load_full();
        let Backend::Live(live) = &*backend else {
            return backend.check_connection().await;
        };

        match live.connect().await {
            Ok(_) => true,
            Err(
                CoreError::EnvironmentRestricted { .. }
                | CoreError::NetworkUnreachable { .. }
                | CoreError::Timeout { .. },
            ) => {
                self.fall_back(live.connection_advice());
                false
            }
            Err(e) => {
                warn!(error = %e, "connection check failed");
                false
            }
        }
    }

    async fn authenticate(&self, force: bool) -> bool {
        self.active.load_full().authenticate(force).await
    }

    async fn get_router_info(&self) -> RouterStatus {
        self.active.load_full().get_router_info().await
    }

    async fn restart_router(&self) -> RestartOutcome {
        self.active.load_full().restart_router().await
    }

    async fn logout(&self) -> Result<(), CoreError> {
        self.active.load_full().logout().await
    }

    fn connection_advice(&self) -> ConnectionAdvice {
        self.fallback_advice()
            .unwrap_or_else(|| self.active.load().connection_advice())
    }
}

#[async_trait]
impl DeviceService for Gateway {
    async fn get_devices(&self) -> Result<Vec<Device>, CoreError> {
        self.active.load_full().get_devices().await
    }

    async fn block_device(&self, mac: &MacAddress) -> bool {
        self.active.load_full().block_device(mac).await
    }

    async fn unblock_device(&self, mac: &MacAddress) -> bool {
        self.active.load_full().unblock_device(mac).await
    }

    async fn get_traffic_data(&self, mac: &MacAddress) -> Result<TrafficData, CoreError> {
        self.active.load_full().get_traffic_data(mac).await
    }
}
