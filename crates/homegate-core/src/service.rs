// ── Service contracts ──
//
// The two capability traits consumers program against, and the tagged
// backend that implements them either over the network or from fixtures.

use std::sync::Arc;

use async_trait::async_trait;
use strum::Display;
use tracing::info;

use crate::advice::ConnectionAdvice;
use crate::context::Context;
use crate::error::CoreError;
use crate::fixture::FixtureGateway;
use crate::live::LiveGateway;
use crate::model::{Device, MacAddress, RestartOutcome, RouterStatus, TrafficData};

/// Gateway-level operations.
#[async_trait]
pub trait RouterService: Send + Sync {
    /// `true` when the gateway can be talked to right now.
    async fn check_connection(&self) -> bool;

    /// `true` when a session is usable afterwards.
    async fn authenticate(&self, force: bool) -> bool;

    /// Status page facts; all-unknown when unavailable.
    async fn get_router_info(&self) -> RouterStatus;

    async fn restart_router(&self) -> RestartOutcome;

    /// End the session. A no-op for backends without one.
    async fn logout(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Why a live connection is or is not possible.
    fn connection_advice(&self) -> ConnectionAdvice;
}

/// Per-device operations.
#[async_trait]
pub trait DeviceService: Send + Sync {
    /// Every known device, sorted by hostname.
    async fn get_devices(&self) -> Result<Vec<Device>, CoreError>;

    async fn block_device(&self, mac: &MacAddress) -> bool;

    async fn unblock_device(&self, mac: &MacAddress) -> bool;

    async fn get_traffic_data(&self, mac: &MacAddress) -> Result<TrafficData, CoreError>;
}

/// Which implementation is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    Live,
    Fixture,
}

/// The implementation chosen at startup.
#[derive(Debug)]
pub enum Backend {
    Live(LiveGateway),
    Fixture(FixtureGateway),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Live(_) => BackendKind::Live,
            Self::Fixture(_) => BackendKind::Fixture,
        }
    }

    pub fn as_live(&self) -> Option<&LiveGateway> {
        match self {
            Self::Live(live) => Some(live),
            Self::Fixture(_) => None,
        }
    }
}

/// Pick the fixture or the live backend.
pub fn select_backend(ctx: Arc<Context>, use_fixture: bool) -> Result<Backend, CoreError> {
    if use_fixture {
        info!("using fixture backend");
        Ok(Backend::Fixture(FixtureGateway::seeded(ctx.config.fixture_latency)))
    } else {
        Ok(Backend::Live(LiveGateway::new(ctx)?))
    }
}

#[async_trait]
impl RouterService for Backend {
    async fn check_connection(&self) -> bool {
        match self {
            Self::Live(live) => live.check_connection().await,
            Self::Fixture(fixture) => fixture.check_connection().await,
        }
    }

    async fn authenticate(&self, force: bool) -> bool {
        match self {
            Self::Live(live) => live.authenticate(force).await,
            Self::Fixture(fixture) => fixture.authenticate(force).await,
        }
    }

    async fn get_router_info(&self) -> RouterStatus {
        match self {
            Self::Live(live) => live.get_router_info().await,
            Self::Fixture(fixture) => fixture.get_router_info().await,
        }
    }

    async fn restart_router(&self) -> RestartOutcome {
        match self {
            Self::Live(live) => live.restart_router().await,
            Self::Fixture(fixture) => fixture.restart_router().await,
        }
    }

    async fn logout(&self) -> Result<(), CoreError> {
        match self {
            Self::Live(live) => live.logout().await,
            Self::Fixture(_) => Ok(()),
        }
    }

    fn connection_advice(&self) -> ConnectionAdvice {
        match self {
            Self::Live(live) => live.connection_advice(),
            Self::Fixture(_) => ConnectionAdvice {
                can_connect: true,
                reason: "Mock mode: serving fixture data".into(),
                suggestions: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl DeviceService for Backend {
    async fn get_devices(&self) -> Result<Vec<Device>, CoreError> {
        match self {
            Self::Live(live) => live.get_devices().await,
            Self::Fixture(fixture) => fixture.get_devices().await,
        }
    }

    async fn block_device(&self, mac: &MacAddress) -> bool {
        match self {
            Self::Live(live) => live.block_device(mac).await,
            Self::Fixture(fixture) => fixture.block_device(mac).await,
        }
    }

    async fn unblock_device(&self, mac: &MacAddress) -> bool {
        match self {
            Self::Live(live) => live.unblock_device(mac).await,
            Self::Fixture(fixture) => fixture.unblock_device(mac).await,
        }
    }

    async fn get_traffic_data(&self, mac: &MacAddress) -> Result<TrafficData, CoreError> {
        match self {
            Self::Live(live) => live.get_traffic_data(mac).await,
            Self::Fixture(fixture) => fixture.get_traffic_data(mac).await,
        }
    }
}
