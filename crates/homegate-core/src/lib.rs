// homegate-core: session orchestration and router/device services between
// homegate-api and consumers (CLI).

pub mod advice;
pub mod auth;
pub mod config;
pub mod context;
pub mod convert;
pub mod environment;
pub mod error;
pub mod fixture;
pub mod gateway;
pub mod live;
pub mod model;
pub mod registry;
pub mod retry;
pub mod schedule;
pub mod service;

// ── Primary re-exports ──────────────────────────────────────────────
pub use advice::ConnectionAdvice;
pub use auth::Authenticator;
pub use config::{Credentials, RouterConfig};
pub use context::Context;
pub use environment::{
    EnvironmentClassifier, EnvironmentVerdict, FixedEnvironment, HostEnvironment, Platform,
};
pub use error::CoreError;
pub use fixture::FixtureGateway;
pub use gateway::Gateway;
pub use live::LiveGateway;
pub use registry::DeviceRegistry;
pub use retry::RetryPolicy;
pub use schedule::{BlockSchedule, BlockScheduler, BlockWindow, ScheduledChange};
pub use service::{Backend, BackendKind, DeviceService, RouterService, select_backend};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Addressing, Band, Device, LinkType, LoginOutcome, MacAddress, RestartOutcome, RouterStatus,
    TrafficData,
};
