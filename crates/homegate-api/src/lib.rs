// homegate-api: async client for a home gateway's HTML admin interface
//
// Discovery and probing, cookie/session management, and extraction of
// typed records from the admin pages.

pub mod discovery;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod models;
pub mod probe;
pub mod session;
pub mod store;
pub mod transport;

pub use discovery::GatewayDiscovery;
pub use error::Error;
pub use gateway::{GatewayClient, Page};
pub use models::{DeviceEntry, StatusFields, TrafficEntry};
pub use probe::{ProbeError, ProbeMethod, ProbeOutcome, Prober};
pub use session::{Session, SessionManager, SessionState};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use transport::TransportConfig;
