// ── Domain model ──
//
// Canonical types handed to consumers. Both backends produce exactly these.

pub mod device;
pub mod mac;
pub mod status;

pub use device::{Addressing, Band, Device, LinkType, sort_by_hostname};
pub use mac::MacAddress;
pub use status::{LoginOutcome, RestartOutcome, RouterStatus, TrafficData};
