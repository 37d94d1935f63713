// HTML extraction
//
// Turns the gateway's hand-written admin pages into typed records. Only a
// missing container fails a call; individual rows and fields degrade on
// their own.

pub mod devices;
pub mod html;
pub mod status;
pub mod traffic;

pub use devices::{extract_devices, sort_devices};
pub use status::extract_status;
pub use traffic::extract_traffic;
