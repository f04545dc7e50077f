//! SSDP discovery: multicast M-SEARCH responder and `ssdp:alive`/`ssdp:byebye`
//! advertisement, per §4.1 of the specification.

mod engine;
mod error;

pub use engine::{SsdpEngine, SsdpHandle};
pub use error::SsdpError;

/// SSDP multicast group address.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// SSDP well-known port.
pub const SSDP_PORT: u16 = 1900;

/// `CACHE-CONTROL: max-age` advertised in every alive/M-SEARCH response.
pub const MAX_AGE: u32 = 1800;

/// How often `ssdp:alive` is re-advertised.
pub const ADVERTISE_PERIOD_SECS: u64 = 25 * 60;

/// Dedup window for repeated M-SEARCH from the same `(ip, port)`.
pub const MSEARCH_DEDUP_WINDOW_SECS: u64 = 2;

/// Sweep interval / eviction age for the dedup table.
pub const DEDUP_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
pub const DEDUP_EVICTION_AGE_SECS: u64 = 10 * 60;

/// How often `BootID.UPNP.ORG` increments.
pub const BOOT_ID_PERIOD_SECS: u64 = 60 * 60;
