//! Small utilities shared across the DLNA workspace: local-IP detection and
//! the tick/duration conversions UPnP resources and playback positions use.

mod duration;
mod ip_utils;
pub mod vendor;
pub mod xml;

pub use duration::{
    DurationParseError, ONE_SECOND_TICKS, format_duration, parse_duration, seconds_to_ticks,
    ticks_to_seconds,
};
pub use ip_utils::guess_local_ip;
pub use vendor::Vendor;
