//! Playback session tracking and the HTTP stream proxy: direct-play
//! decisions, upstream URL construction, the instrumented byte pump, and
//! the session/telemetry state machine, per §4.5.

mod direct_play;
mod error;
mod proxy;
mod seek;
mod session;

pub use direct_play::decide as decide_play_method;
pub use error::{StreamError, Result};
pub use proxy::{StreamProxy, StreamRequest};
pub use seek::compute_start_position;
pub use session::{PlaybackSession, PlaybackTracker, StreamProgress};
