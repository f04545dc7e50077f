//! `DlnaServer`: the Axum router wiring every control endpoint of §4.2,
//! composed from `dlnaupnp`'s SSDP engine and device description,
//! `dlnadirectory`'s ContentDirectory/ConnectionManager, and `dlnastream`'s
//! StreamProxy, with its own subscription registry and subtitle proxy.

pub mod logs;
mod server;
mod subscriptions;
mod subtitle;

pub use server::{DlnaServer, DlnaServerBuilder, DlnaServerHandle};
