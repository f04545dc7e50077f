//! Upstream media catalog: the `CatalogClient` trait and its HTTP
//! implementation, plus the wire types and telemetry payloads it exchanges.

mod client;
mod error;
mod models;
mod telemetry;

pub use client::{CatalogClient, HttpCatalogClient};
pub use error::{CatalogError, Result};
pub use models::{CatalogItem, ItemType, ItemsResponse, MediaSource, MediaStream, StreamType, UserData};
pub use telemetry::{
    PlaybackProgressPayload, PlaybackStartPayload, PlaybackStoppedPayload, PlayMethod,
};
