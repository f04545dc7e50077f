//! Device profile matching: `DeviceProfile` records and the `ProfileMatcher`
//! that picks one for an incoming renderer, per §4.4.

mod error;
mod matcher;
mod models;
mod store;

pub use error::{ProfileError, Result};
pub use matcher::ProfileMatcher;
pub use models::{DeviceProfile, DirectPlayRule, TranscodingRule};
pub use store::{InMemoryProfileStore, ProfileStore};
