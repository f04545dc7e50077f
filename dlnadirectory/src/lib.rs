//! ContentDirectory and ConnectionManager control-point logic: SOAP dispatch,
//! `ObjectID` resolution against a [`dlnacatalog::CatalogClient`], DIDL-Lite
//! assembly, and the static ConnectionManager responses, per §4.3/§4.2 of the
//! specification.

mod classmap;
mod didl;
mod objectid;
mod sort;

pub mod connection_manager;
pub mod content_directory;
pub mod error;

pub use connection_manager::ConnectionManager;
pub use content_directory::ContentDirectory;
pub use error::{DirectoryError, Result};
pub use objectid::ObjectId;
