use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

/// Failures the stream proxy can hit before it has committed to a session.
/// Per §7, all of these degrade to an HTTP status on the streaming
/// response; none of them are UPnP faults.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("catalog lookup failed: {0}")]
    Catalog(#[from] dlnacatalog::CatalogError),

    #[error("item {0} has no media source to stream")]
    NoMediaSource(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

impl StreamError {
    /// The HTTP status this failure renders as, per §7's `UpstreamError`
    /// policy (transport failures map to 502, upstream status otherwise).
    pub fn as_http_status(&self) -> u16 {
        match self {
            StreamError::Catalog(err) => err.as_http_status(),
            StreamError::NoMediaSource(_) => 502,
            StreamError::Upstream(_) => 502,
        }
    }
}
