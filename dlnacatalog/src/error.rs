use thiserror::Error;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Failures talking to the upstream catalog. Per §7's `UpstreamError`
/// taxonomy: logged by the caller, never fatal — Browse falls back to an
/// empty result and streaming forwards the upstream status unchanged.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("catalog returned {status} for {endpoint}: {body}")]
    Upstream {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("catalog item not found: {0}")]
    NotFound(String),
}

impl CatalogError {
    /// Maps transport-level failures to 502, otherwise preserves the
    /// upstream's own status code, per §7.
    pub fn as_http_status(&self) -> u16 {
        match self {
            CatalogError::Http(_) | CatalogError::InvalidUrl(_) => 502,
            CatalogError::Upstream { status, .. } => *status,
            CatalogError::NotFound(_) => 404,
        }
    }
}
