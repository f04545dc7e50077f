use thiserror::Error;

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Failures the ContentDirectory/ConnectionManager control endpoints can
/// hit, paired one-to-one with the UPnP fault they render as.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("malformed SOAP request: {0}")]
    MalformedSoap(#[from] dlnaupnp::soap::SoapParseError),

    #[error("unknown action {0:?}")]
    UnknownAction(String),

    #[error("missing required argument {0}")]
    MissingArgument(&'static str),

    #[error("failed to render SOAP response: {0}")]
    Render(#[from] xmltree::Error),

    #[error("failed to render DIDL-Lite result: {0}")]
    DidlRender(#[from] quick_xml::SeError),
}

impl DirectoryError {
    /// The `(errorCode, errorDescription)` pair this failure renders as in
    /// the UPnP fault detail, per §4.3.
    pub fn upnp_error(&self) -> (&'static str, &'static str) {
        match self {
            DirectoryError::MalformedSoap(_)
            | DirectoryError::UnknownAction(_)
            | DirectoryError::MissingArgument(_) => {
                (dlnaupnp::soap::error_codes::INVALID_ACTION, "Invalid Action")
            }
            DirectoryError::Render(_) | DirectoryError::DidlRender(_) => {
                (dlnaupnp::soap::error_codes::ACTION_FAILED, "Action Failed")
            }
        }
    }
}
