use thiserror::Error;

/// Fatal configuration problems. Any of these abort startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("required configuration key {0} is missing or empty")]
    MissingKey(&'static str),

    #[error("configuration key {key} must be an integer in [1, 65535], got {value:?}")]
    InvalidPort { key: &'static str, value: String },

    #[error("configuration key {key} must be an absolute URL: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("configuration key {key} must be a UUID: {source}")]
    InvalidUuid {
        key: &'static str,
        #[source]
        source: uuid::Error,
    },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
