use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadGenError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid duration {value:?}: {source}")]
    InvalidInterval {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to create request: {0}")]
    InvalidRequest(#[source] reqwest::Error),

    #[error("Failed to send request: {0}")]
    Request(#[source] reqwest::Error),
}
