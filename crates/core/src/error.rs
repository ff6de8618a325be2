use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host environment refused to create a provider global.
    #[error("Environment error: {0}")]
    Environment(String),

    /// Track properties could not be read as an order.
    #[error("Invalid event properties: {0}")]
    Properties(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Settings validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
