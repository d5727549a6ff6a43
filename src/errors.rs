use thiserror::Error;

/// Errors raised between the layers of the licensing gateway.
///
/// None of these reach callers of `LicensingGateway` lookups: the gateway
/// logs them and degrades to `false` / `None`.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("unsupported database backend: {0}")]
    UnsupportedBackend(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
