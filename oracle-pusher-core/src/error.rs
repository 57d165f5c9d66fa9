use std::fmt;

/// Failure classes of a push cycle. Each carries the underlying cause.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Missing or unreadable configuration or key file.
    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),

    /// Market data could not be retrieved, parsed, or was rejected upstream.
    #[error("price fetch error: {0:#}")]
    PriceFetch(anyhow::Error),

    /// Input to the builder violated its preconditions.
    #[error("validation error: {0}")]
    Validation(String),

    /// The action arguments could not be ABI-encoded.
    #[error("encoding error: {0:#}")]
    Encoding(anyhow::Error),

    /// Key material was unusable or the signature could not be produced.
    #[error("signing error: {0:#}")]
    Signing(anyhow::Error),

    /// The chain RPC could not be reached or rejected the transaction.
    #[error("broadcast error: {0:#}")]
    Broadcast(anyhow::Error),
}

impl PushError {
    /// Short name of the error class, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            PushError::Config(_) => "ConfigError",
            PushError::PriceFetch(_) => "PriceFetchError",
            PushError::Validation(_) => "ValidationError",
            PushError::Encoding(_) => "EncodingError",
            PushError::Signing(_) => "SigningError",
            PushError::Broadcast(_) => "BroadcastError",
        }
    }
}

pub type PushResult<T> = std::result::Result<T, PushError>;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadKey,
    FetchPrice,
    BuildTransaction,
    Broadcast,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadKey => "LoadKey",
            Stage::FetchPrice => "FetchPrice",
            Stage::BuildTransaction => "BuildTransaction",
            Stage::Broadcast => "Broadcast",
        };
        f.write_str(name)
    }
}
