//! Error types for the market maker.

use std::path::PathBuf;

use ladder_mm_gateway::GatewayError;

/// All errors that can abort a tick or a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings are unusable, or the account drifted too far from target to start.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The exchange answered with data the core cannot trust.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("notification failed: {0}")]
    Notify(String),
}

impl From<ladder_mm::Error> for Error {
    fn from(err: ladder_mm::Error) -> Self {
        match err {
            ladder_mm::Error::DataIntegrity(msg) => Error::DataIntegrity(msg),
            other => Error::Configuration(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_taxonomy() {
        let err: Error = ladder_mm::Error::DataIntegrity("two best bids".into()).into();
        assert!(matches!(err, Error::DataIntegrity(msg) if msg == "two best bids"));

        let err: Error = ladder_mm::Error::InvalidTargetRate(2.0).into();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn gateway_errors_pass_through() {
        let err: Error = GatewayError::RateLimit.into();
        assert_eq!(err.to_string(), "gateway error: rate limit exceeded");
    }
}
