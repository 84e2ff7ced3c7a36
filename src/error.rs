//! Errors raised by snapshot parsing and ladder validation.

/// Errors returned by the pure core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The exchange returned something the core cannot trust.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    #[error("invalid offset ladder: {0}")]
    InvalidLadder(String),

    #[error("target rate must be within [0, 1], got {0}")]
    InvalidTargetRate(f64),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::DataIntegrity("orders.base.len() != 1".into()).to_string(),
            "data integrity: orders.base.len() != 1"
        );
        assert_eq!(
            Error::InvalidTargetRate(1.5).to_string(),
            "target rate must be within [0, 1], got 1.5"
        );
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::InvalidLadder("empty".into()));
        assert!(err.to_string().contains("empty"));
    }
}
