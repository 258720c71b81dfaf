use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for graphbridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BridgeError {
    /// The envelope-level kind of this error.
    ///
    /// Configuration problems only occur at startup; if one ever reaches an
    /// envelope it is reported as a connection failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Config(_) | Self::Connection(_) => ErrorKind::Connection,
            Self::Execution(_) => ErrorKind::Execution,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Failure categories reported in a failure envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing arguments, unsafe identifiers.
    Validation,
    /// Store unreachable or authentication failure.
    Connection,
    /// The store rejected or timed out the statement.
    Execution,
    /// A returned value could not be normalized.
    Serialization,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_one_to_one() {
        assert_eq!(BridgeError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(BridgeError::Connection("x".into()).kind(), ErrorKind::Connection);
        assert_eq!(BridgeError::Execution("x".into()).kind(), ErrorKind::Execution);
        assert_eq!(
            BridgeError::Serialization("x".into()).kind(),
            ErrorKind::Serialization
        );
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Serialization).unwrap();
        assert_eq!(json, "\"serialization\"");
    }
}
