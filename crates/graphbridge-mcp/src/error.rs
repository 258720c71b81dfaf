use thiserror::Error;

/// Failures of the HTTP server itself, as opposed to operation failures,
/// which always travel inside an envelope.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid bind address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the client shim to complete a remote call.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
