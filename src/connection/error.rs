use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to resolve {host}:{port}: {message}")]
    Resolve {
        host: String,
        port: u16,
        message: String,
    },

    #[error("Handshake error: {0}")]
    Handshake(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("Timeout: {operation} did not finish within {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    #[error("Not connected to the remote service")]
    NotConnected,
}

pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds,
        }
    }
}
