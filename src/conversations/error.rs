use thiserror::Error;

use crate::connection::TransportError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Response returned with status: {status}")]
    Protocol { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;

impl ChatError {
    /// HTTP status of a non-200 reply.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the connection itself failed, so the caller should reconnect
    /// before trying again.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChatError::Transport(_))
    }
}
