use libphoton::PeerError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Could not connect to the server. {0}")]
    ConnectFailure(String),
    #[error("Timed out after {0:?} waiting for the connection to be established.")]
    ConnectTimeout(Duration),
    #[error("Not connected to the server.")]
    NotConnected,
    #[error("No response to operation {op_code} within {timeout:?}.")]
    RequestTimeout { op_code: u8, timeout: Duration },
    #[error("The connection was lost while waiting for a response to operation {0}.")]
    ConnectionLost(u8),
    #[error("The request for operation {0} was cancelled because the connection is closing.")]
    RequestCancelled(u8),
    #[error("A peer error occurred. {0}")]
    Peer(#[from] PeerError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Could not start a background thread. {0}")]
    Thread(#[from] std::io::Error),
}

impl ServerError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ServerError::Validation(_))
    }
}

/// A response that does not satisfy what the administration operation expects of it. The messages carry the
/// raw response so that operators can see what the server actually sent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{operation} operation error {response}")]
    BadResponse { operation: String, response: String },
    #[error("{operation} response is missing parameter {key}. {response}")]
    MissingParameter { operation: String, key: u8, response: String },
    #[error("{0}")]
    UnexpectedShape(String),
}
