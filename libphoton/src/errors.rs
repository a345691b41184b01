use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("The connection attempt was rejected. {0}")]
    ConnectRejected(String),
    #[error("The peer is not connected.")]
    NotConnected,
    #[error("No listener has been registered with the peer.")]
    NoListener,
}
