//! Protocol primitives for administering Photon server applications.
//!
//! This crate holds the data model exchanged with a server (parameter [`Value`]s, operation requests,
//! responses and events), the protocol constants the administration operations use, and the
//! [`PhotonPeer`] / [`PeerListener`] traits through which a transport is plugged in.
pub mod application;
pub mod codes;
pub mod errors;
pub mod operation;
pub mod peer;
pub mod value;

pub use application::{Application, UnknownApplication};
pub use codes::{DebugLevel, StatusCode};
pub use errors::PeerError;
pub use operation::{EventData, OperationRequest, OperationResponse};
pub use peer::{PeerListener, PhotonPeer};
pub use value::{Dictionary, Params, Value};
