//! Blocking administration client for Photon server applications.
//!
//! A [`Connection`] drives a callback-based [`PhotonPeer`](libphoton::PhotonPeer) from a background
//! [`ServiceLoop`] and turns its callbacks into blocking request/response calls. [`PhotonServer`] builds the
//! administration tasks on top: reading a server's properties and draining it before it is stopped.
mod bridge;
pub mod cancel;
pub mod component;
pub mod connection;
pub mod drain;
pub mod errors;
mod listener;
pub mod loopback;
pub mod options;
pub mod properties;
pub mod server;
pub mod service_loop;
mod session;

pub use cancel::CancelToken;
pub use component::{ComponentProperties, EntityRef};
pub use connection::{Connection, Endpoint};
pub use drain::{DrainDelegate, DrainHandle, DrainOptions, DrainOutcome, DrainStage, FnDelegate};
pub use errors::{ServerError, ValidationError};
pub use loopback::{LoopbackModel, LoopbackPeer, LoopbackProbe};
pub use options::ServerOptions;
pub use properties::{get_server_properties, load_server_properties};
pub use server::PhotonServer;
pub use service_loop::ServiceLoop;
