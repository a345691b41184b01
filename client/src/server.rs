use crate::connection::{Connection, Endpoint};
use crate::drain::{DrainDelegate, DrainHandle, DrainOptions};
use crate::errors::ServerError;
use crate::options::ServerOptions;
use libphoton::{OperationResponse, Params, PhotonPeer};
use std::sync::Arc;

/// A server application under administration, with caller data that is handed back to every workflow callback.
pub struct PhotonServer<P: PhotonPeer, D = ()> {
    connection: Connection<P>,
    data: D,
}

impl<P: PhotonPeer> PhotonServer<P, ()> {
    pub fn new(peer: P, endpoint: Endpoint, options: ServerOptions) -> Self {
        Self::with_data(peer, endpoint, options, ())
    }
}

impl<P: PhotonPeer, D> PhotonServer<P, D> {
    pub fn with_data(peer: P, endpoint: Endpoint, options: ServerOptions, data: D) -> Self {
        Self { connection: Connection::new(peer, endpoint, options), data }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.connection.endpoint()
    }

    pub fn connection(&self) -> &Connection<P> {
        &self.connection
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn connect(&self) -> Result<(), ServerError> {
        self.connection.connect()
    }

    pub fn disconnect(&self) {
        self.connection.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn sync_request(&self, op_code: u8, params: Params) -> Result<OperationResponse, ServerError> {
        self.connection.sync_request(op_code, params)
    }
}

impl<P: PhotonPeer, D: Send + Sync + 'static> PhotonServer<P, D> {
    /// Start the drain-and-stop workflow on its own thread. The server must already be connected.
    ///
    /// The outcome is reported to `delegate` and also returned by [`DrainHandle::join`].
    pub fn stop<G>(self: &Arc<Self>, options: DrainOptions, delegate: G) -> Result<DrainHandle, ServerError>
    where
        G: DrainDelegate<P, D>,
    {
        DrainHandle::spawn(Arc::clone(self), options, delegate)
    }
}
