//! Peer lifecycle: connect, disconnect and the connection status pushed by the peer.

use crate::errors::ServerError;
use crate::listener::ServerListener;
use crate::options::ServerOptions;
use crate::service_loop::ServiceLoop;
use crate::session::SyncState;
use libphoton::{Application, EventData, PhotonPeer};
use log::*;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Where a server application can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
    pub application: String,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16, application: impl Into<String>) -> Self {
        Self { address: address.into(), port, application: application.into() }
    }

    /// The endpoint of `application` on its well-known port.
    pub fn for_application(address: impl Into<String>, application: Application) -> Self {
        Self::new(address, application.default_port(), application.name())
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.application, self.address, self.port)
    }
}

/// Owns the peer and the service loop that pumps it, and tracks whether the server considers us connected.
///
/// Requests are issued through [`sync_request`](Connection::sync_request).
pub struct Connection<P: PhotonPeer> {
    endpoint: Endpoint,
    options: ServerOptions,
    pub(crate) peer: Arc<Mutex<P>>,
    pub(crate) sync: Arc<SyncState>,
    pub(crate) request_lock: Mutex<()>,
    /// Held for the whole of `connect`, so concurrent callers wait for the attempt in progress.
    connect_lock: Mutex<()>,
    service: Mutex<Option<ServiceLoop>>,
}

impl<P: PhotonPeer> Connection<P> {
    pub fn new(mut peer: P, endpoint: Endpoint, options: ServerOptions) -> Self {
        let sync = Arc::new(SyncState::new());
        peer.set_listener(Arc::new(ServerListener::new(Arc::clone(&sync))));
        peer.set_debug_level(options.debug_level);
        Self {
            endpoint,
            options,
            peer: Arc::new(Mutex::new(peer)),
            sync,
            request_lock: Mutex::new(()),
            connect_lock: Mutex::new(()),
            service: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Whether the peer has reported the connection as established and not since lost.
    pub fn is_connected(&self) -> bool {
        self.sync.is_connected()
    }

    /// The most recent event pushed by the server.
    pub fn last_event(&self) -> Option<EventData> {
        self.sync.last_event()
    }

    /// Connect to the endpoint and block until the peer reports the connection as established.
    ///
    /// A call made while another thread is connecting waits for that attempt and reuses its session. Starts the
    /// service loop, since the status callback that ends the wait is only delivered while the peer is
    /// being serviced. Without a connect timeout in the options this waits for as long as the peer stays silent.
    pub fn connect(&self) -> Result<(), ServerError> {
        let _connecting = self.connect_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut service = self.lock_service();
        if service.is_some() {
            if self.sync.is_connected() {
                debug!("Already connected to {}", self.endpoint);
                return Ok(());
            }
            debug!("Previous session to {} was dropped by the server. Cleaning up.", self.endpoint);
            if let Some(stale) = service.take() {
                stale.join();
            }
            self.lock_peer().disconnect();
        }
        let mark = self.sync.open_session();
        let Endpoint { address, port, application } = &self.endpoint;
        info!("Connecting to {}", self.endpoint);
        if let Err(err) = self.lock_peer().connect(address, *port, application) {
            self.sync.close_session();
            return Err(ServerError::ConnectFailure(err.to_string()));
        }
        match ServiceLoop::start(Arc::clone(&self.peer), self.options.service_interval) {
            Ok(started) => *service = Some(started),
            Err(err) => {
                self.sync.close_session();
                self.lock_peer().disconnect();
                return Err(err.into());
            }
        }
        drop(service);
        match self.sync.wait_connected(mark, self.options.connect_timeout) {
            Ok(()) => {
                info!("Connected to {}", self.endpoint);
                Ok(())
            }
            Err(err) => {
                warn!("Connection to {} failed. {err}", self.endpoint);
                self.disconnect();
                Err(err)
            }
        }
    }

    /// Stop and join the service loop, then close the peer.
    ///
    /// Threads blocked in a request on this connection are released with [`ServerError::RequestCancelled`].
    /// Does nothing when there is no session, so it is safe to call repeatedly.
    pub fn disconnect(&self) {
        let Some(service) = self.lock_service().take() else {
            trace!("Disconnect requested, but there is no session with {}", self.endpoint);
            return;
        };
        self.sync.close_session();
        let iterations = service.iterations();
        service.join();
        self.lock_peer().disconnect();
        info!("Disconnected from {} after {iterations} service iterations", self.endpoint);
    }

    pub(crate) fn lock_peer(&self) -> MutexGuard<'_, P> {
        self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_service(&self) -> MutexGuard<'_, Option<ServiceLoop>> {
        self.service.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: PhotonPeer> Drop for Connection<P> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
