//! Helpers for driving the administration client against the loopback server from async test code.

use anyhow::anyhow;
use libphoton::{Application, Dictionary, PhotonPeer};
use log::*;
use photon_client::{
    get_server_properties, DrainDelegate, DrainOptions, DrainOutcome, Endpoint, LoopbackModel, LoopbackPeer,
    LoopbackProbe, PhotonServer, ServerOptions,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything the drain workflow reported through its delegate.
#[derive(Debug, Clone, Default)]
pub struct DrainLog {
    pub successes: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DrainReport {
    pub outcome: DrainOutcome,
    pub log: DrainLog,
}

#[derive(Clone, Default)]
struct RecordingDelegate {
    log: Arc<Mutex<DrainLog>>,
}

impl<P: PhotonPeer, D> DrainDelegate<P, D> for RecordingDelegate {
    fn on_success(&mut self, server: &PhotonServer<P, D>, _data: &D) {
        info!("Drain of {} reported success", server.endpoint());
        if let Ok(mut log) = self.log.lock() {
            log.successes += 1;
        }
    }

    fn on_error(&mut self, server: &PhotonServer<P, D>, _data: &D, message: &str) {
        info!("Drain of {} reported an error: {message}", server.endpoint());
        if let Ok(mut log) = self.log.lock() {
            log.errors.push(message.to_string());
        }
    }
}

/// An administration client wired to an in-memory game server.
pub struct AdminClient {
    server: Arc<PhotonServer<LoopbackPeer>>,
    probe: LoopbackProbe,
}

impl AdminClient {
    pub fn new(model: LoopbackModel) -> Self {
        let peer = LoopbackPeer::new(model);
        let probe = peer.probe();
        let endpoint = Endpoint::for_application("127.0.0.1", Application::Game);
        let options = ServerOptions::default()
            .with_service_interval(Duration::from_millis(1))
            .with_connect_timeout(Duration::from_secs(5));
        Self { server: Arc::new(PhotonServer::new(peer, endpoint, options)), probe }
    }

    pub fn server(&self) -> &PhotonServer<LoopbackPeer> {
        &self.server
    }

    pub fn probe(&self) -> &LoopbackProbe {
        &self.probe
    }

    pub fn is_connected(&self) -> bool {
        self.server.is_connected()
    }

    pub async fn connect(&self) -> Result<(), anyhow::Error> {
        let server = Arc::clone(&self.server);
        tokio::task::spawn_blocking(move || server.connect()).await??;
        Ok(())
    }

    pub async fn disconnect(&self) {
        let server = Arc::clone(&self.server);
        if let Err(err) = tokio::task::spawn_blocking(move || server.disconnect()).await {
            warn!("Disconnect task failed: {err}");
        }
    }

    pub async fn read_properties(&self) -> Result<Option<Dictionary>, anyhow::Error> {
        let server = Arc::clone(&self.server);
        let values = tokio::task::spawn_blocking(move || get_server_properties(&*server)).await?;
        Ok(values)
    }

    pub async fn drain(&self, options: DrainOptions) -> Result<DrainReport, anyhow::Error> {
        if !self.is_connected() {
            return Err(anyhow!("The client must be connected before draining"));
        }
        let delegate = RecordingDelegate::default();
        let handle = self.server.stop(options, delegate.clone())?;
        let outcome = tokio::task::spawn_blocking(move || handle.join()).await?;
        let log = delegate.log.lock().map(|log| log.clone()).map_err(|_| anyhow!("Drain log is poisoned"))?;
        Ok(DrainReport { outcome, log })
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("endpoint", &self.server.endpoint().to_string())
            .field("connected", &self.is_connected())
            .finish()
    }
}
