//! The background thread that pumps the peer.
//!
//! A peer only dispatches callbacks from inside its `service` step, so no status change or response is ever
//! delivered unless this loop is running.

use libphoton::PhotonPeer;
use log::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct ServiceLoop {
    running: Arc<AtomicBool>,
    iterations: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ServiceLoop {
    /// Spawn the loop. It calls `service` on the peer, then sleeps for `interval`, until [`stop`](Self::stop) is
    /// called.
    pub fn start<P: PhotonPeer>(peer: Arc<Mutex<P>>, interval: Duration) -> Result<Self, std::io::Error> {
        let running = Arc::new(AtomicBool::new(true));
        let iterations = Arc::new(AtomicU64::new(0));
        let run_flag = Arc::clone(&running);
        let counter = Arc::clone(&iterations);
        let handle = thread::Builder::new().name("photon-service".to_string()).spawn(move || {
            debug!("Service loop started. Interval: {interval:?}");
            while run_flag.load(Ordering::Acquire) {
                peer.lock().unwrap_or_else(PoisonError::into_inner).service();
                counter.fetch_add(1, Ordering::Relaxed);
                thread::sleep(interval);
            }
            debug!("Service loop exited after {} iterations", counter.load(Ordering::Relaxed));
        })?;
        Ok(Self { running, iterations, handle: Some(handle) })
    }

    /// Ask the loop to exit. It notices at the top of its next iteration, so this returns before the thread is done.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The number of completed `service` calls.
    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    /// Stop the loop and wait for the thread to finish.
    pub fn join(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("The service loop thread panicked");
            }
        }
    }
}

impl Drop for ServiceLoop {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
