//! The peer collaborator.
//!
//! A peer owns the network connection to a server application and speaks its binary protocol. It is
//! callback driven: nothing is delivered to the registered [`PeerListener`] until [`PhotonPeer::service`] is
//! called, and every callback fires on the thread that called `service`.
//!
//! These traits are the only surface the administration client relies on, so any transport can be plugged in.

use crate::codes::{DebugLevel, StatusCode};
use crate::errors::PeerError;
use crate::operation::{EventData, OperationRequest, OperationResponse};
use log::*;
use std::sync::Arc;

/// Receives the callbacks a peer dispatches while it is being serviced.
pub trait PeerListener: Send + Sync {
    /// A response to a previously sent operation arrived.
    fn on_operation_response(&self, response: OperationResponse);

    /// The connection status changed.
    fn on_status_changed(&self, status: StatusCode);

    /// The server pushed an event.
    fn on_event(&self, event: EventData) {
        trace!("Peer event received: {event}");
    }

    /// A diagnostic message from the peer itself.
    fn debug_return(&self, level: DebugLevel, message: &str) {
        if let Some(level) = level.log_level() {
            log!(level, "[peer] {message}");
        }
    }
}

pub trait PhotonPeer: Send + 'static {
    /// Register the listener that receives all callbacks. Must be called before [`connect`](Self::connect).
    fn set_listener(&mut self, listener: Arc<dyn PeerListener>);

    fn set_debug_level(&mut self, level: DebugLevel);

    /// Start connecting to `application` at `address:port`.
    ///
    /// Returning `Ok` only means the attempt was accepted. The connection is live once the listener receives
    /// [`StatusCode::Connect`].
    fn connect(&mut self, address: &str, port: u16, application: &str) -> Result<(), PeerError>;

    /// Close the connection. Calling this on a closed peer does nothing.
    fn disconnect(&mut self);

    /// Run one step of I/O processing and dispatch any queued callbacks.
    fn service(&mut self);

    /// Queue an operation for sending. The response arrives later through
    /// [`PeerListener::on_operation_response`].
    fn send_operation(&mut self, request: OperationRequest, reliable: bool) -> Result<(), PeerError>;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Params;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StatusOnly {
        statuses: Mutex<Vec<StatusCode>>,
    }

    impl PeerListener for StatusOnly {
        fn on_operation_response(&self, _response: OperationResponse) {}

        fn on_status_changed(&self, status: StatusCode) {
            self.statuses.lock().unwrap().push(status);
        }
    }

    #[test]
    fn default_callbacks_only_log() {
        env_logger::try_init().ok();
        let listener: Arc<dyn PeerListener> = Arc::new(StatusOnly::default());
        listener.on_event(EventData { code: 3, params: Params::new() });
        listener.debug_return(DebugLevel::Warning, "resending operation 11");
        listener.debug_return(DebugLevel::Off, "never shown");
        listener.on_status_changed(StatusCode::Connect);
    }
}
