//! Blocking request/response on top of the callback-driven peer.
//!
//! A request claims the connection's single pending slot, sends the operation, and sleeps on the session's
//! condition variable until the service thread records the response. Only one request may be in flight per
//! connection, because the slot cannot tell two outstanding responses apart; callers are serialized by an
//! exclusive section held for the whole round trip.

use crate::connection::Connection;
use crate::errors::ServerError;
use libphoton::{OperationRequest, OperationResponse, Params, PhotonPeer};
use log::*;
use std::sync::PoisonError;
use std::time::Duration;

impl<P: PhotonPeer> Connection<P> {
    /// Send an operation and block until its response arrives.
    ///
    /// Waits for at most the connection's default request timeout. With no timeout configured the call only
    /// returns early if the connection drops or is closed locally.
    pub fn sync_request(&self, op_code: u8, params: Params) -> Result<OperationResponse, ServerError> {
        self.sync_request_timeout(op_code, params, self.options().request_timeout)
    }

    /// As [`sync_request`](Self::sync_request), with an explicit deadline (`None` waits without one).
    pub fn sync_request_timeout(
        &self,
        op_code: u8,
        params: Params,
        timeout: Option<Duration>,
    ) -> Result<OperationResponse, ServerError> {
        let _exclusive = self.request_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.sync.begin_request(op_code)?;
        let request = OperationRequest::new(op_code, params);
        trace!("Sending operation {op_code} to {}: {:?}", self.endpoint(), request.params);
        // The peer lock is taken only after the session lock is released: callbacks run while the service thread
        // holds the peer lock, and they need the session lock.
        let sent = self.lock_peer().send_operation(request, true);
        if let Err(err) = sent {
            self.sync.abandon_request();
            return Err(err.into());
        }
        let response = self.sync.wait_response(op_code, timeout)?;
        trace!("Operation {op_code} answered with return code {}", response.return_code);
        Ok(response)
    }
}
