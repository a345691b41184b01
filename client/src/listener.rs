use crate::session::SyncState;
use libphoton::{EventData, OperationResponse, PeerListener, StatusCode};
use log::*;
use std::sync::Arc;

/// Routes peer callbacks into the shared session state. Runs on the service thread.
pub(crate) struct ServerListener {
    sync: Arc<SyncState>,
}

impl ServerListener {
    pub fn new(sync: Arc<SyncState>) -> Self {
        Self { sync }
    }
}

impl PeerListener for ServerListener {
    fn on_operation_response(&self, response: OperationResponse) {
        trace!("Operation response received: {response}");
        let op_code = response.op_code;
        if !self.sync.store_response(response) {
            warn!("Dropping response to operation {op_code}: no request for it is waiting");
        }
    }

    fn on_status_changed(&self, status: StatusCode) {
        debug!("Peer status changed to {status}");
        self.sync.set_status(status);
    }

    fn on_event(&self, event: EventData) {
        trace!("Event received: {event}");
        self.sync.store_event(event);
    }
}
