//! State shared between the threads that issue requests and the service thread that delivers callbacks.
//!
//! The connection flag and the pending request slot live behind a single mutex, paired with a single condition
//! variable. Every wait is predicate based, so a notification that fires before the waiter starts waiting is
//! never lost.

use crate::errors::ServerError;
use libphoton::{EventData, OperationResponse, StatusCode};
use log::*;
use std::collections::BTreeMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct SessionState {
    /// Written only from status callbacks.
    connected: bool,
    /// Number of `Connect` statuses seen so far.
    connects: u64,
    /// Number of connect-failure statuses seen so far, and the latest one.
    connect_failures: u64,
    last_connect_failure: Option<StatusCode>,
    /// True between a local connect and a local disconnect.
    open: bool,
    /// Op code of the request in flight, if any.
    pending: Option<u8>,
    response: Option<OperationResponse>,
    /// Responses still owed to requests that timed out, per op code. These are dropped when they arrive.
    overdue: BTreeMap<u8, usize>,
    last_event: Option<EventData>,
}

/// Counters captured when a session opens, so that `wait_connected` only accepts statuses reported afterwards.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionMark {
    connects: u64,
    connect_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SyncState {
    state: Mutex<SessionState>,
    signal: Condvar,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    //------------------------------------   Callback side   ----------------------------------------------------

    pub fn set_status(&self, status: StatusCode) {
        let mut state = self.lock();
        if status == StatusCode::Connect {
            state.connected = true;
            state.connects += 1;
        } else if status.is_disconnect() {
            state.connected = false;
            state.overdue.clear();
        } else if status.is_connect_failure() {
            state.connect_failures += 1;
            state.last_connect_failure = Some(status);
        }
        self.signal.notify_all();
    }

    /// Record a response for the request in flight. Returns `false` (and records nothing) when no request is
    /// waiting, a response was already recorded, the response answers a different operation, or it is the late
    /// answer to an earlier request that timed out.
    pub fn store_response(&self, response: OperationResponse) -> bool {
        let mut state = self.lock();
        if let Some(owed) = state.overdue.get_mut(&response.op_code) {
            *owed -= 1;
            if *owed == 0 {
                state.overdue.remove(&response.op_code);
            }
            debug!("Dropping the late response to an earlier operation {}", response.op_code);
            return false;
        }
        match state.pending {
            Some(op_code) if op_code == response.op_code && state.response.is_none() => {
                state.response = Some(response);
                self.signal.notify_all();
                true
            }
            _ => false,
        }
    }

    pub fn store_event(&self, event: EventData) {
        self.lock().last_event = Some(event);
    }

    //------------------------------------   Connection side   --------------------------------------------------

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn last_event(&self) -> Option<EventData> {
        self.lock().last_event.clone()
    }

    pub fn open_session(&self) -> SessionMark {
        let mut state = self.lock();
        state.open = true;
        state.overdue.clear();
        SessionMark { connects: state.connects, connect_failures: state.connect_failures }
    }

    /// Mark the session closed and release every thread waiting on it.
    pub fn close_session(&self) {
        let mut state = self.lock();
        state.open = false;
        self.signal.notify_all();
    }

    /// Block until the peer reports a connection established after `mark` was taken.
    pub fn wait_connected(&self, mark: SessionMark, timeout: Option<Duration>) -> Result<(), ServerError> {
        let waiting = |s: &mut SessionState| {
            s.open && s.connects == mark.connects && s.connect_failures == mark.connect_failures
        };
        let guard = self.lock();
        let state = match timeout {
            Some(timeout) => {
                let (state, _) =
                    self.signal.wait_timeout_while(guard, timeout, waiting).unwrap_or_else(PoisonError::into_inner);
                state
            }
            None => self.signal.wait_while(guard, waiting).unwrap_or_else(PoisonError::into_inner),
        };
        if state.connect_failures > mark.connect_failures {
            let status = state.last_connect_failure.map(|s| s.to_string()).unwrap_or_default();
            return Err(ServerError::ConnectFailure(format!("The peer reported {status}")));
        }
        if state.connects > mark.connects {
            return Ok(());
        }
        if !state.open {
            return Err(ServerError::NotConnected);
        }
        Err(ServerError::ConnectTimeout(timeout.unwrap_or_default()))
    }

    //------------------------------------   Request side   -----------------------------------------------------

    /// Claim the pending slot for `op_code`. The caller must hold the connection's exclusive request section.
    pub fn begin_request(&self, op_code: u8) -> Result<(), ServerError> {
        let mut state = self.lock();
        if !state.open || !state.connected {
            return Err(ServerError::NotConnected);
        }
        if let Some(stale) = state.pending {
            warn!("Pending slot still held by operation {stale} when operation {op_code} started");
        }
        state.pending = Some(op_code);
        state.response = None;
        Ok(())
    }

    pub fn abandon_request(&self) {
        let mut state = self.lock();
        state.pending = None;
        state.response = None;
    }

    /// Block until the response to `op_code` is recorded, the connection drops, the session is closed locally, or
    /// the optional timeout expires. The slot is cleared on every exit path.
    pub fn wait_response(&self, op_code: u8, timeout: Option<Duration>) -> Result<OperationResponse, ServerError> {
        let waiting = |s: &mut SessionState| s.response.is_none() && s.connected && s.open;
        let guard = self.lock();
        let mut state = match timeout {
            Some(timeout) => {
                let (state, _) =
                    self.signal.wait_timeout_while(guard, timeout, waiting).unwrap_or_else(PoisonError::into_inner);
                state
            }
            None => self.signal.wait_while(guard, waiting).unwrap_or_else(PoisonError::into_inner),
        };
        state.pending = None;
        if let Some(response) = state.response.take() {
            return Ok(response);
        }
        if !state.open {
            Err(ServerError::RequestCancelled(op_code))
        } else if !state.connected {
            Err(ServerError::ConnectionLost(op_code))
        } else {
            *state.overdue.entry(op_code).or_default() += 1;
            Err(ServerError::RequestTimeout { op_code, timeout: timeout.unwrap_or_default() })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use libphoton::{Params, Value};
    use std::sync::Arc;
    use std::thread;

    fn connected_state() -> SyncState {
        let sync = SyncState::new();
        sync.open_session();
        sync.set_status(StatusCode::Connect);
        sync
    }

    #[test]
    fn status_changes_drive_the_connected_flag() {
        let sync = SyncState::new();
        assert!(!sync.is_connected());
        sync.set_status(StatusCode::Connect);
        assert!(sync.is_connected());
        sync.set_status(StatusCode::Exception);
        assert!(sync.is_connected());
        for status in [
            StatusCode::Disconnect,
            StatusCode::DisconnectByServer,
            StatusCode::DisconnectByServerLogic,
            StatusCode::DisconnectByServerUserLimit,
            StatusCode::TimeoutDisconnect,
        ] {
            sync.set_status(StatusCode::Connect);
            sync.set_status(status);
            assert!(!sync.is_connected(), "{status} must clear the flag");
        }
    }

    #[test]
    fn unsolicited_and_mismatched_responses_are_dropped() {
        let sync = connected_state();
        assert!(!sync.store_response(OperationResponse::ok(10, Params::new())));
        sync.begin_request(11).unwrap();
        assert!(!sync.store_response(OperationResponse::ok(10, Params::new())));
        assert!(sync.store_response(OperationResponse::ok(11, Params::new())));
        assert!(!sync.store_response(OperationResponse::ok(11, Params::new())));
        let res = sync.wait_response(11, None).unwrap();
        assert_eq!(res.op_code, 11);
    }

    #[test]
    fn late_response_is_not_handed_to_the_next_request() {
        let sync = connected_state();
        sync.begin_request(11).unwrap();
        let err = sync.wait_response(11, Some(Duration::from_millis(5))).unwrap_err();
        assert!(matches!(err, ServerError::RequestTimeout { op_code: 11, .. }));

        sync.begin_request(11).unwrap();
        let late = OperationResponse::ok(11, Params::from([(2, Value::from("first"))]));
        assert!(!sync.store_response(late), "the answer to the timed out request must be dropped");
        let fresh = OperationResponse::ok(11, Params::from([(2, Value::from("second"))]));
        assert!(sync.store_response(fresh));
        let res = sync.wait_response(11, Some(Duration::from_millis(50))).unwrap();
        assert_eq!(res.param(2), Some(&Value::from("second")));
    }

    #[test]
    fn overdue_responses_are_forgotten_when_the_connection_drops() {
        let sync = connected_state();
        sync.begin_request(10).unwrap();
        assert!(sync.wait_response(10, Some(Duration::from_millis(5))).is_err());
        sync.set_status(StatusCode::TimeoutDisconnect);
        sync.set_status(StatusCode::Connect);
        sync.begin_request(10).unwrap();
        assert!(sync.store_response(OperationResponse::ok(10, Params::new())));
        assert!(sync.wait_response(10, None).is_ok());
    }

    #[test]
    fn response_recorded_before_the_wait_is_not_lost() {
        let sync = connected_state();
        sync.begin_request(10).unwrap();
        sync.store_response(OperationResponse::ok(10, Params::new()));
        let res = sync.wait_response(10, Some(Duration::from_millis(10))).unwrap();
        assert!(res.is_ok());
    }

    #[test]
    fn wait_wakes_on_delivery_from_another_thread() {
        let sync = Arc::new(connected_state());
        sync.begin_request(12).unwrap();
        let remote = Arc::clone(&sync);
        let deliver = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.store_response(OperationResponse::ok(12, Params::new()));
        });
        let res = sync.wait_response(12, None).unwrap();
        assert_eq!(res.op_code, 12);
        deliver.join().unwrap();
    }

    #[test]
    fn wait_ends_on_timeout_disconnect_or_close() {
        let sync = Arc::new(connected_state());
        sync.begin_request(10).unwrap();
        let err = sync.wait_response(10, Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, ServerError::RequestTimeout { op_code: 10, .. }));

        sync.begin_request(10).unwrap();
        let remote = Arc::clone(&sync);
        let drop_it = thread::spawn(move || remote.set_status(StatusCode::DisconnectByServer));
        let err = sync.wait_response(10, None).unwrap_err();
        assert!(matches!(err, ServerError::ConnectionLost(10)));
        drop_it.join().unwrap();

        sync.set_status(StatusCode::Connect);
        sync.begin_request(11).unwrap();
        sync.close_session();
        let err = sync.wait_response(11, None).unwrap_err();
        assert!(matches!(err, ServerError::RequestCancelled(11)));
    }

    #[test]
    fn requests_need_a_connection() {
        let sync = SyncState::new();
        assert!(matches!(sync.begin_request(10), Err(ServerError::NotConnected)));
        sync.open_session();
        assert!(matches!(sync.begin_request(10), Err(ServerError::NotConnected)));
    }

    #[test]
    fn wait_connected_only_accepts_fresh_connects() {
        let sync = Arc::new(SyncState::new());
        sync.set_status(StatusCode::Connect);
        let mark = sync.open_session();
        let err = sync.wait_connected(mark, Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, ServerError::ConnectTimeout(_)));

        let mark = sync.open_session();
        let remote = Arc::clone(&sync);
        let connect = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            remote.set_status(StatusCode::Connect);
        });
        sync.wait_connected(mark, None).unwrap();
        connect.join().unwrap();

        let mark = sync.open_session();
        sync.set_status(StatusCode::ExceptionOnConnect);
        let err = sync.wait_connected(mark, None).unwrap_err();
        assert!(matches!(err, ServerError::ConnectFailure(_)));
    }
}
