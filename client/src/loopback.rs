//! An in-memory peer that plays the part of a game server.
//!
//! [`LoopbackPeer`] answers the administration operations from a [`LoopbackModel`], and like a real peer it only
//! delivers callbacks from inside [`service`](PhotonPeer::service). A [`LoopbackProbe`] shares counters with the
//! peer, so tests can check how it was driven after the peer has been moved into a connection.

use libphoton::codes::{
    ACTORS_COUNT_PROPERTY, OP_GET_PROPERTIES, OP_INVOKE_OPERATION, OP_LIST_ROOT, PARAM_ARGUMENT, PARAM_OPERATIONS,
    PARAM_VALUES, RESET_OPERATION,
};
use libphoton::{
    DebugLevel, Dictionary, EventData, OperationRequest, OperationResponse, Params, PeerError, PeerListener,
    PhotonPeer, StatusCode, Value,
};
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// How the simulated server behaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackModel {
    /// Entities reported by the root lookup. A real server reports exactly one.
    pub root_entities: Vec<String>,
    /// Property values of every entity.
    pub properties: Dictionary,
    /// Operation names listed alongside the properties.
    pub operations: Vec<String>,
    /// `actorsCount` values reported by the property loads that follow a `Reset`, one per load. The last value
    /// repeats once the list is used up. Empty leaves `properties` untouched.
    pub actor_counts: Vec<i64>,
    /// Result code returned by `Reset`.
    pub reset_result: i64,
    pub root_return_code: i16,
    pub properties_return_code: i16,
    /// Refuse the connection attempt outright.
    pub reject_connect: bool,
    /// Accept the attempt, then report `ExceptionOnConnect`.
    pub connect_exception: bool,
    /// Accept the attempt and never report its outcome.
    pub withhold_connect: bool,
    /// Operations that are never answered.
    pub silent_ops: Vec<u8>,
    /// Drop the connection instead of answering once this many operations have been answered.
    pub disconnect_after: Option<usize>,
    /// Leave the operation names out of property responses.
    pub omit_operations: bool,
}

impl Default for LoopbackModel {
    fn default() -> Self {
        let guid = format!("guid-{}", hex::encode(rand::random::<[u8; 8]>()));
        Self {
            root_entities: vec![guid],
            properties: Dictionary::from([
                (ACTORS_COUNT_PROPERTY.to_string(), Value::from("0")),
                ("application".to_string(), Value::from("Game")),
            ]),
            operations: vec![RESET_OPERATION.to_string()],
            actor_counts: Vec::new(),
            reset_result: 1,
            root_return_code: 0,
            properties_return_code: 0,
            reject_connect: false,
            connect_exception: false,
            withhold_connect: false,
            silent_ops: Vec::new(),
            disconnect_after: None,
            omit_operations: false,
        }
    }
}

impl LoopbackModel {
    /// The default model, with `entity` as its only root.
    pub fn with_root(entity: &str) -> Self {
        Self { root_entities: vec![entity.to_string()], ..Self::default() }
    }
}

#[derive(Debug, Clone)]
enum Callback {
    Status(StatusCode),
    Response(OperationResponse),
    Event(EventData),
    Debug(DebugLevel, String),
}

#[derive(Debug, Default)]
struct ProbeState {
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    service_calls: AtomicUsize,
    service_calls_after_close: AtomicUsize,
    closed: AtomicBool,
    sent: Mutex<Vec<OperationRequest>>,
    injected: Mutex<Vec<Callback>>,
}

/// A view on a [`LoopbackPeer`] that stays usable after the peer has been handed over.
#[derive(Debug, Clone, Default)]
pub struct LoopbackProbe {
    state: Arc<ProbeState>,
}

impl LoopbackProbe {
    pub fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn service_calls(&self) -> usize {
        self.state.service_calls.load(Ordering::SeqCst)
    }

    /// `service` calls made after a local disconnect.
    pub fn service_calls_after_close(&self) -> usize {
        self.state.service_calls_after_close.load(Ordering::SeqCst)
    }

    /// Every operation sent so far.
    pub fn sent_requests(&self) -> Vec<OperationRequest> {
        self.state.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Make the server drop the connection. Delivered on the next `service` call.
    pub fn drop_connection(&self) {
        self.inject(Callback::Status(StatusCode::DisconnectByServer));
    }

    /// Push an event from the server. Delivered on the next `service` call.
    pub fn push_event(&self, event: EventData) {
        self.inject(Callback::Event(event));
    }

    fn inject(&self, callback: Callback) {
        self.state.injected.lock().unwrap_or_else(PoisonError::into_inner).push(callback);
    }
}

pub struct LoopbackPeer {
    model: LoopbackModel,
    listener: Option<Arc<dyn PeerListener>>,
    debug_level: DebugLevel,
    queue: VecDeque<Callback>,
    connected: bool,
    answered: usize,
    reset: bool,
    polls_since_reset: usize,
    probe: LoopbackProbe,
}

impl LoopbackPeer {
    pub fn new(model: LoopbackModel) -> Self {
        Self {
            model,
            listener: None,
            debug_level: DebugLevel::default(),
            queue: VecDeque::new(),
            connected: false,
            answered: 0,
            reset: false,
            polls_since_reset: 0,
            probe: LoopbackProbe::default(),
        }
    }

    pub fn probe(&self) -> LoopbackProbe {
        self.probe.clone()
    }

    fn diagnostic(&mut self, level: DebugLevel, message: String) {
        if level != DebugLevel::Off && level <= self.debug_level {
            self.queue.push_back(Callback::Debug(level, message));
        }
    }

    fn answer(&mut self, request: &OperationRequest) -> OperationResponse {
        match request.op_code {
            OP_LIST_ROOT => self.list_root(),
            OP_GET_PROPERTIES => self.get_properties(request),
            OP_INVOKE_OPERATION => self.invoke_operation(request),
            op_code => OperationResponse::failed(op_code, -2, format!("Unknown operation {op_code}")),
        }
    }

    fn list_root(&self) -> OperationResponse {
        if self.model.root_return_code != 0 {
            return OperationResponse::failed(OP_LIST_ROOT, self.model.root_return_code, "Root lookup refused");
        }
        let root: Dictionary =
            self.model.root_entities.iter().map(|id| (id.clone(), Value::empty_dictionary())).collect();
        OperationResponse::ok(OP_LIST_ROOT, Params::new()).with_param(PARAM_VALUES, root)
    }

    fn get_properties(&mut self, request: &OperationRequest) -> OperationResponse {
        if self.model.properties_return_code != 0 {
            return OperationResponse::failed(
                OP_GET_PROPERTIES,
                self.model.properties_return_code,
                "Property lookup refused",
            );
        }
        let element = request.param(PARAM_ARGUMENT).cloned().unwrap_or_default();
        let mut values = self.model.properties.clone();
        values.insert("element".to_string(), element);
        if self.reset && !self.model.actor_counts.is_empty() {
            let index = self.polls_since_reset.min(self.model.actor_counts.len() - 1);
            let count = self.model.actor_counts[index];
            values.insert(ACTORS_COUNT_PROPERTY.to_string(), Value::from(count.to_string()));
            self.polls_since_reset += 1;
        }
        let response = OperationResponse::ok(OP_GET_PROPERTIES, Params::new()).with_param(PARAM_VALUES, values);
        if self.model.omit_operations {
            response
        } else {
            response.with_param(PARAM_OPERATIONS, self.model.operations.clone())
        }
    }

    fn invoke_operation(&mut self, request: &OperationRequest) -> OperationResponse {
        let name = request.param(PARAM_VALUES).and_then(Value::as_str).unwrap_or_default().to_string();
        if !self.model.operations.contains(&name) {
            return OperationResponse::failed(OP_INVOKE_OPERATION, -3, format!("No operation named '{name}'"));
        }
        let result = if name == RESET_OPERATION {
            self.reset = true;
            self.polls_since_reset = 0;
            self.model.reset_result
        } else {
            1
        };
        OperationResponse::ok(OP_INVOKE_OPERATION, Params::new()).with_param(PARAM_OPERATIONS, result)
    }
}

impl PhotonPeer for LoopbackPeer {
    fn set_listener(&mut self, listener: Arc<dyn PeerListener>) {
        self.listener = Some(listener);
    }

    fn set_debug_level(&mut self, level: DebugLevel) {
        self.debug_level = level;
    }

    fn connect(&mut self, address: &str, port: u16, application: &str) -> Result<(), PeerError> {
        self.probe.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.listener.is_none() {
            return Err(PeerError::NoListener);
        }
        if self.model.reject_connect {
            return Err(PeerError::ConnectRejected(format!("{address}:{port} refused {application}")));
        }
        self.queue.clear();
        self.probe.state.closed.store(false, Ordering::SeqCst);
        self.diagnostic(DebugLevel::Info, format!("Connecting to {application} at {address}:{port}"));
        if self.model.connect_exception {
            self.queue.push_back(Callback::Status(StatusCode::ExceptionOnConnect));
        } else if !self.model.withhold_connect {
            self.connected = true;
            self.queue.push_back(Callback::Status(StatusCode::Connect));
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.probe.state.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.probe.state.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected = false;
        self.queue.clear();
        // Delivered immediately: nothing services a closed peer.
        if let Some(listener) = &self.listener {
            listener.on_status_changed(StatusCode::Disconnect);
        }
    }

    fn service(&mut self) {
        let state = &self.probe.state;
        state.service_calls.fetch_add(1, Ordering::SeqCst);
        if state.closed.load(Ordering::SeqCst) {
            state.service_calls_after_close.fetch_add(1, Ordering::SeqCst);
            return;
        }
        let injected = std::mem::take(&mut *state.injected.lock().unwrap_or_else(PoisonError::into_inner));
        for callback in injected {
            if let Callback::Status(status) = &callback {
                if status.is_disconnect() {
                    self.connected = false;
                }
            }
            self.queue.push_back(callback);
        }
        let Some(listener) = self.listener.clone() else {
            return;
        };
        while let Some(callback) = self.queue.pop_front() {
            match callback {
                Callback::Status(status) => listener.on_status_changed(status),
                Callback::Response(response) => listener.on_operation_response(response),
                Callback::Event(event) => listener.on_event(event),
                Callback::Debug(level, message) => listener.debug_return(level, &message),
            }
        }
    }

    fn send_operation(&mut self, request: OperationRequest, _reliable: bool) -> Result<(), PeerError> {
        if !self.connected {
            return Err(PeerError::NotConnected);
        }
        self.probe.state.sent.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());
        if self.model.silent_ops.contains(&request.op_code) {
            trace!("Loopback leaves operation {} unanswered", request.op_code);
            return Ok(());
        }
        if self.model.disconnect_after.is_some_and(|limit| self.answered >= limit) {
            debug!("Loopback drops the connection after {} answers", self.answered);
            self.connected = false;
            self.queue.push_back(Callback::Status(StatusCode::DisconnectByServer));
            return Ok(());
        }
        let response = self.answer(&request);
        self.answered += 1;
        self.queue.push_back(Callback::Response(response));
        Ok(())
    }
}
