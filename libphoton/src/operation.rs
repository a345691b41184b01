use crate::codes::RETURN_CODE_OK;
use crate::value::{Params, Value};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// An operation sent to the server: an op code and its positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub op_code: u8,
    pub params: Params,
}

impl OperationRequest {
    pub fn new(op_code: u8, params: Params) -> Self {
        Self { op_code, params }
    }

    /// Add a parameter, builder style.
    pub fn with_param(mut self, key: u8, value: impl Into<Value>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn param(&self, key: u8) -> Option<&Value> {
        self.params.get(&key)
    }
}

/// The server's answer to an [`OperationRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub op_code: u8,
    pub return_code: i16,
    pub debug_message: Option<String>,
    pub params: Params,
}

impl OperationResponse {
    pub fn ok(op_code: u8, params: Params) -> Self {
        Self { op_code, return_code: RETURN_CODE_OK, debug_message: None, params }
    }

    pub fn failed(op_code: u8, return_code: i16, message: impl Into<String>) -> Self {
        Self { op_code, return_code, debug_message: Some(message.into()), params: Params::new() }
    }

    pub fn with_param(mut self, key: u8, value: impl Into<Value>) -> Self {
        self.params.insert(key, value.into());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.return_code == RETURN_CODE_OK
    }

    pub fn param(&self, key: u8) -> Option<&Value> {
        self.params.get(&key)
    }
}

impl Display for OperationResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OperationResponse {}: ReturnCode: {}", self.op_code, self.return_code)?;
        if let Some(msg) = &self.debug_message {
            write!(f, " ({msg})")?;
        }
        let params = self.params.iter().map(|(k, v)| format!("{k}: {v}")).collect::<Vec<_>>();
        write!(f, ". Parameters: {{{}}}", params.join(", "))
    }
}

/// An unsolicited message pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub code: u8,
    pub params: Params,
}

impl Display for EventData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event {} with {} parameter(s)", self.code, self.params.len())
    }
}
