//! Protocol constants: operation codes, parameter keys, return codes and peer status codes.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lists the root components hosted by the server application.
pub const OP_LIST_ROOT: u8 = 10;
/// Loads the property values and available operations of a component.
pub const OP_GET_PROPERTIES: u8 = 11;
/// Invokes a named operation on a component.
pub const OP_INVOKE_OPERATION: u8 = 12;

/// The primary argument of a request (an entity reference, or null for the root lookup).
pub const PARAM_ARGUMENT: u8 = 1;
/// Values or result mapping of a response; the operation name of an invoke request.
pub const PARAM_VALUES: u8 = 2;
/// Operation names of a properties response; the result code of an invoke response; the arguments of an
/// invoke request.
pub const PARAM_OPERATIONS: u8 = 3;

/// Return code of a successful operation response.
pub const RETURN_CODE_OK: i16 = 0;
/// Result code reported by a remote operation that completed successfully.
pub const OPERATION_RESULT_OK: i64 = 1;

/// Name of the remote operation that stops a server admitting new actors.
pub const RESET_OPERATION: &str = "Reset";
/// Property that reports the number of actors still hosted by the server.
pub const ACTORS_COUNT_PROPERTY: &str = "actorsCount";

/// Connection status codes pushed by the peer through
/// [`PeerListener::on_status_changed`](crate::PeerListener::on_status_changed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    Connect,
    Disconnect,
    Exception,
    ExceptionOnConnect,
    SecurityExceptionOnConnect,
    TimeoutDisconnect,
    DisconnectByServer,
    DisconnectByServerUserLimit,
    DisconnectByServerLogic,
    EncryptionEstablished,
    EncryptionFailedToEstablish,
}

impl StatusCode {
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::SecurityExceptionOnConnect => 1022,
            StatusCode::ExceptionOnConnect => 1023,
            StatusCode::Connect => 1024,
            StatusCode::Disconnect => 1025,
            StatusCode::Exception => 1026,
            StatusCode::TimeoutDisconnect => 1040,
            StatusCode::DisconnectByServer => 1041,
            StatusCode::DisconnectByServerUserLimit => 1042,
            StatusCode::DisconnectByServerLogic => 1043,
            StatusCode::EncryptionEstablished => 1048,
            StatusCode::EncryptionFailedToEstablish => 1049,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        let status = match code {
            1022 => StatusCode::SecurityExceptionOnConnect,
            1023 => StatusCode::ExceptionOnConnect,
            1024 => StatusCode::Connect,
            1025 => StatusCode::Disconnect,
            1026 => StatusCode::Exception,
            1040 => StatusCode::TimeoutDisconnect,
            1041 => StatusCode::DisconnectByServer,
            1042 => StatusCode::DisconnectByServerUserLimit,
            1043 => StatusCode::DisconnectByServerLogic,
            1048 => StatusCode::EncryptionEstablished,
            1049 => StatusCode::EncryptionFailedToEstablish,
            _ => return None,
        };
        Some(status)
    }

    /// The statuses that end a live connection, whoever initiated it.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            StatusCode::Disconnect
                | StatusCode::DisconnectByServer
                | StatusCode::DisconnectByServerLogic
                | StatusCode::DisconnectByServerUserLimit
                | StatusCode::TimeoutDisconnect
        )
    }

    /// The statuses that mean a connection attempt failed before it was established.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, StatusCode::ExceptionOnConnect | StatusCode::SecurityExceptionOnConnect)
    }
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

/// Verbosity of the diagnostic messages the peer reports through
/// [`PeerListener::debug_return`](crate::PeerListener::debug_return).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    Off,
    #[default]
    Error,
    Warning,
    Info,
    All,
}

impl DebugLevel {
    /// The `log` level a peer diagnostic at this verbosity is forwarded to.
    pub fn log_level(&self) -> Option<log::Level> {
        match self {
            DebugLevel::Off => None,
            DebugLevel::Error => Some(log::Level::Error),
            DebugLevel::Warning => Some(log::Level::Warn),
            DebugLevel::Info => Some(log::Level::Info),
            DebugLevel::All => Some(log::Level::Debug),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn disconnect_family() {
        let disconnects = [
            StatusCode::Disconnect,
            StatusCode::DisconnectByServer,
            StatusCode::DisconnectByServerLogic,
            StatusCode::DisconnectByServerUserLimit,
            StatusCode::TimeoutDisconnect,
        ];
        for status in disconnects {
            assert!(status.is_disconnect(), "{status} should end the connection");
        }
        assert!(!StatusCode::Connect.is_disconnect());
        assert!(!StatusCode::Exception.is_disconnect());
        assert!(!StatusCode::ExceptionOnConnect.is_disconnect());
        assert!(StatusCode::ExceptionOnConnect.is_connect_failure());
    }

    #[test]
    fn numeric_codes() {
        for code in 1000..1100 {
            if let Some(status) = StatusCode::from_code(code) {
                assert_eq!(status.code(), code);
            }
        }
        assert_eq!(StatusCode::from_code(1024), Some(StatusCode::Connect));
        assert_eq!(StatusCode::from_code(7), None);
    }
}
