use libphoton::DebugLevel;
use std::time::Duration;

/// Cadence at which the service loop pumps the peer.
pub const DEFAULT_SERVICE_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// How long the service loop sleeps between two calls to the peer's `service` step.
    pub service_interval: Duration,
    /// Upper bound on how long `connect` waits for the peer to report the connection. `None` waits forever.
    pub connect_timeout: Option<Duration>,
    /// Default upper bound on how long a synchronous request waits for its response. `None` waits forever, which
    /// hangs the caller if the response is lost without the connection dropping.
    pub request_timeout: Option<Duration>,
    /// Verbosity of the peer's own diagnostics.
    pub debug_level: DebugLevel,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            service_interval: DEFAULT_SERVICE_INTERVAL,
            connect_timeout: None,
            request_timeout: None,
            debug_level: DebugLevel::Error,
        }
    }
}

impl ServerOptions {
    pub fn with_service_interval(mut self, interval: Duration) -> Self {
        self.service_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_debug_level(mut self, level: DebugLevel) -> Self {
        self.debug_level = level;
        self
    }
}
