use inlet_rtmp::session::SessionConfig;
use std::time::Duration;

/// Settings for the ingress endpoint.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the listener binds, `host:port`
    pub bind_addr: String,

    /// Upper bound on how long a connection may sit idle between reads.
    /// `None` waits forever.
    pub read_timeout: Option<Duration>,

    /// Per-session protocol settings
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Millisecond form used by flag/environment plumbing; 0 means no
    /// timeout.
    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout = if ms == 0 {
            None
        } else {
            Some(Duration::from_millis(ms))
        };
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "0.0.0.0:1935".to_string(),
            read_timeout: None,
            session: SessionConfig::default(),
        }
    }
}
