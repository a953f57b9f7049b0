use std::time::Duration;

use aedump_frame::WireConfig;

/// Default number of counted reads before draining.
pub const DEFAULT_LIMIT: usize = 1;

/// Default connect and per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default buffer size per read call.
pub const DEFAULT_READ_SIZE: usize = 8192;

/// Default drain command: a status query clears unread messages server-side.
pub const DEFAULT_DRAIN_CMD: &[u8] = b"STATUS\n";

/// Configuration for one capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Credential sent as `AUTH <token>\n` right after connecting.
    ///
    /// No response is awaited or validated; authentication success is only
    /// observable through subsequent message content.
    pub auth_token: Option<String>,
    /// Number of data-bearing reads to capture before draining.
    pub limit: usize,
    /// Connect timeout, and per-read timeout during the receive loop.
    pub read_timeout: Duration,
    /// Bytes requested per read call.
    pub read_size: usize,
    /// Command sent once the limit is reached, to clear pending messages.
    pub drain_cmd: Vec<u8>,
    /// Wire constants for the reassembler.
    pub wire: WireConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            limit: DEFAULT_LIMIT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            read_size: DEFAULT_READ_SIZE,
            drain_cmd: DEFAULT_DRAIN_CMD.to_vec(),
            wire: WireConfig::default(),
        }
    }
}
