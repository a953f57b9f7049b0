/// Errors that can occur during a capture session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The target host:port did not resolve to any address.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to establish the connection.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// An unrecovered I/O error during the receive phase.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
