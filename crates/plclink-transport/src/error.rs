use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No bytes arrived before the receive deadline.
    #[error("receive timed out after {0:?}")]
    Timeout(Duration),

    /// Failed to connect to the serial bridge at the specified path.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The outbound queue has no free slot.
    #[error("outbound queue full ({capacity} slots)")]
    BufferFull { capacity: usize },

    /// The other end has gone away and nothing is left to read.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
