/// Errors that can occur on a channel link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial port.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link accepted zero bytes of a frame.
    #[error("link closed (write accepted 0 bytes)")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
