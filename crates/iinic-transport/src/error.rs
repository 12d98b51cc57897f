use std::path::PathBuf;

/// Errors that can occur in byte-channel transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the relay.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to apply serial port settings.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the channel.
    #[error("connection lost")]
    ConnectionLost,

    /// No serial adapter looks like an iinic.
    #[error("no iinic detected; pass a device path if you know where it is")]
    DeviceNotFound,

    /// More than one serial adapter looks like an iinic.
    #[error("more than one possible iinic detected ({}); pass a device path to select one", .0.join(", "))]
    AmbiguousDevice(Vec<String>),
}

pub type Result<T> = std::result::Result<T, TransportError>;
