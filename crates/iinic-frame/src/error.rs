use iinic_nic::NicError;

/// Errors that can occur while building or exchanging frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the one-byte length field.
    #[error("frame payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The type byte uses the bit reserved for the timestamp flag.
    #[error("invalid frame type {0:#04x} (must be below 0x80)")]
    InvalidType(u8),

    /// Session-level error.
    #[error(transparent)]
    Nic(#[from] NicError),
}

impl FrameError {
    pub fn is_fatal(&self) -> bool {
        match self {
            FrameError::PayloadTooLarge { .. } | FrameError::InvalidType(_) => false,
            FrameError::Nic(err) => err.is_fatal(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
