use iinic_token::{Token, TokenError};
use iinic_transport::TransportError;

/// Errors that can occur in NIC session operations.
#[derive(Debug, thiserror::Error)]
pub enum NicError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The token stream is desynchronized.
    #[error("protocol error: {0}")]
    Token(#[from] TokenError),

    /// The device sent a token that makes no sense in the receive path.
    #[error("unexpected token received from NIC: {0:?}")]
    UnexpectedToken(Token),

    /// The device did not answer before the deadline.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// The payload can never fit the device transmit buffer.
    #[error("packet is too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },

    /// The device transmit buffer has no room for the payload yet.
    #[error("tx buffer overrun ({queued} queued + {requested} requested > {capacity})")]
    Overrun {
        queued: usize,
        requested: usize,
        capacity: usize,
    },

    /// All 256 ping sequence numbers are outstanding.
    #[error("pings overflow (sequence {0} still pending)")]
    PingSequenceOverflow(u8),

    /// Bandwidth register value outside the device table.
    #[error("invalid bandwidth code 0x{0:02x}")]
    InvalidBandwidth(u8),
}

impl NicError {
    /// The session cannot continue and must be reset or dropped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NicError::Transport(_) | NicError::Token(_) | NicError::UnexpectedToken(_)
        )
    }

    /// Rejected up front; the caller may back off and retry.
    pub fn is_resource_limit(&self) -> bool {
        matches!(
            self,
            NicError::TooLarge { .. } | NicError::Overrun { .. } | NicError::PingSequenceOverflow(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NicError>;
