use std::fmt;
use std::io;

use iinic_frame::FrameError;
use iinic_nic::NicError;
use iinic_transport::TransportError;

// sysexits-style codes, plus 124 for timeouts as timeout(1) does.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PROTOCOL_ERROR: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const NO_DEVICE: i32 = 69;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => NO_DEVICE,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. }
        | TransportError::Open { source, .. }
        | TransportError::Configure { source, .. }
        | TransportError::Io(source) => io_error(context, source),
        TransportError::DeviceNotFound => CliError::new(NO_DEVICE, format!("{context}: {err}")),
        TransportError::AmbiguousDevice(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn nic_error(context: &str, err: NicError) -> CliError {
    match err {
        NicError::Transport(err) => transport_error(context, err),
        NicError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        NicError::Token(_) | NicError::UnexpectedToken(_) => {
            CliError::new(PROTOCOL_ERROR, format!("{context}: {err}"))
        }
        NicError::TooLarge { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        NicError::InvalidBandwidth(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Nic(err) => nic_error(context, err),
        FrameError::PayloadTooLarge { .. } | FrameError::InvalidType(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
