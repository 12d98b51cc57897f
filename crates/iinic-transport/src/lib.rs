//! Duplex byte-channel transports for the iinic radio.
//!
//! The radio is reachable either through a USB serial adapter or through a
//! TCP relay that proxies the same serial stream. Both are exposed behind the
//! [`ByteChannel`] trait:
//! - `send` writes bytes with no flow-control feedback
//! - `recv` waits for bytes until a [`Deadline`] and returns `None` on timeout
//!
//! This is the lowest layer of iinic. Everything else builds on top of it.

pub mod error;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use tcp::{TcpChannel, DEFAULT_PORT};
pub use traits::{ByteChannel, Deadline};

#[cfg(unix)]
pub use serial::SerialChannel;
