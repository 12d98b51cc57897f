//! Session driver for the iinic radio.
//!
//! A [`Nic`] owns a byte channel and speaks the token protocol to the
//! device: it resets the radio and applies default settings, pokes
//! configuration registers, uses ping round trips both for liveness and as
//! transmit backpressure, and reassembles received radio bytes into
//! [`RxFrameRun`]s.
//!
//! Everything here is single-threaded and cooperative: every blocking call
//! is a polling loop around one deadline-bounded transport read.

pub mod clock;
pub mod config;
pub mod error;
pub mod ping;
pub mod radio;
pub mod session;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use clock::{ticks_to_us, us_to_ticks, SessionClock};
pub use config::NicConfig;
pub use error::{NicError, Result};
pub use iinic_transport::Deadline;
pub use ping::PingHandle;
pub use radio::{Bandwidth, Bitrate, Channel, Gain, Power, Rssi};
pub use session::{Nic, OverrunPolicy, RxFrameRun, TX_BUFFER_SIZE};
