//! Link-layer framing on top of an iinic session.
//!
//! Every frame on air is laid out as:
//! - a 1-byte payload length
//! - a 1-byte frame type, with bit 7 set when a timestamp is attached
//! - 2-byte little-endian source and destination ids
//! - the payload, then an optional 4-byte little-endian timestamp
//! - a CRC-8 trailer over everything before it
//!
//! [`FrameLayer`] sends and receives such frames through a [`iinic_nic::Nic`].

pub mod codec;
pub mod crc;
pub mod error;
pub mod layer;

pub use codec::{
    Decoded, Frame, ID_LENGTH, LENGTH_OVERHEAD, MAX_PAYLOAD, MAX_TIMED_PAYLOAD, TIMESTAMP_FLAG,
    TIMESTAMP_LENGTH,
};
pub use crc::crc8;
pub use error::{FrameError, Result};
pub use layer::{FrameLayer, FrameLayerConfig, TIMING_CORRECTION_FACTOR};
