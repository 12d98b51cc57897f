use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::crc8;
use crate::error::{FrameError, Result};

/// Size of a node id on the wire.
pub const ID_LENGTH: usize = 2;

/// Length byte, type byte, both ids and the CRC trailer.
pub const LENGTH_OVERHEAD: usize = 2 * ID_LENGTH + 3;

/// Size of the optional timestamp.
pub const TIMESTAMP_LENGTH: usize = 4;

/// Set in the type byte when a timestamp follows the payload.
pub const TIMESTAMP_FLAG: u8 = 0x80;

/// Largest payload the length byte can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Largest payload that still gets a timestamp attached.
pub const MAX_TIMED_PAYLOAD: usize = MAX_PAYLOAD - 6;

const TYPE_OFFSET: usize = 1;
const FROM_OFFSET: usize = 2;
const TO_OFFSET: usize = FROM_OFFSET + ID_LENGTH;
const PAYLOAD_OFFSET: usize = TO_OFFSET + ID_LENGTH;

/// A link-layer frame.
///
/// Frames built with [`Frame::to_send`] carry no reception metadata; frames
/// decoded with [`Frame::from_received`] carry the corrected arrival time and
/// RSSI reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
    timing: Option<i64>,
    rssi: Option<u16>,
}

/// Outcome of decoding a received run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Complete frame with a matching checksum.
    Valid(Frame),
    /// The run ends before the length byte says it should.
    Incomplete { expected: usize, available: usize },
    /// Complete frame whose checksum does not match.
    Corrupt(Frame),
}

impl Decoded {
    pub fn into_valid(self) -> Option<Frame> {
        match self {
            Decoded::Valid(frame) => Some(frame),
            _ => None,
        }
    }
}

impl Frame {
    /// Build a frame for transmission.
    ///
    /// A timestamp is attached whenever `timing` is given and the payload
    /// leaves room for it (at most [`MAX_TIMED_PAYLOAD`] bytes).
    pub fn to_send(
        frame_type: u8,
        from: u16,
        to: u16,
        payload: &[u8],
        timing: Option<u32>,
    ) -> Result<Self> {
        if frame_type & TIMESTAMP_FLAG != 0 {
            return Err(FrameError::InvalidType(frame_type));
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        let timestamp = timing.filter(|_| payload.len() <= MAX_TIMED_PAYLOAD);
        let flag = if timestamp.is_some() { TIMESTAMP_FLAG } else { 0 };

        let mut buf = BytesMut::with_capacity(
            payload.len() + LENGTH_OVERHEAD + timestamp.map_or(0, |_| TIMESTAMP_LENGTH),
        );
        buf.put_u8(payload.len() as u8);
        buf.put_u8(frame_type ^ flag);
        buf.put_u16_le(from);
        buf.put_u16_le(to);
        buf.put_slice(payload);
        if let Some(ts) = timestamp {
            buf.put_u32_le(ts);
        }
        let crc = crc8(&buf);
        buf.put_u8(crc);

        Ok(Self {
            bytes: buf.freeze(),
            timing: None,
            rssi: None,
        })
    }

    /// Decode a frame from the start of a received run.
    ///
    /// Bytes past the length announced by the header are ignored.
    pub fn from_received(bytes: Bytes, timing: i64, rssi: u16) -> Decoded {
        let Some(expected) = Self::expected_len(&bytes) else {
            return Decoded::Incomplete {
                expected: LENGTH_OVERHEAD,
                available: bytes.len(),
            };
        };
        if bytes.len() < expected {
            return Decoded::Incomplete {
                expected,
                available: bytes.len(),
            };
        }

        let frame = Self {
            bytes: bytes.slice(..expected),
            timing: Some(timing),
            rssi: Some(rssi),
        };
        if frame.is_valid() {
            Decoded::Valid(frame)
        } else {
            Decoded::Corrupt(frame)
        }
    }

    /// Total frame length announced by the first two bytes of `bytes`.
    pub fn expected_len(bytes: &[u8]) -> Option<usize> {
        let (&len, rest) = bytes.split_first()?;
        let &frame_type = rest.first()?;
        let timestamp = if frame_type & TIMESTAMP_FLAG != 0 {
            TIMESTAMP_LENGTH
        } else {
            0
        };
        Some(usize::from(len) + LENGTH_OVERHEAD + timestamp)
    }

    /// Frame type with the timestamp flag masked off.
    pub fn frame_type(&self) -> u8 {
        self.bytes[TYPE_OFFSET] & !TIMESTAMP_FLAG
    }

    pub fn has_timestamp(&self) -> bool {
        self.bytes[TYPE_OFFSET] & TIMESTAMP_FLAG != 0
    }

    pub fn from_id(&self) -> u16 {
        u16::from_le_bytes([self.bytes[FROM_OFFSET], self.bytes[FROM_OFFSET + 1]])
    }

    pub fn to_id(&self) -> u16 {
        u16::from_le_bytes([self.bytes[TO_OFFSET], self.bytes[TO_OFFSET + 1]])
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.bytes[0])
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[PAYLOAD_OFFSET..PAYLOAD_OFFSET + self.payload_len()]
    }

    /// Sender's timestamp, if one is attached.
    pub fn timestamp(&self) -> Option<u32> {
        if !self.has_timestamp() {
            return None;
        }
        let start = PAYLOAD_OFFSET + self.payload_len();
        let raw: [u8; TIMESTAMP_LENGTH] = self.bytes[start..start + TIMESTAMP_LENGTH]
            .try_into()
            .ok()?;
        Some(u32::from_le_bytes(raw))
    }

    /// Corrected arrival time of the first byte in microseconds since the
    /// device reset. `None` for frames built locally.
    pub fn timing(&self) -> Option<i64> {
        self.timing
    }

    /// RSSI reported on reception. `None` for frames built locally.
    pub fn rssi(&self) -> Option<u16> {
        self.rssi
    }

    /// Checksum trailer.
    pub fn crc(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    pub fn is_valid(&self) -> bool {
        let (crc, body) = match self.bytes.split_last() {
            Some(split) => split,
            None => return false,
        };
        crc8(body) == *crc
    }

    /// Wire bytes of the frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "From:{:5} To:{:5} Type:{:3}",
            self.from_id(),
            self.to_id(),
            self.frame_type()
        )?;
        match self.timestamp() {
            Some(ts) => write!(f, " Payload:{} bytes Sent on:{ts}", self.payload_len()),
            None => write!(f, " Payload:{} bytes", self.payload_len()),
        }
    }
}
