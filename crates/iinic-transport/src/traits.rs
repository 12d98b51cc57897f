use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::error::Result;

/// How long a blocking receive may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Block until data arrives.
    Forever,
    /// Poll once without blocking.
    Immediate,
    /// Give up at the given instant.
    At(Instant),
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Deadline::At(Instant::now() + timeout)
    }

    /// Time left before the deadline. `None` means wait forever.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Deadline::Forever => None,
            Deadline::Immediate => Some(Duration::ZERO),
            Deadline::At(at) => Some(at.saturating_duration_since(Instant::now())),
        }
    }

    /// True once an absolute deadline has passed.
    ///
    /// `Forever` and `Immediate` never expire: the latter is a single
    /// non-blocking poll per call rather than a point in time.
    pub fn is_expired(&self) -> bool {
        match self {
            Deadline::At(at) => Instant::now() >= *at,
            _ => false,
        }
    }
}

impl From<Option<Duration>> for Deadline {
    fn from(timeout: Option<Duration>) -> Self {
        match timeout {
            None => Deadline::Forever,
            Some(timeout) if timeout.is_zero() => Deadline::Immediate,
            Some(timeout) => Deadline::after(timeout),
        }
    }
}

/// A duplex byte stream to the radio.
///
/// `send` gives no flow-control signal back; the NIC protocol does its own
/// backpressure. `recv` must return `Ok(None)` when the deadline passes with
/// no data and `Err(TransportError::ConnectionLost)` when the peer closes.
pub trait ByteChannel {
    /// Write all bytes to the channel.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is available, waiting at most until `deadline`.
    fn recv(&mut self, deadline: Deadline) -> Result<Option<Bytes>>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for &mut C {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn recv(&mut self, deadline: Deadline) -> Result<Option<Bytes>> {
        (**self).recv(deadline)
    }
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn recv(&mut self, deadline: Deadline) -> Result<Option<Bytes>> {
        (**self).recv(deadline)
    }
}
