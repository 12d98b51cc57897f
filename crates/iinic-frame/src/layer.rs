use std::fmt;

use iinic_nic::{Bitrate, Channel, Gain, Nic, OverrunPolicy, PingHandle, Power, Rssi};
use iinic_transport::{ByteChannel, Deadline};
use tracing::{debug, trace};

use crate::codec::{Decoded, Frame};
use crate::error::Result;

/// Microseconds subtracted per second of byte time from the arrival timing
/// the device reports, to get the time the first byte went on air.
pub const TIMING_CORRECTION_FACTOR: f64 = 5_000_000.0;

/// Frame layer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayerConfig {
    /// What `send_frame` does when the device transmit buffer is full.
    /// Default: fail right away.
    pub overrun: OverrunPolicy,
    /// How long `send_frame` may wait for buffer space under
    /// [`OverrunPolicy::Block`]. Default: forever.
    pub tx_deadline: Deadline,
}

impl Default for FrameLayerConfig {
    fn default() -> Self {
        Self {
            overrun: OverrunPolicy::Fail,
            tx_deadline: Deadline::Forever,
        }
    }
}

/// Sends and receives [`Frame`]s through a [`Nic`] session.
pub struct FrameLayer<C> {
    nic: Nic<C>,
    my_id: u16,
    config: FrameLayerConfig,
}

impl<C: ByteChannel> FrameLayer<C> {
    /// Wrap a session. The node id defaults to the device's unique id.
    pub fn new(nic: Nic<C>, my_id: Option<u16>) -> Self {
        Self::with_config(nic, my_id, FrameLayerConfig::default())
    }

    pub fn with_config(nic: Nic<C>, my_id: Option<u16>, config: FrameLayerConfig) -> Self {
        let my_id = my_id.unwrap_or_else(|| nic.uniq_id());
        Self { nic, my_id, config }
    }

    /// Return the next valid frame, or `None` once the session yields nothing
    /// before `deadline`.
    ///
    /// Runs that are too short or fail the checksum are dropped.
    pub fn receive_frame(&mut self, deadline: Deadline) -> Result<Option<Frame>> {
        loop {
            let Some(run) = self.nic.rx(deadline)? else {
                return Ok(None);
            };

            let timing = self.correct_timing(run.timing);
            match Frame::from_received(run.bytes, timing, run.rssi) {
                Decoded::Valid(frame) => {
                    trace!(
                        from = frame.from_id(),
                        to = frame.to_id(),
                        frame_type = frame.frame_type(),
                        len = frame.payload_len(),
                        "received frame"
                    );
                    return Ok(Some(frame));
                }
                Decoded::Incomplete {
                    expected,
                    available,
                } => debug!(expected, available, "dropping incomplete frame"),
                Decoded::Corrupt(frame) => debug!(
                    len = frame.wire_size(),
                    crc = frame.crc(),
                    "dropping frame with bad checksum"
                ),
            }

            if deadline.is_expired() {
                return Ok(None);
            }
        }
    }

    /// Send one frame.
    ///
    /// With `timing` (microseconds since the device reset) the device is told
    /// to transmit at that time and the low 32 bits are attached as the
    /// frame timestamp. Without it the frame goes out as soon as possible
    /// with no timestamp.
    pub fn send_frame(
        &mut self,
        frame_type: u8,
        from: u16,
        to: u16,
        payload: &[u8],
        timing: Option<u64>,
    ) -> Result<Option<PingHandle>> {
        let frame = Frame::to_send(frame_type, from, to, payload, timing.map(|t| t as u32))?;
        if let Some(timing) = timing {
            self.nic.set_timing(timing)?;
        }
        trace!(from, to, frame_type, len = payload.len(), ?timing, "sending frame");
        let handle = self
            .nic
            .tx(frame.as_bytes(), self.config.overrun, self.config.tx_deadline)?;
        Ok(handle)
    }

    /// Ping round trip. Returns whether the echo arrived before `deadline`.
    pub fn sync(&mut self, deadline: Deadline) -> Result<bool> {
        Ok(self.nic.sync(deadline)?)
    }

    pub fn set_bitrate(&mut self, bitrate: Bitrate) -> Result<()> {
        Ok(self.nic.set_bitrate(bitrate)?)
    }

    pub fn set_channel(&mut self, channel: Channel) -> Result<()> {
        Ok(self.nic.set_channel(channel)?)
    }

    pub fn set_power(&mut self, power: Power) -> Result<()> {
        Ok(self.nic.set_power(power)?)
    }

    pub fn set_sensitivity(&mut self, gain: Gain, rssi: Rssi) -> Result<()> {
        Ok(self.nic.set_sensitivity(gain, rssi)?)
    }
}

impl<C> FrameLayer<C> {
    pub fn my_id(&self) -> u16 {
        self.my_id
    }

    pub fn config(&self) -> &FrameLayerConfig {
        &self.config
    }

    /// Seconds needed to put one byte on air at the current bitrate.
    pub fn byte_send_time(&self) -> f64 {
        self.nic.bitrate().byte_time()
    }

    fn correct_timing(&self, timing_us: u64) -> i64 {
        (timing_us as f64 - TIMING_CORRECTION_FACTOR * self.byte_send_time()) as i64
    }

    pub fn nic(&self) -> &Nic<C> {
        &self.nic
    }

    pub fn nic_mut(&mut self) -> &mut Nic<C> {
        &mut self.nic
    }

    pub fn into_inner(self) -> Nic<C> {
        self.nic
    }
}

impl<C> fmt::Debug for FrameLayer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLayer")
            .field("my_id", &self.my_id)
            .field("config", &self.config)
            .field("nic", &self.nic)
            .finish()
    }
}
