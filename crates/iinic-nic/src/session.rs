use std::collections::{HashMap, VecDeque};
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use iinic_token::{decode_token, escape_payload, Token, ESCAPE};
use iinic_transport::{ByteChannel, Deadline};
use tracing::{debug, info, trace};

use crate::clock::{ticks_to_whole_us, us_to_ticks, SessionClock};
use crate::config::NicConfig;
use crate::error::{NicError, Result};
use crate::ping::{PendingPing, PingHandle};
use crate::radio::{Bitrate, Channel, Gain, Power, Rssi};

/// Capacity of the device transmit buffer in bytes.
pub const TX_BUFFER_SIZE: usize = 1536;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// What `tx` does when the device transmit buffer is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverrunPolicy {
    /// Fail with [`NicError::Overrun`] right away.
    #[default]
    Fail,
    /// Keep receiving until enough pings are acknowledged or the deadline
    /// passes.
    Block,
}

/// Radio bytes received between two Rx tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxFrameRun {
    /// Received bytes, unstuffed.
    pub bytes: Bytes,
    /// RSSI reported by the device.
    pub rssi: u16,
    /// Device time of the run in microseconds since reset.
    pub timing: u64,
}

#[derive(Debug, Clone, Copy)]
struct RadioState {
    channel: Channel,
    rssi: Rssi,
    gain: Gain,
    power: Power,
    bitrate: Bitrate,
}

impl From<&NicConfig> for RadioState {
    fn from(config: &NicConfig) -> Self {
        Self {
            channel: config.channel,
            rssi: config.rssi,
            gain: config.gain,
            power: config.power,
            bitrate: config.bitrate,
        }
    }
}

/// A session with one iinic radio.
///
/// All state is touched only from the calling thread; wrap the session in a
/// mutex to share it.
pub struct Nic<C> {
    channel: C,
    config: NicConfig,
    rx_buf: BytesMut,
    rx_run: BytesMut,
    rx_frames: VecDeque<RxFrameRun>,
    pings: HashMap<u8, PendingPing>,
    ping_seq: u8,
    tx_queued: usize,
    uniq_id: u16,
    firmware_version: (u8, u8),
    clock: SessionClock,
    radio: RadioState,
}

impl<C: ByteChannel> Nic<C> {
    /// Open a session with default settings and reset the device.
    pub fn open(channel: C, deadline: Deadline) -> Result<Self> {
        Self::open_with_config(channel, NicConfig::default(), deadline)
    }

    /// Open a session with explicit settings and reset the device.
    pub fn open_with_config(channel: C, config: NicConfig, deadline: Deadline) -> Result<Self> {
        let radio = RadioState::from(&config);
        let mut nic = Self {
            channel,
            config,
            rx_buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            rx_run: BytesMut::new(),
            rx_frames: VecDeque::new(),
            pings: HashMap::new(),
            ping_seq: 0,
            tx_queued: 0,
            uniq_id: 0,
            firmware_version: (0, 0),
            clock: SessionClock::start(),
            radio,
        };
        nic.reset(deadline)?;
        Ok(nic)
    }

    /// Reset the device, apply the configured defaults and sync.
    ///
    /// Fails with [`NicError::Timeout`] if the device does not acknowledge the
    /// reset, or does not echo the follow-up ping, before `deadline`.
    pub fn reset(&mut self, deadline: Deadline) -> Result<()> {
        self.pings.clear();
        self.rx_buf.clear();

        self.send_token(Token::ResetRequest)?;

        let (version_high, version_low, uniq_id) = loop {
            match self.next_token(deadline)? {
                None => return Err(NicError::Timeout("reset acknowledgement")),
                Some(Token::ResetAck {
                    version_high,
                    version_low,
                    uniq_id,
                }) => break (version_high, version_low, uniq_id),
                Some(other) => trace!(token = ?other, "skipping token while resetting"),
            }
        };

        self.tx_queued = 0;
        self.rx_run.clear();
        self.rx_frames.clear();

        self.uniq_id = uniq_id;
        self.firmware_version = (version_high, version_low);
        self.clock = SessionClock::start();
        self.radio = RadioState::from(&self.config);

        let RadioState {
            channel,
            rssi,
            gain,
            power,
            bitrate,
        } = self.radio;
        self.send_token(Token::SetRxKnobs {
            frequency: channel.freq_register(),
            deviation: channel.deviation_register(),
            rx_knobs: channel.rx_knobs(gain, rssi),
        })?;
        self.send_token(Token::SetBitrate {
            bitrate: bitrate.code(),
        })?;
        self.send_token(Token::SetPower {
            power: power.code(),
        })?;

        if !self.sync(deadline)? {
            return Err(NicError::Timeout("radio configuration sync"));
        }

        info!(
            uniq_id,
            version_high,
            version_low,
            "iinic reset complete"
        );
        Ok(())
    }

    /// Send a ping and return a handle to await its echo.
    pub fn ping(&mut self) -> Result<PingHandle> {
        self.ping_releasing(0)
    }

    /// Ping round trip. Returns whether the echo arrived before `deadline`.
    pub fn sync(&mut self, deadline: Deadline) -> Result<bool> {
        self.ping()?.wait(self, deadline)
    }

    /// Register a callback for when `handle` is acknowledged.
    ///
    /// Runs immediately if the ping was already acknowledged. Callbacks for a
    /// ping dropped by a reset never run.
    pub fn on_ping_ack(&mut self, handle: &PingHandle, callback: impl FnOnce() + Send + 'static) {
        match self.pings.get_mut(&handle.seq()) {
            Some(pending) if handle.same_slot(&pending.acked) => {
                pending.callbacks.push(Box::new(callback));
            }
            _ if handle.is_acked() => callback(),
            _ => {}
        }
    }

    /// Next ping sequence number, if no outstanding ping still holds it.
    fn next_ping_seq(&self) -> Result<u8> {
        let seq = self.ping_seq.wrapping_add(1);
        if self.pings.contains_key(&seq) {
            return Err(NicError::PingSequenceOverflow(seq));
        }
        Ok(seq)
    }

    fn ping_releasing(&mut self, release: usize) -> Result<PingHandle> {
        let seq = self.next_ping_seq()?;
        self.ping_seq = seq;

        let (pending, handle) = PendingPing::new(seq, release);
        self.pings.insert(seq, pending);
        if let Err(err) = self.send_token(Token::Ping { seq }) {
            self.pings.remove(&seq);
            return Err(err);
        }
        Ok(handle)
    }

    /// Queue `payload` for transmission.
    ///
    /// The device buffer holds [`TX_BUFFER_SIZE`] bytes. Queued bytes are
    /// released when the ping issued right after the payload comes back,
    /// which means the device has moved past it. The returned handle is that
    /// ping; an empty payload sends nothing and returns `None`.
    pub fn tx(
        &mut self,
        payload: &[u8],
        policy: OverrunPolicy,
        deadline: Deadline,
    ) -> Result<Option<PingHandle>> {
        if payload.is_empty() {
            return Ok(None);
        }

        let capacity = self.config.tx_buffer_size;
        if payload.len() > capacity {
            return Err(NicError::TooLarge {
                size: payload.len(),
                max: capacity,
            });
        }

        // Collect acks that are already here so the ping map stays small.
        while self.pump(Deadline::Immediate)?.is_some() {}

        if policy == OverrunPolicy::Block {
            while self.tx_queued + payload.len() > capacity {
                debug!(
                    queued = self.tx_queued,
                    requested = payload.len(),
                    "waiting for tx buffer space"
                );
                if self.pump(deadline)?.is_none() {
                    break;
                }
            }
        }

        if self.tx_queued + payload.len() > capacity {
            return Err(NicError::Overrun {
                queued: self.tx_queued,
                requested: payload.len(),
                capacity,
            });
        }

        // The trailing ping must be allocatable before any payload goes out.
        self.next_ping_seq()?;

        let mut wire = BytesMut::with_capacity(payload.len() + 2);
        escape_payload(payload, &mut wire);
        Token::Tx.encode(&mut wire);
        self.channel.send(&wire)?;

        self.tx_queued += payload.len();
        self.ping_releasing(payload.len()).map(Some)
    }

    /// Oldest received run, waiting until `deadline` if none is queued.
    pub fn rx(&mut self, deadline: Deadline) -> Result<Option<RxFrameRun>> {
        loop {
            if let Some(run) = self.rx_frames.pop_front() {
                return Ok(Some(run));
            }
            if self.pump(deadline)?.is_none() {
                return Ok(None);
            }
        }
    }

    /// Process one token from the device.
    ///
    /// Returns the token, or `None` if nothing arrived before `deadline`.
    pub fn pump(&mut self, deadline: Deadline) -> Result<Option<Token>> {
        let Some(token) = self.next_token(deadline)? else {
            return Ok(None);
        };

        match token {
            Token::Unescape => self.rx_run.put_u8(ESCAPE),
            Token::PlainByte(byte) => self.rx_run.put_u8(byte),
            Token::Rx {
                timing_lo,
                timing_hi,
                rssi,
            } => {
                let ticks = (u64::from(timing_hi) << 16) | u64::from(timing_lo);
                let run = RxFrameRun {
                    bytes: self.rx_run.split().freeze(),
                    rssi,
                    timing: ticks_to_whole_us(ticks),
                };
                trace!(len = run.bytes.len(), rssi, timing = run.timing, "received run");
                self.rx_frames.push_back(run);
            }
            Token::Ping { seq } => self.complete_ping(seq),
            other => return Err(NicError::UnexpectedToken(other)),
        }

        Ok(Some(token))
    }

    fn complete_ping(&mut self, seq: u8) {
        match self.pings.remove(&seq) {
            Some(pending) => {
                let release = pending.complete();
                self.tx_queued = self.tx_queued.saturating_sub(release);
                trace!(seq, released = release, "ping acknowledged");
            }
            None => debug!(seq, "ignoring ping echo with no pending ping"),
        }
    }

    fn next_token(&mut self, deadline: Deadline) -> Result<Option<Token>> {
        loop {
            if let Some(token) = decode_token(&mut self.rx_buf)? {
                return Ok(Some(token));
            }
            match self.channel.recv(deadline)? {
                Some(chunk) => self.rx_buf.extend_from_slice(&chunk),
                None => return Ok(None),
            }
        }
    }

    fn send_token(&mut self, token: Token) -> Result<()> {
        let mut wire = BytesMut::with_capacity(token.wire_len());
        token.encode(&mut wire);
        self.channel.send(&wire)?;
        Ok(())
    }

    /// Switch the receive channel.
    pub fn set_channel(&mut self, channel: Channel) -> Result<()> {
        self.send_token(Token::SetRxKnobs {
            frequency: channel.freq_register(),
            deviation: channel.deviation_register(),
            rx_knobs: channel.rx_knobs(self.radio.gain, self.radio.rssi),
        })?;
        debug!(%channel, "set channel");
        self.radio.channel = channel;
        Ok(())
    }

    pub fn set_bitrate(&mut self, bitrate: Bitrate) -> Result<()> {
        self.send_token(Token::SetBitrate {
            bitrate: bitrate.code(),
        })?;
        debug!(bps = bitrate.nominal_bps(), "set bitrate");
        self.radio.bitrate = bitrate;
        Ok(())
    }

    /// Set receiver gain and RSSI threshold.
    pub fn set_sensitivity(&mut self, gain: Gain, rssi: Rssi) -> Result<()> {
        let channel = self.radio.channel;
        self.send_token(Token::SetRxKnobs {
            frequency: channel.freq_register(),
            deviation: channel.deviation_register(),
            rx_knobs: channel.rx_knobs(gain, rssi),
        })?;
        debug!(?gain, ?rssi, "set sensitivity");
        self.radio.gain = gain;
        self.radio.rssi = rssi;
        Ok(())
    }

    pub fn set_power(&mut self, power: Power) -> Result<()> {
        self.send_token(Token::SetPower {
            power: power.code(),
        })?;
        debug!(?power, "set power");
        self.radio.power = power;
        Ok(())
    }

    /// Program the absolute timing register: the next transmission starts
    /// at `timing_us` microseconds after reset.
    pub fn set_timing(&mut self, timing_us: u64) -> Result<()> {
        let ticks = us_to_ticks(timing_us);
        debug!(timing_us, ticks, "set timing");
        self.send_token(Token::timing(ticks))
    }

    /// Set the position of a simulated device.
    pub fn set_pos(&mut self, x: i32, y: i32) -> Result<()> {
        self.send_token(Token::SetPos { x, y })
    }
}

impl<C> Nic<C> {
    /// Unique id reported by the device at reset.
    pub fn uniq_id(&self) -> u16 {
        self.uniq_id
    }

    /// Firmware version reported at reset, as `(high, low)`.
    pub fn firmware_version(&self) -> (u8, u8) {
        self.firmware_version
    }

    /// Host estimate of the device clock in microseconds since reset.
    pub fn approx_timing(&self) -> u64 {
        self.clock.elapsed_us()
    }

    pub fn channel(&self) -> Channel {
        self.radio.channel
    }

    pub fn bitrate(&self) -> Bitrate {
        self.radio.bitrate
    }

    pub fn power(&self) -> Power {
        self.radio.power
    }

    pub fn gain(&self) -> Gain {
        self.radio.gain
    }

    pub fn rssi(&self) -> Rssi {
        self.radio.rssi
    }

    /// Bytes handed to the device and not yet confirmed transmitted.
    pub fn tx_queued(&self) -> usize {
        self.tx_queued
    }

    pub fn pending_pings(&self) -> usize {
        self.pings.len()
    }

    pub fn config(&self) -> &NicConfig {
        &self.config
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Consume the session and return the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }
}

impl<C> fmt::Debug for Nic<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nic")
            .field("uniq_id", &self.uniq_id)
            .field("firmware_version", &self.firmware_version)
            .field("tx_queued", &self.tx_queued)
            .field("pending_pings", &self.pings.len())
            .field("queued_runs", &self.rx_frames.len())
            .finish()
    }
}
