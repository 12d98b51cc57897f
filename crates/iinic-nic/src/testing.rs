//! In-memory emulation of the iinic firmware for tests.
//!
//! [`FakeDevice`] implements [`ByteChannel`]: bytes sent by the host are
//! decoded as the firmware would, and its replies are returned by `recv`.
//! `recv` never sleeps; a blocking deadline only differs from a poll in that
//! it lets one held ping echo through, which models time passing while the
//! radio drains its transmit buffer.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use iinic_token::{decode_token, escape_payload, Token, TokenError, ESCAPE};
use iinic_transport::{ByteChannel, Deadline, TransportError};

/// What the emulated firmware does with a ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingMode {
    /// Echo it right away.
    Echo,
    /// Echo it only when the host waits with a blocking deadline.
    Hold,
    /// Never echo it.
    Drop,
}

#[derive(Debug)]
pub struct FakeDevice {
    uniq_id: u16,
    version: (u8, u8),
    answer_reset: bool,
    ping_mode: PingMode,
    inbound: BytesMut,
    tx_run: Vec<u8>,
    output: BytesMut,
    held: VecDeque<Token>,
    transmitted: Vec<Vec<u8>>,
    control: Vec<Token>,
    desync: Option<TokenError>,
    closed: bool,
}

impl FakeDevice {
    pub fn new(uniq_id: u16) -> Self {
        Self {
            uniq_id,
            version: (1, 0),
            answer_reset: true,
            ping_mode: PingMode::Echo,
            inbound: BytesMut::new(),
            tx_run: Vec::new(),
            output: BytesMut::new(),
            held: VecDeque::new(),
            transmitted: Vec::new(),
            control: Vec::new(),
            desync: None,
            closed: false,
        }
    }

    pub fn with_version(mut self, high: u8, low: u8) -> Self {
        self.version = (high, low);
        self
    }

    pub fn set_answer_reset(&mut self, answer: bool) {
        self.answer_reset = answer;
    }

    pub fn set_ping_mode(&mut self, mode: PingMode) {
        self.ping_mode = mode;
    }

    /// Let every held ping echo through.
    pub fn release_held_pings(&mut self) {
        while let Some(token) = self.held.pop_front() {
            token.encode(&mut self.output);
        }
    }

    pub fn held_pings(&self) -> usize {
        self.held.len()
    }

    /// Queue a received radio run: stuffed data followed by an Rx token.
    pub fn inject_rx(&mut self, data: &[u8], rssi: u16, ticks: u64) {
        escape_payload(data, &mut self.output);
        Token::Rx {
            timing_lo: (ticks & 0xFFFF) as u16,
            timing_hi: (ticks >> 16) as u32,
            rssi,
        }
        .encode(&mut self.output);
    }

    /// Queue bytes exactly as given.
    pub fn inject_raw(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    /// Make every following `recv` report a lost connection.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Payloads the host asked the radio to transmit, unstuffed.
    pub fn transmitted(&self) -> &[Vec<u8>] {
        &self.transmitted
    }

    /// Every non-data token the host sent, in order.
    pub fn control_tokens(&self) -> &[Token] {
        &self.control
    }

    pub fn clear_control_tokens(&mut self) {
        self.control.clear();
    }

    /// Decode error hit while parsing host bytes, if any.
    pub fn desync(&self) -> Option<&TokenError> {
        self.desync.as_ref()
    }

    /// Feed bytes written by the host.
    pub fn handle_host_bytes(&mut self, data: &[u8]) {
        self.inbound.extend_from_slice(data);
        loop {
            let token = match decode_token(&mut self.inbound) {
                Ok(Some(token)) => token,
                Ok(None) => break,
                Err(err) => {
                    self.desync = Some(err);
                    self.inbound.clear();
                    break;
                }
            };
            self.handle_token(token);
        }
    }

    fn handle_token(&mut self, token: Token) {
        match token {
            Token::PlainByte(byte) => {
                self.tx_run.push(byte);
                return;
            }
            Token::Unescape => {
                self.tx_run.push(ESCAPE);
                return;
            }
            _ => self.control.push(token),
        }

        match token {
            Token::ResetRequest => {
                self.tx_run.clear();
                self.held.clear();
                if self.answer_reset {
                    Token::ResetAck {
                        version_high: self.version.0,
                        version_low: self.version.1,
                        uniq_id: self.uniq_id,
                    }
                    .encode(&mut self.output);
                }
            }
            Token::Ping { .. } => match self.ping_mode {
                PingMode::Echo => token.encode(&mut self.output),
                PingMode::Hold => self.held.push_back(token),
                PingMode::Drop => {}
            },
            Token::Tx => self.transmitted.push(std::mem::take(&mut self.tx_run)),
            _ => {}
        }
    }

    /// Bytes the host would read now.
    pub fn take_output(&mut self, deadline: Deadline) -> Option<Bytes> {
        if self.output.is_empty() && deadline != Deadline::Immediate {
            if let Some(token) = self.held.pop_front() {
                token.encode(&mut self.output);
            }
        }
        if self.output.is_empty() {
            return None;
        }
        Some(self.output.split().freeze())
    }
}

impl ByteChannel for FakeDevice {
    fn send(&mut self, data: &[u8]) -> iinic_transport::Result<()> {
        if self.closed {
            return Err(TransportError::ConnectionLost);
        }
        self.handle_host_bytes(data);
        Ok(())
    }

    fn recv(&mut self, deadline: Deadline) -> iinic_transport::Result<Option<Bytes>> {
        if self.closed {
            return Err(TransportError::ConnectionLost);
        }
        Ok(self.take_output(deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_reset_and_echoes_pings() {
        let mut device = FakeDevice::new(0x1234).with_version(2, 5);
        let mut wire = BytesMut::new();
        Token::ResetRequest.encode(&mut wire);
        Token::Ping { seq: 9 }.encode(&mut wire);
        device.send(&wire).unwrap();

        let mut out = BytesMut::from(device.recv(Deadline::Immediate).unwrap().unwrap().as_ref());
        assert_eq!(
            decode_token(&mut out).unwrap(),
            Some(Token::ResetAck {
                version_high: 2,
                version_low: 5,
                uniq_id: 0x1234,
            })
        );
        assert_eq!(decode_token(&mut out).unwrap(), Some(Token::Ping { seq: 9 }));
    }

    #[test]
    fn collects_transmitted_payloads() {
        let mut device = FakeDevice::new(1);
        let mut wire = BytesMut::new();
        escape_payload(&[1, ESCAPE, 2], &mut wire);
        Token::Tx.encode(&mut wire);
        device.send(&wire).unwrap();
        assert_eq!(device.transmitted(), &[vec![1, ESCAPE, 2]]);
    }

    #[test]
    fn held_pings_need_a_blocking_read() {
        let mut device = FakeDevice::new(1);
        device.set_ping_mode(PingMode::Hold);
        let mut wire = BytesMut::new();
        Token::Ping { seq: 1 }.encode(&mut wire);
        device.send(&wire).unwrap();

        assert!(device.recv(Deadline::Immediate).unwrap().is_none());
        assert_eq!(device.held_pings(), 1);
        assert!(device.recv(Deadline::Forever).unwrap().is_some());
        assert_eq!(device.held_pings(), 0);
    }

    #[test]
    fn closed_device_loses_connection() {
        let mut device = FakeDevice::new(1);
        device.close();
        assert!(matches!(
            device.recv(Deadline::Immediate),
            Err(TransportError::ConnectionLost)
        ));
    }
}
