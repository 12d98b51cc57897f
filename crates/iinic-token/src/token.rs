use bytes::{Buf, BufMut, BytesMut};

/// Byte that starts every token on the wire.
pub const ESCAPE: u8 = 0x5A;

/// One unit of the multiplexed serial stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// A literal [`ESCAPE`] byte inside radio data.
    Unescape,
    /// Host asks the device to reset.
    ResetRequest,
    /// Device finished resetting.
    ResetAck {
        version_high: u8,
        version_low: u8,
        uniq_id: u16,
    },
    /// Receiver frequency, deviation and bandwidth/gain/RSSI knobs.
    SetRxKnobs {
        frequency: u16,
        deviation: u8,
        rx_knobs: u8,
    },
    SetPower {
        power: u8,
    },
    SetBitrate {
        bitrate: u8,
    },
    /// Absolute device timing register, in ticks split low 16 / high 32.
    Timing {
        timing_lo: u16,
        timing_hi: u32,
    },
    /// Liveness probe, echoed back verbatim by the device.
    Ping {
        seq: u8,
    },
    /// Transmit the bytes sent since the previous Tx.
    Tx,
    /// Closes a run of received radio bytes.
    Rx {
        timing_lo: u16,
        timing_hi: u32,
        rssi: u16,
    },
    /// Position of a simulated device.
    SetPos {
        x: i32,
        y: i32,
    },
    /// Any byte other than [`ESCAPE`].
    PlainByte(u8),
}

/// Token discriminant, used for the tag table and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Unescape,
    ResetRequest,
    ResetAck,
    SetRxKnobs,
    SetPower,
    SetBitrate,
    Timing,
    Ping,
    Tx,
    Rx,
    SetPos,
    PlainByte,
}

const ALL_TAGGED: [TokenKind; 11] = [
    TokenKind::Unescape,
    TokenKind::ResetRequest,
    TokenKind::ResetAck,
    TokenKind::SetRxKnobs,
    TokenKind::SetPower,
    TokenKind::SetBitrate,
    TokenKind::Timing,
    TokenKind::Ping,
    TokenKind::Tx,
    TokenKind::Rx,
    TokenKind::SetPos,
];

impl TokenKind {
    /// Tag byte following [`ESCAPE`]. `None` for plain bytes.
    pub const fn tag(self) -> Option<u8> {
        match self {
            TokenKind::Unescape => Some(0xA5),
            TokenKind::ResetRequest => Some(0x01),
            TokenKind::ResetAck => Some(0x5A),
            TokenKind::SetRxKnobs => Some(0x02),
            TokenKind::SetPower => Some(0x03),
            TokenKind::SetBitrate => Some(0x04),
            TokenKind::Timing => Some(0x05),
            TokenKind::Ping => Some(0x06),
            TokenKind::Tx => Some(0x07),
            TokenKind::Rx => Some(0x08),
            TokenKind::SetPos => Some(0x09),
            TokenKind::PlainByte => None,
        }
    }

    /// Size of the fixed payload after the tag.
    pub const fn tail_len(self) -> usize {
        match self {
            TokenKind::Unescape | TokenKind::ResetRequest | TokenKind::Tx => 0,
            TokenKind::ResetAck => 4,
            TokenKind::SetRxKnobs => 4,
            TokenKind::SetPower | TokenKind::SetBitrate | TokenKind::Ping => 1,
            TokenKind::Timing => 6,
            TokenKind::Rx => 8,
            TokenKind::SetPos => 8,
            TokenKind::PlainByte => 0,
        }
    }

    /// Total encoded size, escape and tag included.
    pub const fn wire_len(self) -> usize {
        match self {
            TokenKind::PlainByte => 1,
            other => 2 + other.tail_len(),
        }
    }

    /// Look up the kind for a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        TAG_TABLE[tag as usize].map(|entry| entry.kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Unescape => "Unescape",
            TokenKind::ResetRequest => "ResetRequest",
            TokenKind::ResetAck => "ResetAck",
            TokenKind::SetRxKnobs => "SetRxKnobs",
            TokenKind::SetPower => "SetPower",
            TokenKind::SetBitrate => "SetBitrate",
            TokenKind::Timing => "Timing",
            TokenKind::Ping => "Ping",
            TokenKind::Tx => "Tx",
            TokenKind::Rx => "Rx",
            TokenKind::SetPos => "SetPos",
            TokenKind::PlainByte => "PlainByte",
        }
    }
}

/// Decoder for one tagged kind. The slice is exactly `tail_len` bytes.
pub(crate) type DecodeFn = fn(&[u8]) -> Token;

#[derive(Clone, Copy)]
pub(crate) struct TagEntry {
    pub(crate) kind: TokenKind,
    pub(crate) decode: DecodeFn,
}

/// Tag byte to (kind, decoder), built once at compile time.
pub(crate) static TAG_TABLE: [Option<TagEntry>; 256] = build_tag_table();

const fn build_tag_table() -> [Option<TagEntry>; 256] {
    let mut table: [Option<TagEntry>; 256] = [None; 256];
    let mut i = 0;
    while i < ALL_TAGGED.len() {
        let kind = ALL_TAGGED[i];
        if let Some(tag) = kind.tag() {
            table[tag as usize] = Some(TagEntry {
                kind,
                decode: decoder_for(kind),
            });
        }
        i += 1;
    }
    table
}

const fn decoder_for(kind: TokenKind) -> DecodeFn {
    match kind {
        TokenKind::Unescape => decode_unescape,
        TokenKind::ResetRequest => decode_reset_request,
        TokenKind::ResetAck => decode_reset_ack,
        TokenKind::SetRxKnobs => decode_set_rx_knobs,
        TokenKind::SetPower => decode_set_power,
        TokenKind::SetBitrate => decode_set_bitrate,
        TokenKind::Timing => decode_timing,
        TokenKind::Ping => decode_ping,
        TokenKind::Tx => decode_tx,
        TokenKind::Rx => decode_rx,
        TokenKind::SetPos => decode_set_pos,
        // Plain bytes never reach the tag table.
        TokenKind::PlainByte => decode_unescape,
    }
}

fn decode_unescape(_: &[u8]) -> Token {
    Token::Unescape
}

fn decode_reset_request(_: &[u8]) -> Token {
    Token::ResetRequest
}

fn decode_reset_ack(mut tail: &[u8]) -> Token {
    Token::ResetAck {
        version_high: tail.get_u8(),
        version_low: tail.get_u8(),
        uniq_id: tail.get_u16_le(),
    }
}

fn decode_set_rx_knobs(mut tail: &[u8]) -> Token {
    Token::SetRxKnobs {
        frequency: tail.get_u16_le(),
        deviation: tail.get_u8(),
        rx_knobs: tail.get_u8(),
    }
}

fn decode_set_power(mut tail: &[u8]) -> Token {
    Token::SetPower {
        power: tail.get_u8(),
    }
}

fn decode_set_bitrate(mut tail: &[u8]) -> Token {
    Token::SetBitrate {
        bitrate: tail.get_u8(),
    }
}

fn decode_timing(mut tail: &[u8]) -> Token {
    Token::Timing {
        timing_lo: tail.get_u16_le(),
        timing_hi: tail.get_u32_le(),
    }
}

fn decode_ping(mut tail: &[u8]) -> Token {
    Token::Ping { seq: tail.get_u8() }
}

fn decode_tx(_: &[u8]) -> Token {
    Token::Tx
}

fn decode_rx(mut tail: &[u8]) -> Token {
    Token::Rx {
        timing_lo: tail.get_u16_le(),
        timing_hi: tail.get_u32_le(),
        rssi: tail.get_u16_le(),
    }
}

fn decode_set_pos(mut tail: &[u8]) -> Token {
    Token::SetPos {
        x: tail.get_i32_le(),
        y: tail.get_i32_le(),
    }
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Unescape => TokenKind::Unescape,
            Token::ResetRequest => TokenKind::ResetRequest,
            Token::ResetAck { .. } => TokenKind::ResetAck,
            Token::SetRxKnobs { .. } => TokenKind::SetRxKnobs,
            Token::SetPower { .. } => TokenKind::SetPower,
            Token::SetBitrate { .. } => TokenKind::SetBitrate,
            Token::Timing { .. } => TokenKind::Timing,
            Token::Ping { .. } => TokenKind::Ping,
            Token::Tx => TokenKind::Tx,
            Token::Rx { .. } => TokenKind::Rx,
            Token::SetPos { .. } => TokenKind::SetPos,
            Token::PlainByte(_) => TokenKind::PlainByte,
        }
    }

    /// Number of stream bytes this token occupies.
    pub fn wire_len(&self) -> usize {
        self.kind().wire_len()
    }

    /// Timing token for an absolute tick count. Bits above 48 are dropped.
    pub fn timing(ticks: u64) -> Self {
        Token::Timing {
            timing_lo: (ticks & 0xFFFF) as u16,
            timing_hi: (ticks >> 16) as u32,
        }
    }

    /// Append the wire form of this token.
    ///
    /// A `PlainByte(ESCAPE)` cannot travel bare and is written as
    /// [`Token::Unescape`].
    pub fn encode(&self, dst: &mut BytesMut) {
        let kind = self.kind();
        let Some(tag) = kind.tag() else {
            if let Token::PlainByte(value) = *self {
                if value == ESCAPE {
                    Token::Unescape.encode(dst);
                } else {
                    dst.put_u8(value);
                }
            }
            return;
        };

        dst.reserve(kind.wire_len());
        dst.put_u8(ESCAPE);
        dst.put_u8(tag);

        match *self {
            Token::ResetAck {
                version_high,
                version_low,
                uniq_id,
            } => {
                dst.put_u8(version_high);
                dst.put_u8(version_low);
                dst.put_u16_le(uniq_id);
            }
            Token::SetRxKnobs {
                frequency,
                deviation,
                rx_knobs,
            } => {
                dst.put_u16_le(frequency);
                dst.put_u8(deviation);
                dst.put_u8(rx_knobs);
            }
            Token::SetPower { power } => dst.put_u8(power),
            Token::SetBitrate { bitrate } => dst.put_u8(bitrate),
            Token::Timing {
                timing_lo,
                timing_hi,
            } => {
                dst.put_u16_le(timing_lo);
                dst.put_u32_le(timing_hi);
            }
            Token::Ping { seq } => dst.put_u8(seq),
            Token::Rx {
                timing_lo,
                timing_hi,
                rssi,
            } => {
                dst.put_u16_le(timing_lo);
                dst.put_u32_le(timing_hi);
                dst.put_u16_le(rssi);
            }
            Token::SetPos { x, y } => {
                dst.put_i32_le(x);
                dst.put_i32_le(y);
            }
            Token::Unescape | Token::ResetRequest | Token::Tx | Token::PlainByte(_) => {}
        }
    }
}
