//! Radio register enumerations.
//!
//! Values are device-defined and written to the registers unchanged.

use std::fmt;

use crate::error::{NicError, Result};

/// Receiver bandwidth, stored in bits 5..7 of the rx knobs register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Bandwidth {
    Khz400 = 1 << 5,
    Khz340 = 2 << 5,
    Khz270 = 3 << 5,
    Khz200 = 4 << 5,
    Khz134 = 5 << 5,
    Khz67 = 6 << 5,
}

impl Bandwidth {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            c if c == Bandwidth::Khz400 as u8 => Some(Bandwidth::Khz400),
            c if c == Bandwidth::Khz340 as u8 => Some(Bandwidth::Khz340),
            c if c == Bandwidth::Khz270 as u8 => Some(Bandwidth::Khz270),
            c if c == Bandwidth::Khz200 as u8 => Some(Bandwidth::Khz200),
            c if c == Bandwidth::Khz134 as u8 => Some(Bandwidth::Khz134),
            c if c == Bandwidth::Khz67 as u8 => Some(Bandwidth::Khz67),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn khz(self) -> u32 {
        match self {
            Bandwidth::Khz400 => 400,
            Bandwidth::Khz340 => 340,
            Bandwidth::Khz270 => 270,
            Bandwidth::Khz200 => 200,
            Bandwidth::Khz134 => 134,
            Bandwidth::Khz67 => 67,
        }
    }
}

/// RSSI detection threshold, in dBm below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Rssi {
    Dbm103 = 0,
    Dbm97 = 1,
    Dbm91 = 2,
    Dbm85 = 3,
    Dbm79 = 4,
    Dbm73 = 5,
}

impl Rssi {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// LNA gain reduction, stored in bits 3..4 of the rx knobs register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Gain {
    Db0 = 0 << 3,
    Db6 = 1 << 3,
    Db14 = 2 << 3,
    Db20 = 3 << 3,
}

impl Gain {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Transmit power step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Power {
    P0 = 0,
    P25 = 1,
    P50 = 2,
    P75 = 3,
    P100 = 4,
    P125 = 5,
    P150 = 6,
    P175 = 7,
}

impl Power {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Data rate register value.
///
/// The low seven bits are the divider `R`, bit 7 selects the /8 prescaler:
/// `bps = 10 MHz / 29 / (R + 1) / (prescaler ? 8 : 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Bitrate {
    Bps600 = 0x80 | 71,
    Bps1200 = 0x80 | 35,
    Bps2400 = 143,
    Bps3600 = 95,
    Bps4800 = 71,
    Bps9600 = 35,
    Bps11400 = 29,
    Bps19200 = 17,
    Bps28800 = 11,
    // The three fastest rates are unreliable on real hardware.
    Bps38400 = 8,
    Bps57600 = 5,
    Bps115200 = 2,
}

/// Bytes per second at divider 0 without prescaler.
const BYTE_CLOCK_HZ: f64 = 43103.448;

impl Bitrate {
    pub const ALL: [Bitrate; 12] = [
        Bitrate::Bps600,
        Bitrate::Bps1200,
        Bitrate::Bps2400,
        Bitrate::Bps3600,
        Bitrate::Bps4800,
        Bitrate::Bps9600,
        Bitrate::Bps11400,
        Bitrate::Bps19200,
        Bitrate::Bps28800,
        Bitrate::Bps38400,
        Bitrate::Bps57600,
        Bitrate::Bps115200,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Nominal rate this code is named after.
    pub fn nominal_bps(self) -> u32 {
        match self {
            Bitrate::Bps600 => 600,
            Bitrate::Bps1200 => 1200,
            Bitrate::Bps2400 => 2400,
            Bitrate::Bps3600 => 3600,
            Bitrate::Bps4800 => 4800,
            Bitrate::Bps9600 => 9600,
            Bitrate::Bps11400 => 11400,
            Bitrate::Bps19200 => 19200,
            Bitrate::Bps28800 => 28800,
            Bitrate::Bps38400 => 38400,
            Bitrate::Bps57600 => 57600,
            Bitrate::Bps115200 => 115200,
        }
    }

    pub fn from_nominal_bps(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.nominal_bps() == bps)
    }

    /// Seconds needed to put one byte on air.
    pub fn byte_time(self) -> f64 {
        let code = self.code();
        let divider = f64::from(code & 0x7F) + 1.0;
        let prescaler = if code & 0x80 != 0 { 8.0 } else { 1.0 };
        divider * prescaler / BYTE_CLOCK_HZ
    }

    /// Actual bit rate produced by the register value.
    pub fn bps(self) -> f64 {
        8.0 / self.byte_time()
    }
}

/// Receive channel settings as written to the rx knobs register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    freq: u16,
    dev: u8,
    bw: Bandwidth,
}

impl Channel {
    pub const fn new(freq: u16, dev: u8, bw: Bandwidth) -> Self {
        Self { freq, dev, bw }
    }

    /// Build a channel from raw register values.
    pub fn from_raw(freq: u16, dev: u8, bw: u8) -> Result<Self> {
        let bw = Bandwidth::from_code(bw).ok_or(NicError::InvalidBandwidth(bw))?;
        Ok(Self::new(freq, dev, bw))
    }

    pub fn freq_register(&self) -> u16 {
        self.freq
    }

    pub fn deviation_register(&self) -> u8 {
        self.dev
    }

    pub fn bandwidth(&self) -> Bandwidth {
        self.bw
    }

    pub fn frequency_mhz(&self) -> f64 {
        20.0 * (43.0 + f64::from(self.freq) / 4000.0)
    }

    pub fn deviation_khz(&self) -> u32 {
        15 * (1 + u32::from(self.dev))
    }

    pub fn bandwidth_khz(&self) -> u32 {
        self.bw.khz()
    }

    /// Value of the rx knobs register for this channel.
    pub fn rx_knobs(&self, gain: Gain, rssi: Rssi) -> u8 {
        self.bw.code() | gain.code() | rssi.code()
    }
}

impl Default for Channel {
    /// 868.32 MHz, 60 kHz deviation, 67 kHz bandwidth.
    fn default() -> Self {
        Self::new(0x680, 3, Bandwidth::Khz67)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Channel(frequency = {:.6}MHz, deviation = {}kHz, bandwidth = {}kHz)",
            self.frequency_mhz(),
            self.deviation_khz(),
            self.bandwidth_khz()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_channel_properties() {
        let channel = Channel::default();
        assert!((channel.frequency_mhz() - 868.32).abs() < 1e-9);
        assert_eq!(channel.deviation_khz(), 60);
        assert_eq!(channel.bandwidth_khz(), 67);
    }

    #[test]
    fn from_raw_rejects_unknown_bandwidth() {
        assert!(Channel::from_raw(0x680, 3, 0xC0).is_ok());
        assert!(matches!(
            Channel::from_raw(0x680, 3, 0x00),
            Err(NicError::InvalidBandwidth(0x00))
        ));
        assert!(matches!(
            Channel::from_raw(0x680, 3, 7 << 5),
            Err(NicError::InvalidBandwidth(0xE0))
        ));
    }

    #[test]
    fn rx_knobs_combines_fields() {
        let knobs = Channel::default().rx_knobs(Gain::Db20, Rssi::Dbm91);
        assert_eq!(knobs, 0xC0 | 0x18 | 0x02);
    }

    #[test]
    fn register_codes_are_bit_exact() {
        assert_eq!(Bitrate::Bps600.code(), 199);
        assert_eq!(Bitrate::Bps1200.code(), 163);
        assert_eq!(Bitrate::Bps9600.code(), 35);
        assert_eq!(Bitrate::Bps115200.code(), 2);
        assert_eq!(Gain::Db14.code(), 16);
        assert_eq!(Power::P175.code(), 7);
        assert_eq!(Rssi::Dbm73.code(), 5);
        assert_eq!(Bandwidth::Khz400.code(), 32);
    }

    #[test]
    fn bitrate_codes_match_nominal_rates() {
        assert!((Bitrate::Bps9600.bps() - 9578.544).abs() < 0.01);
        assert!((Bitrate::Bps600.bps() - 598.659).abs() < 0.01);
        assert_eq!(Bitrate::from_nominal_bps(19200), Some(Bitrate::Bps19200));
        assert_eq!(Bitrate::from_nominal_bps(1000), None);
    }

    #[test]
    fn byte_time_at_9600() {
        let expected = 36.0 / 43103.448;
        assert!((Bitrate::Bps9600.byte_time() - expected).abs() < 1e-12);
    }

    #[test]
    fn prescaled_codes_divide_by_eight_more() {
        for (bitrate, ticks) in [
            (Bitrate::Bps600, 72.0 * 8.0),
            (Bitrate::Bps1200, 36.0 * 8.0),
            (Bitrate::Bps2400, 16.0 * 8.0),
        ] {
            let expected = ticks / 43103.448;
            assert!(
                (bitrate.byte_time() - expected).abs() < 1e-12,
                "{bitrate:?}"
            );
        }
        assert!((Bitrate::Bps1200.bps() - 1197.318).abs() < 0.01);
    }

    #[test]
    fn display_matches_channel_properties() {
        let text = Channel::default().to_string();
        assert!(text.contains("868.320000MHz"));
        assert!(text.contains("60kHz"));
        assert!(text.contains("67kHz"));
    }
}
