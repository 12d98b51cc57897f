use crate::radio::{Bitrate, Channel, Gain, Power, Rssi};
use crate::session::TX_BUFFER_SIZE;

/// Settings applied to the radio on every reset.
#[derive(Debug, Clone, PartialEq)]
pub struct NicConfig {
    /// Receive channel. Default: 868.32 MHz / 60 kHz / 67 kHz.
    pub channel: Channel,
    /// RSSI threshold. Default: -91 dBm.
    pub rssi: Rssi,
    /// LNA gain reduction. Default: 20 dB.
    pub gain: Gain,
    /// Transmit power. Default: maximum.
    pub power: Power,
    /// Data rate. Default: 9600 bps.
    pub bitrate: Bitrate,
    /// Size of the device transmit buffer in bytes. Default: 1536.
    pub tx_buffer_size: usize,
}

impl Default for NicConfig {
    fn default() -> Self {
        Self {
            channel: Channel::default(),
            rssi: Rssi::Dbm91,
            gain: Gain::Db20,
            power: Power::P175,
            bitrate: Bitrate::Bps9600,
            tx_buffer_size: TX_BUFFER_SIZE,
        }
    }
}
