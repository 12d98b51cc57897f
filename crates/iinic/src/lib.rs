//! Driver and link-layer framing for the iinic radio transceiver.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte channels to the device (TCP relay, USB serial)
//! - [`token`]: escaped token protocol spoken on the channel
//! - [`nic`]: session driver (reset, settings, pings, transmit flow control)
//! - [`frame`]: CRC-8 framed, addressed packets on top of a session
//!
//! [`connect`] opens a session from a [`Target`], which is what most programs
//! want.

use iinic_nic::{Nic, NicConfig};
use iinic_transport::{ByteChannel, Deadline, TcpChannel};

/// Re-export transport types.
pub mod transport {
    pub use iinic_transport::*;
}

/// Re-export token codec types.
pub mod token {
    pub use iinic_token::*;
}

/// Re-export session types.
pub mod nic {
    pub use iinic_nic::*;
}

/// Re-export frame types.
pub mod frame {
    pub use iinic_frame::*;
}

/// Boxed channel used when the transport is picked at runtime.
pub type DynChannel = Box<dyn ByteChannel + Send>;

/// Where the device is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Serial device node.
    Serial(std::path::PathBuf),
    /// The single FT232R adapter found in sysfs.
    DetectSerial,
    /// TCP relay.
    Tcp { host: String, port: u16 },
}

impl Target {
    /// Open the byte channel without touching the device.
    pub fn open_channel(&self) -> iinic_transport::Result<DynChannel> {
        match self {
            Target::Tcp { host, port } => Ok(Box::new(TcpChannel::connect(host, *port)?)),
            #[cfg(unix)]
            Target::Serial(path) => Ok(Box::new(iinic_transport::SerialChannel::open(path)?)),
            #[cfg(unix)]
            Target::DetectSerial => Ok(Box::new(iinic_transport::SerialChannel::open_detected()?)),
            #[cfg(not(unix))]
            Target::Serial(_) | Target::DetectSerial => {
                Err(iinic_transport::TransportError::DeviceNotFound)
            }
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Serial(path) => write!(f, "serial:{}", path.display()),
            Target::DetectSerial => f.write_str("serial:auto"),
            Target::Tcp { host, port } => write!(f, "tcp:{host}:{port}"),
        }
    }
}

/// Open `target` and reset the device with `config`.
pub fn connect(
    target: &Target,
    config: NicConfig,
    deadline: Deadline,
) -> iinic_nic::Result<Nic<DynChannel>> {
    let channel = target.open_channel()?;
    Nic::open_with_config(channel, config, deadline)
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn target_display() {
        assert_eq!(
            Target::Tcp {
                host: "localhost".into(),
                port: 2048,
            }
            .to_string(),
            "tcp:localhost:2048"
        );
        assert_eq!(Target::DetectSerial.to_string(), "serial:auto");
    }

    #[test]
    fn connect_times_out_on_silent_relay() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = Target::Tcp {
            host: "127.0.0.1".into(),
            port,
        };

        let err = connect(
            &target,
            NicConfig::default(),
            Deadline::after(std::time::Duration::from_millis(50)),
        )
        .unwrap_err();
        assert!(matches!(err, iinic_nic::NicError::Timeout(_)));
        drop(listener);
    }
}
