use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits, TTYPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ByteChannel, Deadline};

const SYSFS_USB_SERIAL: &str = "/sys/bus/usb-serial/devices/";
const INTERFACE_MAGIC: &str = "FT232R USB UART";
const READ_CHUNK_SIZE: usize = 4096;

/// Line rate of the iinic USB adapter.
pub const BAUD_RATE: u32 = 230_400;

/// Longest single blocking read; `Deadline::Forever` reads in slices of this.
const FOREVER_SLICE: Duration = Duration::from_secs(3600);

/// Radio attached through its FT232R USB serial adapter, raw 8N1 at
/// [`BAUD_RATE`].
pub struct SerialChannel {
    port: TTYPort,
    path: PathBuf,
}

impl SerialChannel {
    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let port = serialport::new(path.to_string_lossy(), BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(FOREVER_SLICE)
            .open_native()
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e.into(),
            })?;

        info!(?path, baud = BAUD_RATE, "opened iinic serial device");
        Ok(Self { port, path })
    }

    /// Open the single detected iinic adapter.
    pub fn open_detected() -> Result<Self> {
        Self::open(Self::detect_device()?)
    }

    /// Find the one USB serial adapter whose interface is an FT232R UART.
    pub fn detect_device() -> Result<PathBuf> {
        detect_device_in(Path::new(SYSFS_USB_SERIAL))
    }

    /// Device path this channel was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "usb-serial"
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout).map_err(|e| {
            TransportError::Configure {
                path: self.path.clone(),
                source: e.into(),
            }
        })
    }

    fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.port.read(&mut chunk) {
                Ok(0) => {
                    debug!(path = ?self.path, "serial device hung up");
                    return Err(TransportError::ConnectionLost);
                }
                Ok(n) => return Ok(Some(Bytes::copy_from_slice(&chunk[..n]))),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(None)
                }
                Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                    debug!(path = ?self.path, "serial device disconnected");
                    return Err(TransportError::ConnectionLost);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl ByteChannel for SerialChannel {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        Ok(())
    }

    fn recv(&mut self, deadline: Deadline) -> Result<Option<Bytes>> {
        match deadline.remaining() {
            None => loop {
                self.set_timeout(FOREVER_SLICE)?;
                if let Some(bytes) = self.read_chunk()? {
                    return Ok(Some(bytes));
                }
            },
            Some(left) if left.is_zero() => {
                let pending = self.port.bytes_to_read().map_err(std::io::Error::from)?;
                if pending == 0 {
                    return Ok(None);
                }
                self.set_timeout(Duration::from_millis(1))?;
                self.read_chunk()
            }
            Some(left) => {
                self.set_timeout(left)?;
                self.read_chunk()
            }
        }
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("path", &self.path)
            .finish()
    }
}

fn detect_device_in(sysfs: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(sysfs).map_err(|_| TransportError::DeviceNotFound)?;

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(interface) = std::fs::canonicalize(entry.path().join("..").join("interface"))
        else {
            continue;
        };
        if !interface.is_file() {
            continue;
        }
        match std::fs::read_to_string(&interface) {
            Ok(text) if text.starts_with(INTERFACE_MAGIC) => candidates.push(name),
            _ => continue,
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(TransportError::DeviceNotFound),
        1 => Ok(Path::new("/dev").join(&candidates[0])),
        _ => Err(TransportError::AmbiguousDevice(candidates)),
    }
}
