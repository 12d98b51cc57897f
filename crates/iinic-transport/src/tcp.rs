use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ByteChannel, Deadline};

/// Port the serial relay listens on.
pub const DEFAULT_PORT: u16 = 2048;

const READ_CHUNK_SIZE: usize = 4096;

/// Radio reached through a TCP relay of its serial stream.
pub struct TcpChannel {
    stream: TcpStream,
    addr: String,
}

impl TcpChannel {
    /// Connect to a relay (blocking).
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr).map_err(|e| TransportError::Connect {
            addr: addr.clone(),
            source: e,
        })?;
        stream.set_nodelay(true)?;
        info!(%addr, "connected to iinic relay");
        Ok(Self { stream, addr })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        stream.set_nodelay(true)?;
        Ok(Self { stream, addr })
    }

    /// Relay address for diagnostics.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp-relay"
    }

    fn read_chunk(&mut self, deadline: Deadline, chunk: &mut [u8]) -> std::io::Result<usize> {
        match deadline.remaining() {
            Some(left) if left.is_zero() => {
                self.stream.set_nonblocking(true)?;
                let read = self.stream.read(chunk);
                self.stream.set_nonblocking(false)?;
                read
            }
            timeout => {
                self.stream.set_read_timeout(timeout)?;
                self.stream.read(chunk)
            }
        }
    }
}

impl ByteChannel for TcpChannel {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()?;
        Ok(())
    }

    fn recv(&mut self, deadline: Deadline) -> Result<Option<Bytes>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.read_chunk(deadline, &mut chunk) {
                Ok(0) => {
                    debug!(addr = %self.addr, "relay closed the connection");
                    return Err(TransportError::ConnectionLost);
                }
                Ok(n) => return Ok(Some(Bytes::copy_from_slice(&chunk[..n]))),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(None);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl std::fmt::Debug for TcpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpChannel")
            .field("addr", &self.addr)
            .finish()
    }
}
