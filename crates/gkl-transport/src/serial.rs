use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ByteSink, ByteSource, StreamLink};

/// Serial line settings for one dispenser channel (always 8N1, no flow control).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Upper bound on a blocking write.
    pub write_timeout: Duration,
}

impl SerialConfig {
    /// Default line speed of the dispenser link.
    pub const DEFAULT_BAUD_RATE: u32 = 9600;

    /// Settings for `path` at the default line speed.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            write_timeout: Duration::from_millis(100),
        }
    }
}

/// An open serial port serving one channel.
///
/// Writes block until the frame is out (bounded by the configured timeout).
/// Reads only return bytes the driver already holds.
pub struct SerialLink {
    link: StreamLink<Box<dyn SerialPort>>,
    path: String,
}

impl SerialLink {
    /// Open the port described by `config`.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(config.path.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.write_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: config.path.clone(),
                source,
            })?;

        info!(path = %config.path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            link: StreamLink::new(port),
            path: config.path.clone(),
        })
    }

    /// Device path this link was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Discard anything buffered by the driver in either direction.
    pub fn clear(&mut self) -> Result<()> {
        self.link
            .get_mut()
            .clear(serialport::ClearBuffer::All)
            .map_err(|err| TransportError::Io(err.into()))?;
        debug!(path = %self.path, "cleared serial buffers");
        Ok(())
    }
}

impl ByteSink for SerialLink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.link.send(bytes)
    }
}

impl ByteSource for SerialLink {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        let pending = self
            .link
            .get_ref()
            .bytes_to_read()
            .map_err(|err| TransportError::Io(err.into()))? as usize;
        if pending == 0 {
            return Ok(0);
        }
        let want = pending.min(buf.len());
        self.link.read_available(&mut buf[..want])
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let config = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(config.path, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.write_timeout, Duration::from_millis(100));
    }

    #[test]
    fn open_missing_port_fails() {
        let config = SerialConfig::new("/dev/gkl-port-that-does-not-exist");
        let err = SerialLink::open(&config).unwrap_err();
        match err {
            TransportError::Open { path, .. } => {
                assert_eq!(path, "/dev/gkl-port-that-does-not-exist")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
