use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default line rate of the wheel's serial interface.
pub const DEFAULT_BAUD: u32 = 460_800;

/// Upper bound on a single blocking read or write on the tty.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(100);

/// The wheel link is always 8N1 without flow control.
const DATA_BITS: DataBits = DataBits::Eight;
const PARITY: Parity = Parity::None;
const STOP_BITS: StopBits = StopBits::One;

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyAMA0`.
    pub path: PathBuf,
    /// Line rate in bits per second.
    pub baud: u32,
    /// How long a write may block before the port is considered stalled.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyAMA0"),
            baud: DEFAULT_BAUD,
            timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Tty transport on top of `serialport`.
///
/// Reads never block: `read_available` only pulls what the driver already
/// reports as buffered. Writes block until the bytes have left the UART or
/// the configured timeout passes.
pub struct SerialPort {
    port: Box<dyn serialport::SerialPort>,
    path: PathBuf,
    baud: u32,
    timeout: Duration,
}

impl SerialPort {
    /// Open a tty in 8N1 mode.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        if config.baud == 0 {
            return Err(TransportError::UnsupportedBaud(config.baud));
        }
        let path = config.path.clone();

        let port = serialport::new(path.to_string_lossy(), config.baud)
            .data_bits(DATA_BITS)
            .parity(PARITY)
            .stop_bits(STOP_BITS)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|err| open_error(&path, err))?;

        info!(?path, baud = config.baud, "serial port opened");

        Ok(Self {
            port,
            path,
            baud: config.baud,
            timeout: config.timeout,
        })
    }

    /// Device path this port was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured line rate.
    pub fn baud(&self) -> u32 {
        self.baud
    }
}

impl Transport for SerialPort {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.port.write_all(data).map_err(|err| match err.kind() {
            ErrorKind::TimedOut => {
                warn!(path = ?self.path, len = data.len(), "serial write stalled");
                TransportError::WriteTimeout(self.timeout)
            }
            ErrorKind::WriteZero => TransportError::Closed,
            _ => TransportError::Io(err),
        })?;

        // Hold until the UART has shifted the last byte out, so the reply
        // window starts after our own transmission ends.
        self.port.flush()?;
        Ok(data.len())
    }

    fn read_available(&mut self) -> Result<Bytes> {
        let pending = self.port.bytes_to_read().map_err(line_error)? as usize;
        if pending == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = vec![0u8; pending];
        let mut filled = 0usize;
        while filled < pending {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => break,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        buf.truncate(filled);
        Ok(Bytes::from(buf))
    }

    fn flush_input(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(line_error)
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        debug!(path = ?self.path, "serial port closed");
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("baud", &self.baud)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Line settings the driver refused are configuration errors; everything
/// else means the device could not be reached.
fn open_error(path: &Path, err: serialport::Error) -> TransportError {
    let path = path.to_path_buf();
    match err.kind() {
        serialport::ErrorKind::InvalidInput => TransportError::Configure {
            path,
            source: err.into(),
        },
        _ => TransportError::Open {
            path,
            source: err.into(),
        },
    }
}

fn line_error(err: serialport::Error) -> TransportError {
    TransportError::Io(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: impl Into<PathBuf>, baud: u32) -> SerialConfig {
        SerialConfig {
            path: path.into(),
            baud,
            ..SerialConfig::default()
        }
    }

    #[test]
    fn default_config_targets_wheel_rate() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud, 460_800);
        assert_eq!(cfg.path, PathBuf::from("/dev/ttyAMA0"));
        assert_eq!(cfg.timeout, DEFAULT_IO_TIMEOUT);
    }

    #[test]
    fn rejects_zero_baud_before_opening() {
        let err = SerialPort::open(&config("/nonexistent/tty", 0)).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaud(0)));
    }

    #[test]
    fn missing_device_reports_open_error() {
        let err = SerialPort::open(&config("/nonexistent/ttyNSS0", 115_200)).unwrap_err();
        match err {
            TransportError::Open { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/ttyNSS0"));
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn regular_file_is_not_a_serial_port() {
        let dir = std::env::temp_dir().join(format!("nsslink-serial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-tty");
        std::fs::write(&path, b"").unwrap();

        let err = SerialPort::open(&config(&path, 115_200)).unwrap_err();
        assert!(matches!(
            err,
            TransportError::Open { .. } | TransportError::Configure { .. }
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_input_maps_to_configure() {
        let err = serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad rate");
        let mapped = open_error(Path::new("/dev/ttyUSB0"), err);
        assert!(matches!(mapped, TransportError::Configure { .. }));

        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        let mapped = open_error(Path::new("/dev/ttyUSB0"), err);
        assert!(matches!(mapped, TransportError::Open { .. }));
    }
}
