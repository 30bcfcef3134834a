use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

const READ_CHUNK_SIZE: usize = 512;

/// How long a write may wait for the peer to drain its socket buffer.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

const WRITE_BACKOFF: Duration = Duration::from_millis(1);

/// Unix domain socket transport.
///
/// Used to reach a software wheel emulator that exposes the serial byte
/// stream over a socket instead of a tty. The socket carries the same
/// SLIP-framed bytes as the wire.
pub struct UnixSocketTransport {
    stream: UnixStream,
    path: Option<PathBuf>,
    write_timeout: Duration,
}

impl UnixSocketTransport {
    /// Connect to a listening emulator socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let transport = Self::from_stream(stream)?;
        info!(?path, "connected to emulator socket");
        Ok(Self {
            path: Some(path.to_path_buf()),
            ..transport
        })
    }

    /// Wrap an already connected stream (e.g. one half of a socket pair).
    pub fn from_stream(stream: UnixStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            path: None,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        })
    }

    /// Bound how long `write` waits on a peer that stopped reading.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Socket path, when created through [`connect`](Self::connect).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Transport for UnixSocketTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let deadline = Instant::now() + self.write_timeout;
        let mut offset = 0usize;
        while offset < data.len() {
            match self.stream.write(&data[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        warn!(written = offset, len = data.len(), "socket write stalled");
                        return Err(TransportError::WriteTimeout(self.write_timeout));
                    }
                    std::thread::sleep(WRITE_BACKOFF);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(offset)
    }

    fn read_available(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) if buf.is_empty() => return Err(TransportError::Closed),
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(buf.freeze())
    }

    fn flush_input(&mut self) -> Result<()> {
        let discarded = self.read_available()?.len();
        if discarded > 0 {
            debug!(discarded, "dropped stale input");
        }
        Ok(())
    }
}

impl std::fmt::Debug for UnixSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnixSocketTransport")
            .field("path", &self.path)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_until(link: &mut UnixSocketTransport, want: usize) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut got = Vec::new();
        while got.len() < want && Instant::now() < deadline {
            got.extend_from_slice(&link.read_available().unwrap());
        }
        got
    }

    #[test]
    fn read_available_is_empty_when_idle() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut link = UnixSocketTransport::from_stream(left).unwrap();
        assert!(link.read_available().unwrap().is_empty());
    }

    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut host = UnixSocketTransport::from_stream(left).unwrap();
        let mut device = UnixSocketTransport::from_stream(right).unwrap();

        assert_eq!(host.write(&[0xC0, 0x07, 0x11, 0x80, 0xC0]).unwrap(), 5);
        let got = read_until(&mut device, 5);
        assert_eq!(got, vec![0xC0, 0x07, 0x11, 0x80, 0xC0]);
    }

    #[test]
    fn flush_input_discards_pending_bytes() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut host = UnixSocketTransport::from_stream(left).unwrap();
        let mut device = UnixSocketTransport::from_stream(right).unwrap();

        device.write(b"stale reply").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        host.flush_input().unwrap();
        assert!(host.read_available().unwrap().is_empty());
    }

    #[test]
    fn write_to_stalled_peer_times_out() {
        let (left, _right) = UnixStream::pair().unwrap();
        let mut host = UnixSocketTransport::from_stream(left)
            .unwrap()
            .with_write_timeout(Duration::from_millis(50));

        // Far beyond any socket buffer; the peer never reads.
        let payload = vec![0x5Au8; 4 * 1024 * 1024];
        let started = Instant::now();
        let err = host.write(&payload).unwrap_err();

        assert!(matches!(err, TransportError::WriteTimeout(t) if t == Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn peer_close_reports_closed() {
        let (left, right) = UnixStream::pair().unwrap();
        let mut host = UnixSocketTransport::from_stream(left).unwrap();
        drop(right);

        let err = host.read_available().unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn connect_to_missing_socket_fails() {
        let path = std::env::temp_dir().join(format!("nsslink-missing-{}.sock", std::process::id()));
        let err = UnixSocketTransport::connect(&path).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn connect_records_path() {
        let dir = std::env::temp_dir().join(format!("nsslink-uds-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let sock_path = dir.join("emu.sock");
        let _ = std::fs::remove_file(&sock_path);
        let listener = std::os::unix::net::UnixListener::bind(&sock_path).unwrap();

        let link = UnixSocketTransport::connect(&sock_path).unwrap();
        let _accepted = listener.accept().unwrap();

        assert_eq!(link.path(), Some(sock_path.as_path()));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
