use bytes::Bytes;

use crate::error::Result;

/// A half-duplex byte link to the device.
///
/// Implementations never block waiting for input: `read_available` returns
/// whatever has arrived so far, which may be empty. The engine owns timing.
pub trait Transport {
    /// Write `data` to the link, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Drain all bytes received since the last call. Empty when idle.
    fn read_available(&mut self) -> Result<Bytes>;

    /// Discard any bytes already buffered on the receive side.
    fn flush_input(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read_available(&mut self) -> Result<Bytes> {
        (**self).read_available()
    }

    fn flush_input(&mut self) -> Result<()> {
        (**self).flush_input()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read_available(&mut self) -> Result<Bytes> {
        (**self).read_available()
    }

    fn flush_input(&mut self) -> Result<()> {
        (**self).flush_input()
    }
}
