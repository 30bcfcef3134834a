//! Byte transport abstraction for the NSP serial link.
//!
//! The protocol engine only needs three things from a link: write a buffer,
//! drain whatever bytes have arrived, and discard stale input. Concrete
//! transports provided here:
//! - [`SerialPort`]: a tty (RS-485 adapter or UART) opened through `serialport`
//! - [`UnixSocketTransport`]: a software emulator behind a unix socket
//!
//! RS-485 driver/receiver direction control is not handled here.

pub mod error;
pub mod traits;

pub mod serial;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::Transport;

pub use serial::{SerialConfig, SerialPort, DEFAULT_BAUD, DEFAULT_IO_TIMEOUT};
#[cfg(unix)]
pub use uds::UnixSocketTransport;
