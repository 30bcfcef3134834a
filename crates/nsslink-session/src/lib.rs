//! Transaction engine and command API for NSP reaction wheels.
//!
//! A [`Session`] owns a [`Transport`](nsslink_transport::Transport), sends
//! one request at a time and waits for the matching reply, retrying
//! checksum, framing and timeout failures a bounded number of times.
//!
//! ```no_run
//! use nsslink_icd::{ControlMode, TelemetryBlock};
//! use nsslink_session::{Session, SessionConfig};
//! use nsslink_transport::{SerialConfig, SerialPort};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let port = SerialPort::open(&SerialConfig::default())?;
//! let mut wheel = Session::open(port, SessionConfig::default())?;
//! println!("{}", wheel.ping()?);
//! wheel.app_command(ControlMode::Speed, 1000.0)?;
//! let tm = wheel.app_telemetry(TelemetryBlock::Standard)?;
//! println!("{tm:?}");
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod stats;

#[cfg(test)]
mod mock;

pub use config::{SessionConfig, DEFAULT_POLL_INTERVAL, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
pub use engine::{Session, TransactionState};
pub use error::{Result, SessionError};
pub use stats::SessionStats;
