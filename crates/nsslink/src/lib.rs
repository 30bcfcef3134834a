//! Host-side driver for NSP reaction wheels.
//!
//! The wheel speaks NSP frames, CRC-16 protected and SLIP delimited, over a
//! half-duplex serial link. This crate re-exports the layers:
//!
//! - [`transport`]: byte transports (serial tty, emulator socket)
//! - [`frame`]: SLIP, CRC-16 and the NSP frame model
//! - [`icd`]: fixed-point codec, register map and telemetry layouts
//! - [`session`]: request/reply engine and command API (behind `session`)

/// Re-export transport types.
pub mod transport {
    pub use nsslink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use nsslink_frame::*;
}

/// Re-export ICD types.
pub mod icd {
    pub use nsslink_icd::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use nsslink_session::*;
}
