use std::fmt;

use serde::Serialize;

use crate::error::{IcdError, Result};

/// Identity reported in a PING reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_type: u8,
    pub serial: u8,
    pub version_major: u8,
    pub version_minor: u8,
    pub version_patch: u8,
}

impl DeviceInfo {
    /// Minimum PING reply payload length.
    pub const LEN: usize = 5;

    /// Parse a PING reply payload. Bytes past the first five are ignored.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        match *payload {
            [device_type, serial, version_major, version_minor, version_patch, ..] => Ok(Self {
                device_type,
                serial,
                version_major,
                version_minor,
                version_patch,
            }),
            _ => Err(IcdError::Truncated {
                what: "PING reply",
                expected: Self::LEN,
                actual: payload.len(),
            }),
        }
    }

    /// `major.minor.patch`
    pub fn version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.version_major, self.version_minor, self.version_patch
        )
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type 0x{:02X} serial {} firmware {}",
            self.device_type,
            self.serial,
            self.version()
        )
    }
}
