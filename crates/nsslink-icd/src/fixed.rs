//! Q-format fixed-point codec.
//!
//! A format is described by its integer and fraction bit counts. The raw
//! value lives in the smallest of an 8, 16 or 32-bit container that holds
//! `integer_bits + fraction_bits`; signed formats use the container's top
//! bit as the two's-complement sign. Encoding saturates at the format
//! boundary, decoding accepts any bit pattern.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{IcdError, Result};

/// Fixed-point format descriptor (`Qm.n` signed, `UQm.n` unsigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QFormat {
    pub signed: bool,
    pub integer_bits: u8,
    pub fraction_bits: u8,
}

impl QFormat {
    /// Wheel supply voltages.
    pub const UQ8_8: Self = Self::unsigned(8, 8);
    /// Rail voltages and currents.
    pub const UQ16_16: Self = Self::unsigned(16, 16);
    /// Overspeed thresholds in RPM.
    pub const UQ24_8: Self = Self::unsigned(24, 8);
    pub const UQ14_18: Self = Self::unsigned(14, 18);
    pub const UQ18_14: Self = Self::unsigned(18, 14);
    /// Uptime in seconds.
    pub const UQ30_2: Self = Self::unsigned(30, 2);
    /// Current (mA) and speed (RPM) setpoints.
    pub const Q14_18: Self = Self::signed(14, 18);
    /// Torque setpoint (mN·m).
    pub const Q10_22: Self = Self::signed(10, 22);
    /// Measured speed (RPM).
    pub const Q24_8: Self = Self::signed(24, 8);
    /// Measured current (mA).
    pub const Q20_12: Self = Self::signed(20, 12);
    /// Current target (mA).
    pub const Q14_2: Self = Self::signed(14, 2);
    pub const Q15_16: Self = Self::signed(15, 16);
    pub const Q7_8: Self = Self::signed(7, 8);

    pub const fn signed(integer_bits: u8, fraction_bits: u8) -> Self {
        Self {
            signed: true,
            integer_bits,
            fraction_bits,
        }
    }

    pub const fn unsigned(integer_bits: u8, fraction_bits: u8) -> Self {
        Self {
            signed: false,
            integer_bits,
            fraction_bits,
        }
    }

    /// Container width in bits: 8, 16 or 32.
    pub const fn width_bits(self) -> u32 {
        let used = self.integer_bits as u32 + self.fraction_bits as u32;
        if used <= 8 {
            8
        } else if used <= 16 {
            16
        } else {
            32
        }
    }

    /// Container width in bytes.
    pub const fn width_bytes(self) -> usize {
        (self.width_bits() / 8) as usize
    }

    /// `2^fraction_bits`.
    pub fn scale(self) -> f64 {
        2f64.powi(i32::from(self.fraction_bits))
    }

    /// Value of one least-significant bit.
    pub fn resolution(self) -> f64 {
        1.0 / self.scale()
    }

    /// Smallest representable value.
    pub fn min(self) -> f64 {
        if self.signed {
            -((1u64 << (self.width_bits() - 1)) as f64) / self.scale()
        } else {
            0.0
        }
    }

    /// Largest representable value.
    pub fn max(self) -> f64 {
        let top = if self.signed {
            (1u64 << (self.width_bits() - 1)) - 1
        } else {
            self.mask() as u64
        };
        top as f64 / self.scale()
    }

    /// True when `value` encodes without saturating.
    pub fn check(self, value: f64) -> bool {
        value >= self.min() && value <= self.max()
    }

    /// Encode `value`, saturating at the format boundary.
    ///
    /// The result is the container's bit pattern; negative values are in
    /// two's complement within the container width. NaN encodes as zero.
    pub fn encode(self, value: f64) -> u32 {
        if value.is_nan() {
            debug!(format = %self, "NaN encoded as zero");
            return 0;
        }
        let clamped = value.clamp(self.min(), self.max());
        if clamped != value {
            debug!(format = %self, value, clamped, "fixed-point value saturated");
        }
        let scaled = (clamped * self.scale()).trunc() as i64;
        (scaled as u64 & u64::from(self.mask())) as u32
    }

    /// Encode `value`, failing instead of saturating.
    pub fn encode_checked(self, value: f64) -> Result<u32> {
        if !self.check(value) {
            return Err(IcdError::OutOfRange {
                value,
                min: self.min(),
                max: self.max(),
            });
        }
        Ok(self.encode(value))
    }

    /// Decode a raw container value. Bits above the width are ignored.
    pub fn decode(self, raw: u32) -> f64 {
        let raw = raw & self.mask();
        let width = self.width_bits();
        let value = if self.signed && raw & (1u32 << (width - 1)) != 0 {
            i64::from(raw) - (1i64 << width)
        } else {
            i64::from(raw)
        };
        value as f64 / self.scale()
    }

    /// Decode the little-endian container at the start of `bytes`.
    pub fn decode_le(self, bytes: &[u8]) -> Result<f64> {
        let width = self.width_bytes();
        let raw = bytes.get(..width).ok_or(IcdError::Truncated {
            what: "fixed-point field",
            expected: width,
            actual: bytes.len(),
        })?;
        let raw = raw
            .iter()
            .rev()
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
        Ok(self.decode(raw))
    }

    fn mask(self) -> u32 {
        match self.width_bits() {
            32 => u32::MAX,
            bits => (1u32 << bits) - 1,
        }
    }
}

impl fmt::Display for QFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.signed { "Q" } else { "UQ" };
        write!(f, "{prefix}{}.{}", self.integer_bits, self.fraction_bits)
    }
}
