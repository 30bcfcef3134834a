//! 16-bit frame checksum.
//!
//! The device appends a CRC-16 to every frame, least-significant byte first.
//! The polynomial and register setup are a property of the firmware, so the
//! algorithm is a [`Checksum`] strategy; [`Crc16::CCITT_FALSE`] is what the
//! wheel ships with.

use bytes::{BufMut, Bytes, BytesMut};

/// Width of the trailing checksum in bytes.
pub const CHECKSUM_LEN: usize = 2;

/// A 16-bit checksum appended to and verified on every frame.
pub trait Checksum {
    /// Compute the checksum of `data`.
    fn checksum(&self, data: &[u8]) -> u16;

    /// Copy `data` into `dst` followed by its checksum (LSB first).
    fn append(&self, data: &[u8], dst: &mut BytesMut) {
        dst.reserve(data.len() + CHECKSUM_LEN);
        dst.put_slice(data);
        dst.put_u16_le(self.checksum(data));
    }

    /// Return `data` with its checksum appended.
    fn with_checksum(&self, data: &[u8]) -> Bytes {
        let mut dst = BytesMut::with_capacity(data.len() + CHECKSUM_LEN);
        self.append(data, &mut dst);
        dst.freeze()
    }

    /// Check the trailing checksum of `data`.
    ///
    /// Returns `false` for inputs shorter than [`CHECKSUM_LEN`].
    fn verify(&self, data: &[u8]) -> bool {
        if data.len() < CHECKSUM_LEN {
            return false;
        }
        let (body, tail) = data.split_at(data.len() - CHECKSUM_LEN);
        u16::from_le_bytes([tail[0], tail[1]]) == self.checksum(body)
    }

    /// Slice off the trailing checksum. Inputs shorter than the checksum
    /// yield an empty slice.
    fn strip<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[..data.len().saturating_sub(CHECKSUM_LEN)]
    }
}

impl<F> Checksum for F
where
    F: Fn(&[u8]) -> u16,
{
    fn checksum(&self, data: &[u8]) -> u16 {
        self(data)
    }
}

/// Bitwise CRC-16 with Rocksoft-model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    pub poly: u16,
    pub init: u16,
    pub reflect_in: bool,
    pub reflect_out: bool,
    pub xor_out: u16,
}

impl Crc16 {
    /// CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF. Used by the wheel.
    pub const CCITT_FALSE: Self = Self::new(0x1021, 0xFFFF, false, false, 0x0000);
    /// CRC-16/XMODEM: poly 0x1021, init 0x0000.
    pub const XMODEM: Self = Self::new(0x1021, 0x0000, false, false, 0x0000);
    /// CRC-16/KERMIT: reflected poly 0x1021, init 0x0000.
    pub const KERMIT: Self = Self::new(0x1021, 0x0000, true, true, 0x0000);
    /// CRC-16/X-25: reflected poly 0x1021, init 0xFFFF, inverted output.
    pub const X25: Self = Self::new(0x1021, 0xFFFF, true, true, 0xFFFF);

    pub const fn new(poly: u16, init: u16, reflect_in: bool, reflect_out: bool, xor_out: u16) -> Self {
        Self {
            poly,
            init,
            reflect_in,
            reflect_out,
            xor_out,
        }
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::CCITT_FALSE
    }
}

impl Checksum for Crc16 {
    fn checksum(&self, data: &[u8]) -> u16 {
        let mut crc = self.init;
        for &byte in data {
            let byte = if self.reflect_in { byte.reverse_bits() } else { byte };
            crc ^= u16::from(byte) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ self.poly
                } else {
                    crc << 1
                };
            }
        }
        if self.reflect_out {
            crc = crc.reverse_bits();
        }
        crc ^ self.xor_out
    }
}
