//! Frame to wire bytes and back: header and payload, CRC, then SLIP.

use bytes::{Bytes, BytesMut};

use crate::codec::Frame;
use crate::crc::{Checksum, Crc16, CHECKSUM_LEN};
use crate::error::{FrameError, Result};
use crate::slip;

/// Combines the frame layout with a checksum strategy.
///
/// SLIP decoding is left to [`SlipDecoder`](crate::SlipDecoder) because the
/// link delivers bytes in arbitrary chunks; `decode` takes one already
/// unstuffed frame.
#[derive(Debug, Clone, Default)]
pub struct PacketCodec<C: Checksum = Crc16> {
    checksum: C,
}

impl PacketCodec<Crc16> {
    /// Codec using CRC-16/CCITT-FALSE.
    pub fn new() -> Self {
        Self {
            checksum: Crc16::CCITT_FALSE,
        }
    }
}

impl<C: Checksum> PacketCodec<C> {
    /// Codec using a custom checksum.
    pub fn with_checksum(checksum: C) -> Self {
        Self { checksum }
    }

    /// The checksum strategy in use.
    pub fn checksum(&self) -> &C {
        &self.checksum
    }

    /// Append the SLIP-framed wire form of `frame` to `dst`.
    pub fn encode(&self, frame: &Frame, dst: &mut BytesMut) {
        let mut body = BytesMut::with_capacity(frame.wire_size() + CHECKSUM_LEN);
        frame.encode(&mut body);
        let crc = self.checksum.checksum(&body);
        body.extend_from_slice(&crc.to_le_bytes());
        slip::encode_into(&body, dst);
    }

    /// Wire form of `frame` in a new buffer.
    pub fn encode_frame(&self, frame: &Frame) -> Bytes {
        let mut dst = BytesMut::with_capacity(2 * (frame.wire_size() + CHECKSUM_LEN) + 2);
        self.encode(frame, &mut dst);
        dst.freeze()
    }

    /// Verify and parse one unstuffed frame (header, payload and CRC).
    pub fn decode(&self, data: &[u8]) -> Result<Frame> {
        if !self.checksum.verify(data) {
            return Err(FrameError::Checksum { len: data.len() });
        }
        Frame::from_bytes(self.checksum.strip(data))
    }
}
