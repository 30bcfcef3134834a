//! Wire layer of the NSP (Network Serial Protocol) link.
//!
//! A frame on the wire is built in three steps:
//! - a 3-byte header (destination, source, control) followed by the payload
//! - a 2-byte CRC appended least-significant byte first
//! - SLIP byte stuffing between two `0xC0` delimiters
//!
//! [`PacketCodec`] composes the three; the pieces are usable on their own.

pub mod codec;
pub mod crc;
pub mod error;
pub mod packet;
pub mod slip;

pub use codec::{
    command_label, validate_reply, Command, Frame, ACK_BIT, ADDR_MASK, COMMAND_MASK, DEFAULT_DEVICE_ADDR,
    DEFAULT_HOST_ADDR, HEADER_LEN, REQUEST_BIT, RESERVED_BIT,
};
pub use crc::{Checksum, Crc16, CHECKSUM_LEN};
pub use error::{FrameError, ReplyError, Result};
pub use packet::PacketCodec;
pub use slip::{SlipDecoder, DEFAULT_MAX_FRAME_LEN};
