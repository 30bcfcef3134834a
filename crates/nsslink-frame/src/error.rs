use bytes::Bytes;

use crate::codec::command_label;

/// Errors that can occur while turning received bytes into a frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than the fixed header.
    #[error("frame truncated ({len} bytes, need at least {min})")]
    Truncated { len: usize, min: usize },

    /// The trailing CRC does not match the frame contents.
    #[error("checksum mismatch on {len}-byte frame")]
    Checksum { len: usize },
}

/// Reasons a received frame is not an acceptable answer to a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    /// The reply answers a different command.
    #[error("reply command {} does not match request command {}", label(.actual), label(.expected))]
    CommandMismatch { expected: u8, actual: u8 },

    /// The device rejected the request.
    #[error("NACK for command {}: {}", label(.command), hex_preview(.payload))]
    Nack { command: u8, payload: Bytes },

    /// A request arrived where a reply was expected.
    #[error("received request frame for command {} when expecting a reply", label(.command))]
    UnexpectedRequest { command: u8 },
}

pub type Result<T> = std::result::Result<T, FrameError>;

fn label(code: &u8) -> String {
    command_label(*code)
}

fn hex_preview(payload: &[u8]) -> String {
    if payload.is_empty() {
        return "<empty>".to_string();
    }
    hex::encode(payload)
}
