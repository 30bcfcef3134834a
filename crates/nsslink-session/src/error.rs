use std::time::Duration;

use bytes::Bytes;
use nsslink_frame::{command_label, FrameError, ReplyError};

/// Errors that can occur during a transaction.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error. Not retried.
    #[error("transport error: {0}")]
    Transport(#[from] nsslink_transport::TransportError),

    /// A delimited frame too short to carry a header.
    #[error("framing error: {0}")]
    Framing(FrameError),

    /// A frame arrived with a bad CRC.
    #[error("checksum mismatch on {len}-byte frame")]
    Checksum { len: usize },

    /// One attempt saw no complete frame before its deadline.
    #[error("no reply to {} within {timeout:?}", label(.command))]
    NoReply { command: u8, timeout: Duration },

    /// Every attempt failed with a retryable error.
    #[error("transaction {} timed out after {attempts} attempts", label(.command))]
    Timeout { command: u8, attempts: u32 },

    /// The device rejected the command.
    #[error("device NACK for {}: {}", label(.command), hex_preview(.payload))]
    Nack { command: u8, payload: Bytes },

    /// The reply does not answer the request.
    #[error("protocol violation: {0}")]
    ReplyMismatch(ReplyError),

    /// The reply payload could not be decoded.
    #[error("reply decode error: {0}")]
    Icd(#[from] nsslink_icd::IcdError),

    /// Rejected session configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SessionError {
    /// Errors the engine retries with the same request bytes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Framing(_) | SessionError::Checksum { .. } | SessionError::NoReply { .. }
        )
    }

    /// Command code the error refers to, when it carries one.
    pub fn command(&self) -> Option<u8> {
        match self {
            SessionError::NoReply { command, .. }
            | SessionError::Timeout { command, .. }
            | SessionError::Nack { command, .. } => Some(*command),
            SessionError::ReplyMismatch(ReplyError::CommandMismatch { expected, .. }) => {
                Some(*expected)
            }
            SessionError::ReplyMismatch(ReplyError::UnexpectedRequest { command })
            | SessionError::ReplyMismatch(ReplyError::Nack { command, .. }) => Some(*command),
            _ => None,
        }
    }
}

impl From<FrameError> for SessionError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Checksum { len } => SessionError::Checksum { len },
            other => SessionError::Framing(other),
        }
    }
}

impl From<ReplyError> for SessionError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::Nack { command, payload } => SessionError::Nack { command, payload },
            other => SessionError::ReplyMismatch(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

fn label(code: &u8) -> String {
    command_label(*code)
}

fn hex_preview(payload: &[u8]) -> String {
    if payload.is_empty() {
        return "<empty>".to_string();
    }
    hex::encode(payload)
}
