use std::fmt;

use nsslink_icd::IcdError;
use nsslink_session::SessionError;
use nsslink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_NACK: i32 = 40;
pub const PROTOCOL_ERROR: i32 = 41;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match err {
        TransportError::UnsupportedBaud(_) => USAGE,
        TransportError::Open { .. }
        | TransportError::Configure { .. }
        | TransportError::Io(_)
        | TransportError::WriteTimeout(_)
        | TransportError::ShortWrite { .. }
        | TransportError::Closed => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn icd_error(context: &str, err: IcdError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    let code = match err {
        SessionError::Transport(inner) => return transport_error(context, inner),
        SessionError::Timeout { .. } | SessionError::NoReply { .. } => TIMEOUT,
        SessionError::Nack { .. } => DEVICE_NACK,
        SessionError::ReplyMismatch(_)
        | SessionError::Framing(_)
        | SessionError::Checksum { .. } => PROTOCOL_ERROR,
        SessionError::Icd(_) => DATA_INVALID,
        SessionError::InvalidConfig(_) => USAGE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use nsslink_frame::ReplyError;

    use super::*;

    #[test]
    fn session_errors_map_to_stable_codes() {
        let cases = [
            (
                SessionError::Timeout {
                    command: 0,
                    attempts: 3,
                },
                TIMEOUT,
            ),
            (
                SessionError::NoReply {
                    command: 0,
                    timeout: Duration::from_millis(10),
                },
                TIMEOUT,
            ),
            (
                SessionError::Nack {
                    command: 8,
                    payload: Bytes::new(),
                },
                DEVICE_NACK,
            ),
            (
                SessionError::ReplyMismatch(ReplyError::UnexpectedRequest { command: 0 }),
                PROTOCOL_ERROR,
            ),
            (SessionError::Checksum { len: 4 }, PROTOCOL_ERROR),
            (SessionError::Icd(IcdError::UnknownBlock(7)), DATA_INVALID),
            (SessionError::InvalidConfig("x".into()), USAGE),
            (SessionError::Transport(TransportError::Closed), TRANSPORT_ERROR),
            (
                SessionError::Transport(TransportError::UnsupportedBaud(1)),
                USAGE,
            ),
            (
                SessionError::Transport(TransportError::WriteTimeout(Duration::from_millis(100))),
                TRANSPORT_ERROR,
            ),
            (
                SessionError::Transport(TransportError::ShortWrite {
                    written: 3,
                    expected: 9,
                }),
                TRANSPORT_ERROR,
            ),
        ];
        for (err, code) in cases {
            let label = err.to_string();
            assert_eq!(session_error("ctx", err).code, code, "{label}");
        }
    }

    #[test]
    fn message_carries_context() {
        let err = session_error(
            "ping failed",
            SessionError::Timeout {
                command: 0,
                attempts: 3,
            },
        );
        assert_eq!(
            err.to_string(),
            "ping failed: transaction PING (0x00) timed out after 3 attempts"
        );
    }
}
