//! NSP frame model: header layout, command codes and reply validation.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, ReplyError, Result};

/// Header: destination (1) + source (1) + control (1) = 3 bytes.
pub const HEADER_LEN: usize = 3;

/// Control bit 7: set on requests (POLL), clear on replies.
pub const REQUEST_BIT: u8 = 0x80;
/// Control bit 6: reserved, ignored by the host.
pub const RESERVED_BIT: u8 = 0x40;
/// Control bit 5: set by the device on an ACK reply.
pub const ACK_BIT: u8 = 0x20;
/// Control bits 4-0: command code.
pub const COMMAND_MASK: u8 = 0x1F;

/// Addresses are 7 bits wide.
pub const ADDR_MASK: u8 = 0x7F;

/// Factory address of the wheel.
pub const DEFAULT_DEVICE_ADDR: u8 = 0x07;
/// Conventional address of the host controller.
pub const DEFAULT_HOST_ADDR: u8 = 0x11;

/// NSP command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Ping = 0x00,
    Peek = 0x02,
    Poke = 0x03,
    AppTelemetry = 0x07,
    AppCommand = 0x08,
    ClearFault = 0x09,
    ConfigProtection = 0x0A,
    TripLcl = 0x0B,
}

impl Command {
    /// All commands, in code order.
    pub const ALL: [Command; 8] = [
        Command::Ping,
        Command::Peek,
        Command::Poke,
        Command::AppTelemetry,
        Command::AppCommand,
        Command::ClearFault,
        Command::ConfigProtection,
        Command::TripLcl,
    ];

    /// Wire code (low 5 bits of the control byte).
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// ICD name of the command.
    pub const fn name(self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Peek => "PEEK",
            Command::Poke => "POKE",
            Command::AppTelemetry => "APP-TM",
            Command::AppCommand => "APP-CMD",
            Command::ClearFault => "CLEAR-FAULT",
            Command::ConfigProtection => "CONFIG-PROT",
            Command::TripLcl => "TRIP-LCL",
        }
    }

    /// Look a command up by ICD name, case-insensitively. `_` matches `-`.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(&wanted))
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.code() == code)
            .ok_or(code)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render a raw command code as its ICD name when known.
pub fn command_label(code: u8) -> String {
    match Command::try_from(code) {
        Ok(cmd) => format!("{cmd} (0x{code:02X})"),
        Err(_) => format!("0x{code:02X}"),
    }
}

/// One NSP frame: header plus payload, without CRC or SLIP stuffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Destination address (0-127).
    pub dest_addr: u8,
    /// Source address (0-127).
    pub src_addr: u8,
    /// `[REQUEST|reserved|ACK|command4..0]`
    pub control: u8,
    /// Command-specific payload.
    pub payload: Bytes,
}

impl Frame {
    /// Build a request: request bit set, ACK clear.
    pub fn request(command: Command, payload: impl Into<Bytes>, dest_addr: u8, src_addr: u8) -> Self {
        Self::from_parts(
            dest_addr,
            src_addr,
            REQUEST_BIT | (command.code() & COMMAND_MASK),
            payload.into(),
        )
    }

    /// Build a reply: request bit clear, ACK set per `ack`.
    pub fn reply(
        command: Command,
        payload: impl Into<Bytes>,
        ack: bool,
        dest_addr: u8,
        src_addr: u8,
    ) -> Self {
        let mut control = command.code() & COMMAND_MASK;
        if ack {
            control |= ACK_BIT;
        }
        Self::from_parts(dest_addr, src_addr, control, payload.into())
    }

    fn from_parts(dest_addr: u8, src_addr: u8, control: u8, payload: Bytes) -> Self {
        debug_assert!(dest_addr <= ADDR_MASK, "destination address out of range");
        debug_assert!(src_addr <= ADDR_MASK, "source address out of range");
        Self {
            dest_addr: dest_addr & ADDR_MASK,
            src_addr: src_addr & ADDR_MASK,
            control,
            payload,
        }
    }

    /// True when the request (POLL) bit is set.
    pub fn is_request(&self) -> bool {
        self.control & REQUEST_BIT != 0
    }

    /// True when the ACK bit is set.
    pub fn is_ack(&self) -> bool {
        self.control & ACK_BIT != 0
    }

    /// A reply with the ACK bit clear.
    pub fn is_nack(&self) -> bool {
        !self.is_request() && !self.is_ack()
    }

    /// Raw 5-bit command code.
    pub fn command_code(&self) -> u8 {
        self.control & COMMAND_MASK
    }

    /// Typed command, or `None` for codes the ICD does not define.
    pub fn command(&self) -> Option<Command> {
        Command::try_from(self.command_code()).ok()
    }

    /// Header plus payload length.
    pub fn wire_size(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Serialize into `dst`.
    ///
    /// Wire format:
    /// ```text
    /// ┌──────────┬──────────┬─────────────────────┬─────────────┐
    /// │ Dest (1) │ Src (1)  │ Control (1)         │ Payload     │
    /// │ 0..127   │ 0..127   │ REQ|rsv|ACK|cmd4..0 │ (var)       │
    /// └──────────┴──────────┴─────────────────────┴─────────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        dst.put_u8(self.dest_addr);
        dst.put_u8(self.src_addr);
        dst.put_u8(self.control);
        dst.put_slice(&self.payload);
    }

    /// Serialize into a new buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut dst);
        dst.freeze()
    }

    /// Parse header and payload from an unstuffed, CRC-stripped frame.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(FrameError::Truncated {
                len: data.len(),
                min: HEADER_LEN,
            });
        }
        Ok(Self {
            dest_addr: data[0],
            src_addr: data[1],
            control: data[2],
            payload: Bytes::copy_from_slice(&data[HEADER_LEN..]),
        })
    }
}

/// Check that `reply` is an acceptable answer to `request`.
///
/// Replies are matched by command code only; there is no transaction id.
pub fn validate_reply(request: &Frame, reply: &Frame) -> std::result::Result<(), ReplyError> {
    if reply.command_code() != request.command_code() {
        return Err(ReplyError::CommandMismatch {
            expected: request.command_code(),
            actual: reply.command_code(),
        });
    }

    if reply.is_nack() {
        return Err(ReplyError::Nack {
            command: reply.command_code(),
            payload: reply.payload.clone(),
        });
    }

    if reply.is_request() {
        return Err(ReplyError::UnexpectedRequest {
            command: reply.command_code(),
        });
    }

    Ok(())
}
