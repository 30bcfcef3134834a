//! Command-level API on top of [`Session::transact`].

use bytes::{BufMut, Bytes, BytesMut};
use nsslink_frame::{Checksum, Command};
use nsslink_icd::{memory, ControlMode, DeviceInfo, IcdError, Telemetry, TelemetryBlock};
use nsslink_transport::Transport;
use tracing::{info, warn};

use crate::engine::Session;
use crate::error::Result;

impl<T: Transport, C: Checksum> Session<T, C> {
    /// Exchange one raw request and return the reply payload.
    pub fn request(&mut self, command: Command, payload: impl Into<Bytes>) -> Result<Bytes> {
        let frame = self.request_frame(command, payload);
        Ok(self.transact(&frame)?.payload)
    }

    /// PING the wheel and decode its identity.
    pub fn ping(&mut self) -> Result<DeviceInfo> {
        let payload = self.request(Command::Ping, Bytes::new())?;
        let device = DeviceInfo::decode(&payload)?;
        info!(%device, "PING");
        Ok(device)
    }

    /// Read the 32-bit word at `addr`.
    pub fn peek(&mut self, addr: u8) -> Result<u32> {
        let payload = self.request(Command::Peek, vec![addr])?;
        let value = match *payload {
            [b0, b1, b2, b3, ..] => u32::from_le_bytes([b0, b1, b2, b3]),
            _ => {
                return Err(IcdError::Truncated {
                    what: "PEEK reply",
                    expected: 4,
                    actual: payload.len(),
                }
                .into())
            }
        };
        info!(
            addr = format_args!("0x{addr:02X}"),
            name = memory::name(addr).unwrap_or("-"),
            value = format_args!("0x{value:08X}"),
            "PEEK"
        );
        Ok(value)
    }

    /// Write the 32-bit word at `addr`.
    pub fn poke(&mut self, addr: u8, value: u32) -> Result<()> {
        let mut payload = BytesMut::with_capacity(5);
        payload.put_u8(addr);
        payload.put_u32_le(value);
        self.request(Command::Poke, payload.freeze())?;
        info!(
            addr = format_args!("0x{addr:02X}"),
            value = format_args!("0x{value:08X}"),
            "POKE"
        );
        Ok(())
    }

    /// Fetch a telemetry block without decoding it.
    pub fn app_telemetry_raw(&mut self, block: TelemetryBlock) -> Result<Bytes> {
        self.request(Command::AppTelemetry, vec![block.id()])
    }

    /// Fetch and decode a telemetry block.
    pub fn app_telemetry(&mut self, block: TelemetryBlock) -> Result<Telemetry> {
        let payload = self.app_telemetry_raw(block)?;
        let record = Telemetry::decode(block, &payload)?;
        info!(%block, len = payload.len(), "APP-TM");
        Ok(record)
    }

    /// Switch control mode and setpoint.
    ///
    /// Setpoints outside the mode's range are clamped and the command is
    /// still sent. IDLE always sends zero.
    pub fn app_command(&mut self, mode: ControlMode, setpoint: f64) -> Result<()> {
        let (raw, clamped) = mode.encode_setpoint(setpoint);
        if clamped {
            warn!(%mode, setpoint, raw, "setpoint clamped to representable range");
        }
        let mut payload = BytesMut::with_capacity(5);
        payload.put_u8(mode.code());
        payload.put_i32_le(raw);
        self.request(Command::AppCommand, payload.freeze())?;
        info!(%mode, setpoint, unit = mode.setpoint_unit(), "APP-CMD");
        Ok(())
    }

    /// Clear latched faults selected by `mask`.
    pub fn clear_fault(&mut self, mask: u32) -> Result<()> {
        self.request(Command::ClearFault, mask.to_le_bytes().to_vec())?;
        info!(mask = format_args!("0x{mask:08X}"), "CLEAR-FAULT");
        Ok(())
    }

    /// Set the protection disable bits (a set bit disables that protection).
    pub fn config_protection(&mut self, bits: u32) -> Result<()> {
        self.request(Command::ConfigProtection, bits.to_le_bytes().to_vec())?;
        info!(bits = format_args!("0x{bits:08X}"), "CONFIG-PROT");
        Ok(())
    }
}
