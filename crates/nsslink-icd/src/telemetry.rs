//! APP-TM telemetry block layouts.
//!
//! Every block is a fixed little-endian structure. Each block has a static
//! field table used for generic display ([`decode_fields`]) and a typed
//! record ([`Telemetry`]) for programmatic use. A reply shorter than the
//! block length fails as a whole; trailing bytes are ignored.

use std::fmt;

use serde::Serialize;

use crate::error::{IcdError, Result};
use crate::fixed::QFormat;
use crate::registers::{fault, flag_names, status, ControlMode};
use crate::setpoint::{project_setpoint, SetpointValue};

/// Telemetry block identifiers with a known layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TelemetryBlock {
    Standard = 0x00,
    Temp = 0x01,
    Volt = 0x02,
    Curr = 0x03,
    DiagGeneral = 0x04,
}

impl TelemetryBlock {
    pub const ALL: [TelemetryBlock; 5] = [
        TelemetryBlock::Standard,
        TelemetryBlock::Temp,
        TelemetryBlock::Volt,
        TelemetryBlock::Curr,
        TelemetryBlock::DiagGeneral,
    ];

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            TelemetryBlock::Standard => "STANDARD",
            TelemetryBlock::Temp => "TEMP",
            TelemetryBlock::Volt => "VOLT",
            TelemetryBlock::Curr => "CURR",
            TelemetryBlock::DiagGeneral => "DIAG-GENERAL",
        }
    }

    /// Look a block up by name (case-insensitive, `_` matches `-`) or id.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let wanted = text.replace('_', "-");
        if let Some(block) = Self::ALL
            .into_iter()
            .find(|block| block.name().eq_ignore_ascii_case(&wanted))
        {
            return Some(block);
        }
        let id = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16).ok()?,
            None => text.parse().ok()?,
        };
        Self::try_from(id).ok()
    }

    /// Reply length in bytes.
    pub const fn len(self) -> usize {
        match self {
            TelemetryBlock::Standard => 25,
            TelemetryBlock::Temp => 8,
            TelemetryBlock::Volt => 24,
            TelemetryBlock::Curr => 24,
            TelemetryBlock::DiagGeneral => 20,
        }
    }

    pub const fn fields(self) -> &'static [FieldDef] {
        match self {
            TelemetryBlock::Standard => STANDARD_FIELDS,
            TelemetryBlock::Temp => TEMP_FIELDS,
            TelemetryBlock::Volt => VOLT_FIELDS,
            TelemetryBlock::Curr => CURR_FIELDS,
            TelemetryBlock::DiagGeneral => DIAG_GENERAL_FIELDS,
        }
    }

    fn check_len(self, bytes: &[u8]) -> Result<()> {
        if bytes.len() < self.len() {
            return Err(IcdError::BlockLength {
                block: self.name(),
                expected: self.len(),
                actual: bytes.len(),
            });
        }
        Ok(())
    }
}

impl TryFrom<u8> for TelemetryBlock {
    type Error = IcdError;

    fn try_from(id: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|block| block.id() == id)
            .ok_or(IcdError::UnknownBlock(id))
    }
}

impl fmt::Display for TelemetryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage type of a telemetry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    I16,
    I32,
    Fixed(QFormat),
}

impl FieldKind {
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 => 4,
            FieldKind::Fixed(format) => format.width_bytes(),
        }
    }
}

/// One entry of a block layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
    pub unit: &'static str,
}

impl FieldDef {
    const fn new(name: &'static str, offset: usize, kind: FieldKind, unit: &'static str) -> Self {
        Self {
            name,
            offset,
            kind,
            unit,
        }
    }

    /// Read this field out of a block buffer.
    pub fn read(&self, bytes: &[u8]) -> Result<FieldValue> {
        let width = self.kind.width();
        let end = self.offset + width;
        if bytes.len() < end {
            return Err(IcdError::Truncated {
                what: self.name,
                expected: end,
                actual: bytes.len(),
            });
        }
        let raw = le(bytes, self.offset, width);
        let value = match self.kind {
            FieldKind::U8 | FieldKind::U16 | FieldKind::U32 => FieldValue::Unsigned(raw),
            FieldKind::I16 => FieldValue::Signed(i32::from(raw as u16 as i16)),
            FieldKind::I32 => FieldValue::Signed(raw as i32),
            FieldKind::Fixed(format) => FieldValue::Real(format.decode(raw)),
        };
        Ok(value)
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Unsigned(u32),
    Signed(i32),
    Real(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{v}"),
            FieldValue::Signed(v) => write!(f, "{v}"),
            FieldValue::Real(v) => write!(f, "{v:.3}"),
        }
    }
}

/// A field with its decoded value, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    pub name: &'static str,
    pub value: FieldValue,
    pub unit: &'static str,
}

const STANDARD_FIELDS: &[FieldDef] = &[
    FieldDef::new("status", 0, FieldKind::U32, ""),
    FieldDef::new("fault", 4, FieldKind::U32, ""),
    FieldDef::new("control_mode", 8, FieldKind::U8, ""),
    FieldDef::new("setpoint", 9, FieldKind::I32, "raw"),
    FieldDef::new("duty_cycle", 13, FieldKind::I16, ""),
    FieldDef::new("current_target", 15, FieldKind::Fixed(QFormat::Q14_2), "mA"),
    FieldDef::new("current", 17, FieldKind::Fixed(QFormat::Q20_12), "mA"),
    FieldDef::new("speed", 21, FieldKind::Fixed(QFormat::Q24_8), "RPM"),
];

const TEMP_FIELDS: &[FieldDef] = &[
    FieldDef::new("dcdc", 0, FieldKind::U16, "adc"),
    FieldDef::new("enclosure", 2, FieldKind::U16, "adc"),
    FieldDef::new("driver", 4, FieldKind::U16, "adc"),
    FieldDef::new("motor", 6, FieldKind::U16, "adc"),
];

const VOLT_FIELDS: &[FieldDef] = &[
    FieldDef::new("1v5", 0, FieldKind::Fixed(QFormat::UQ16_16), "V"),
    FieldDef::new("3v3", 4, FieldKind::Fixed(QFormat::UQ16_16), "V"),
    FieldDef::new("5v", 8, FieldKind::Fixed(QFormat::UQ16_16), "V"),
    FieldDef::new("12v", 12, FieldKind::Fixed(QFormat::UQ16_16), "V"),
    FieldDef::new("30v", 16, FieldKind::Fixed(QFormat::UQ16_16), "V"),
    FieldDef::new("2v5", 20, FieldKind::Fixed(QFormat::UQ16_16), "V"),
];

const CURR_FIELDS: &[FieldDef] = &[
    FieldDef::new("1v5", 0, FieldKind::Fixed(QFormat::UQ16_16), "mA"),
    FieldDef::new("3v3", 4, FieldKind::Fixed(QFormat::UQ16_16), "mA"),
    FieldDef::new("5v_analog", 8, FieldKind::Fixed(QFormat::UQ16_16), "mA"),
    FieldDef::new("5v_digital", 12, FieldKind::Fixed(QFormat::UQ16_16), "mA"),
    FieldDef::new("12v", 16, FieldKind::Fixed(QFormat::UQ16_16), "mA"),
    FieldDef::new("30v", 20, FieldKind::Fixed(QFormat::UQ16_16), "A"),
];

const DIAG_GENERAL_FIELDS: &[FieldDef] = &[
    FieldDef::new("uptime", 0, FieldKind::Fixed(QFormat::UQ30_2), "s"),
    FieldDef::new("rev_count", 4, FieldKind::U32, ""),
    FieldDef::new("hall_bad_trans_count", 8, FieldKind::U32, ""),
    FieldDef::new("drive_fault_count", 12, FieldKind::U32, ""),
    FieldDef::new("over_temp_count", 16, FieldKind::U32, ""),
];

/// Decode every field of `block` from its table.
pub fn decode_fields(block: TelemetryBlock, bytes: &[u8]) -> Result<Vec<DecodedField>> {
    block.check_len(bytes)?;
    block
        .fields()
        .iter()
        .map(|field| {
            Ok(DecodedField {
                name: field.name,
                value: field.read(bytes)?,
                unit: field.unit,
            })
        })
        .collect()
}

/// STANDARD block: status, faults and the control loop state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StandardTelemetry {
    pub status: u32,
    pub fault: u32,
    pub control_mode: u8,
    /// Raw setpoint; see [`StandardTelemetry::setpoint_value`].
    pub setpoint: i32,
    pub duty_cycle: i16,
    pub current_target_ma: f64,
    pub current_ma: f64,
    pub speed_rpm: f64,
}

impl StandardTelemetry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        TelemetryBlock::Standard.check_len(bytes)?;
        Ok(Self {
            status: le(bytes, 0, 4),
            fault: le(bytes, 4, 4),
            control_mode: bytes[8],
            setpoint: le(bytes, 9, 4) as i32,
            duty_cycle: le(bytes, 13, 2) as u16 as i16,
            current_target_ma: QFormat::Q14_2.decode(le(bytes, 15, 2)),
            current_ma: QFormat::Q20_12.decode(le(bytes, 17, 4)),
            speed_rpm: QFormat::Q24_8.decode(le(bytes, 21, 4)),
        })
    }

    /// Typed control mode, if the code is defined.
    pub fn mode(&self) -> Result<ControlMode> {
        ControlMode::try_from(self.control_mode)
    }

    /// Setpoint in engineering units for the reported control mode.
    pub fn setpoint_value(&self) -> SetpointValue {
        project_setpoint(self.control_mode, self.setpoint)
    }

    pub fn fault_names(&self) -> Vec<&'static str> {
        flag_names(self.fault, fault::ALL)
    }

    pub fn status_names(&self) -> Vec<&'static str> {
        flag_names(self.status, status::ALL)
    }
}

/// TEMP block: raw ADC counts of the four temperature sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TempTelemetry {
    pub dcdc: u16,
    pub enclosure: u16,
    pub driver: u16,
    pub motor: u16,
}

impl TempTelemetry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        TelemetryBlock::Temp.check_len(bytes)?;
        Ok(Self {
            dcdc: le(bytes, 0, 2) as u16,
            enclosure: le(bytes, 2, 2) as u16,
            driver: le(bytes, 4, 2) as u16,
            motor: le(bytes, 6, 2) as u16,
        })
    }
}

/// VOLT block: rail voltages in volts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoltTelemetry {
    pub v1v5: f64,
    pub v3v3: f64,
    pub v5: f64,
    pub v12: f64,
    pub v30: f64,
    pub v2v5: f64,
}

impl VoltTelemetry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        TelemetryBlock::Volt.check_len(bytes)?;
        let rail = |offset| QFormat::UQ16_16.decode(le(bytes, offset, 4));
        Ok(Self {
            v1v5: rail(0),
            v3v3: rail(4),
            v5: rail(8),
            v12: rail(12),
            v30: rail(16),
            v2v5: rail(20),
        })
    }
}

/// CURR block: rail currents. The 30 V rail is reported in amps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrTelemetry {
    pub i1v5_ma: f64,
    pub i3v3_ma: f64,
    pub i5v_analog_ma: f64,
    pub i5v_digital_ma: f64,
    pub i12v_ma: f64,
    pub i30v_a: f64,
}

impl CurrTelemetry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        TelemetryBlock::Curr.check_len(bytes)?;
        let rail = |offset| QFormat::UQ16_16.decode(le(bytes, offset, 4));
        Ok(Self {
            i1v5_ma: rail(0),
            i3v3_ma: rail(4),
            i5v_analog_ma: rail(8),
            i5v_digital_ma: rail(12),
            i12v_ma: rail(16),
            i30v_a: rail(20),
        })
    }
}

/// DIAG-GENERAL block: uptime and event counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagGeneralTelemetry {
    pub uptime_s: f64,
    pub rev_count: u32,
    pub hall_bad_trans_count: u32,
    pub drive_fault_count: u32,
    pub over_temp_count: u32,
}

impl DiagGeneralTelemetry {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        TelemetryBlock::DiagGeneral.check_len(bytes)?;
        Ok(Self {
            uptime_s: QFormat::UQ30_2.decode(le(bytes, 0, 4)),
            rev_count: le(bytes, 4, 4),
            hall_bad_trans_count: le(bytes, 8, 4),
            drive_fault_count: le(bytes, 12, 4),
            over_temp_count: le(bytes, 16, 4),
        })
    }
}

/// A decoded telemetry block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "block", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Telemetry {
    Standard(StandardTelemetry),
    Temp(TempTelemetry),
    Volt(VoltTelemetry),
    Curr(CurrTelemetry),
    DiagGeneral(DiagGeneralTelemetry),
}

impl Telemetry {
    pub fn decode(block: TelemetryBlock, bytes: &[u8]) -> Result<Self> {
        let record = match block {
            TelemetryBlock::Standard => Telemetry::Standard(StandardTelemetry::decode(bytes)?),
            TelemetryBlock::Temp => Telemetry::Temp(TempTelemetry::decode(bytes)?),
            TelemetryBlock::Volt => Telemetry::Volt(VoltTelemetry::decode(bytes)?),
            TelemetryBlock::Curr => Telemetry::Curr(CurrTelemetry::decode(bytes)?),
            TelemetryBlock::DiagGeneral => {
                Telemetry::DiagGeneral(DiagGeneralTelemetry::decode(bytes)?)
            }
        };
        Ok(record)
    }

    /// Decode by raw block id; ids without a layout fail with `UnknownBlock`.
    pub fn decode_id(id: u8, bytes: &[u8]) -> Result<Self> {
        Self::decode(TelemetryBlock::try_from(id)?, bytes)
    }

    pub fn block(&self) -> TelemetryBlock {
        match self {
            Telemetry::Standard(_) => TelemetryBlock::Standard,
            Telemetry::Temp(_) => TelemetryBlock::Temp,
            Telemetry::Volt(_) => TelemetryBlock::Volt,
            Telemetry::Curr(_) => TelemetryBlock::Curr,
            Telemetry::DiagGeneral(_) => TelemetryBlock::DiagGeneral,
        }
    }
}

// Callers check the block length first.
fn le(bytes: &[u8], offset: usize, width: usize) -> u32 {
    bytes[offset..offset + width]
        .iter()
        .rev()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_block() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0x0004_0000u32.to_le_bytes());
        b.extend_from_slice(&(fault::OVERSPEED_LIMITED | fault::MOTOR_DRIVE_FAULT).to_le_bytes());
        b.push(ControlMode::Speed.code());
        b.extend_from_slice(&(1500i32 << 18).to_le_bytes());
        b.extend_from_slice(&(-250i16).to_le_bytes());
        b.extend_from_slice(&((-40i16) * 4).to_le_bytes());
        b.extend_from_slice(&(125i32 << 12).to_le_bytes());
        b.extend_from_slice(&((-1499i32 * 256) - 128).to_le_bytes());
        assert_eq!(b.len(), 25);
        b
    }

    #[test]
    fn block_lengths_match_field_tables() {
        for block in TelemetryBlock::ALL {
            let end = block
                .fields()
                .iter()
                .map(|f| f.offset + f.kind.width())
                .max()
                .unwrap();
            assert_eq!(end, block.len(), "{block}");
        }
    }

    #[test]
    fn block_lookup() {
        assert_eq!(TelemetryBlock::parse("diag_general"), Some(TelemetryBlock::DiagGeneral));
        assert_eq!(TelemetryBlock::parse("Standard"), Some(TelemetryBlock::Standard));
        assert_eq!(TelemetryBlock::parse("0x03"), Some(TelemetryBlock::Curr));
        assert_eq!(TelemetryBlock::parse("1"), Some(TelemetryBlock::Temp));
        assert_eq!(TelemetryBlock::parse("5"), None);
        assert_eq!(TelemetryBlock::parse("EDAC"), None);
    }

    #[test]
    fn unlisted_block_ids_are_rejected() {
        for id in [0x05, 0x06, 0x07, 0xFF] {
            assert_eq!(Telemetry::decode_id(id, &[0; 32]), Err(IcdError::UnknownBlock(id)));
        }
    }

    #[test]
    fn standard_offsets() {
        let tm = StandardTelemetry::decode(&standard_block()).unwrap();
        assert_eq!(tm.status, 0x0004_0000);
        assert_eq!(tm.fault, 0x41);
        assert_eq!(tm.mode().unwrap(), ControlMode::Speed);
        assert_eq!(tm.setpoint, 1500 << 18);
        assert_eq!(tm.duty_cycle, -250);
        assert_eq!(tm.current_target_ma, -40.0);
        assert_eq!(tm.current_ma, 125.0);
        assert_eq!(tm.speed_rpm, -1499.5);
        assert_eq!(tm.setpoint_value(), SetpointValue::Speed(1500.0));
        assert_eq!(tm.fault_names(), vec!["MOTOR_DRIVE_FAULT", "OVERSPEED_LIMITED"]);
        assert_eq!(tm.status_names(), vec!["OVERSPEED_LIMIT_DISABLED"]);
    }

    #[test]
    fn short_block_fails_whole() {
        let bytes = standard_block();
        let err = Telemetry::decode(TelemetryBlock::Standard, &bytes[..24]).unwrap_err();
        assert_eq!(
            err,
            IcdError::BlockLength {
                block: "STANDARD",
                expected: 25,
                actual: 24
            }
        );
        assert!(decode_fields(TelemetryBlock::Standard, &bytes[..10]).is_err());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = standard_block();
        bytes.extend_from_slice(&[0xAA; 3]);
        assert!(StandardTelemetry::decode(&bytes).is_ok());
    }

    #[test]
    fn temp_offsets() {
        let bytes = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0xFF, 0x0F];
        let tm = TempTelemetry::decode(&bytes).unwrap();
        assert_eq!(
            tm,
            TempTelemetry {
                dcdc: 1,
                enclosure: 2,
                driver: 3,
                motor: 0x0FFF
            }
        );
    }

    #[test]
    fn volt_and_curr_offsets() {
        let mut bytes = Vec::new();
        for v in [1.5f64, 3.3, 5.0, 12.0, 30.0, 2.5] {
            bytes.extend_from_slice(&QFormat::UQ16_16.encode(v).to_le_bytes());
        }

        let volt = VoltTelemetry::decode(&bytes).unwrap();
        assert_eq!(volt.v1v5, 1.5);
        assert!((volt.v3v3 - 3.3).abs() < 1e-4);
        assert_eq!(volt.v12, 12.0);
        assert_eq!(volt.v2v5, 2.5);

        let curr = CurrTelemetry::decode(&bytes).unwrap();
        assert_eq!(curr.i5v_analog_ma, 5.0);
        assert_eq!(curr.i30v_a, 2.5);
    }

    #[test]
    fn diag_general_offsets() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(3600u32 * 4 + 2).to_le_bytes());
        for counter in [100_000u32, 3, 2, 1] {
            bytes.extend_from_slice(&counter.to_le_bytes());
        }
        let tm = DiagGeneralTelemetry::decode(&bytes).unwrap();
        assert_eq!(tm.uptime_s, 3600.5);
        assert_eq!(tm.rev_count, 100_000);
        assert_eq!(tm.hall_bad_trans_count, 3);
        assert_eq!(tm.drive_fault_count, 2);
        assert_eq!(tm.over_temp_count, 1);
    }

    #[test]
    fn generic_fields_agree_with_typed_record() {
        let fields = decode_fields(TelemetryBlock::Standard, &standard_block()).unwrap();
        let speed = fields.iter().find(|f| f.name == "speed").unwrap();
        assert_eq!(speed.value, FieldValue::Real(-1499.5));
        assert_eq!(speed.unit, "RPM");
        let duty = fields.iter().find(|f| f.name == "duty_cycle").unwrap();
        assert_eq!(duty.value, FieldValue::Signed(-250));
    }

    #[test]
    fn records_serialize_with_block_tag() {
        let tm = Telemetry::decode(TelemetryBlock::Temp, &[0; 8]).unwrap();
        let json = serde_json::to_value(tm).unwrap();
        assert_eq!(json["block"], "TEMP");
        assert_eq!(json["motor"], 0);
    }
}
