//! Control modes, memory addresses and bit-field definitions.

use std::fmt;

use serde::Serialize;

use crate::error::IcdError;
use crate::fixed::QFormat;

/// Lowest PWM duty setpoint (signed 9-bit).
pub const PWM_DUTY_MIN: i32 = -256;
/// Highest PWM duty setpoint (signed 9-bit).
pub const PWM_DUTY_MAX: i32 = 255;

/// Closed-loop control mode selected by APP-CMD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ControlMode {
    Idle = 0x00,
    Current = 0x01,
    Speed = 0x02,
    Torque = 0x04,
    Pwm = 0x08,
}

/// How a control mode's setpoint is carried in the signed 32-bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetpointEncoding {
    /// No setpoint; zero is sent.
    None,
    /// Fixed-point in the given format.
    Fixed(QFormat),
    /// Plain signed integer.
    Integer,
}

impl ControlMode {
    pub const ALL: [ControlMode; 5] = [
        ControlMode::Idle,
        ControlMode::Current,
        ControlMode::Speed,
        ControlMode::Torque,
        ControlMode::Pwm,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            ControlMode::Idle => "IDLE",
            ControlMode::Current => "CURRENT",
            ControlMode::Speed => "SPEED",
            ControlMode::Torque => "TORQUE",
            ControlMode::Pwm => "PWM",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(name.trim()))
    }

    pub const fn setpoint_encoding(self) -> SetpointEncoding {
        match self {
            ControlMode::Idle => SetpointEncoding::None,
            ControlMode::Current | ControlMode::Speed => SetpointEncoding::Fixed(QFormat::Q14_18),
            ControlMode::Torque => SetpointEncoding::Fixed(QFormat::Q10_22),
            ControlMode::Pwm => SetpointEncoding::Integer,
        }
    }

    /// Engineering unit of the setpoint.
    pub const fn setpoint_unit(self) -> &'static str {
        match self {
            ControlMode::Idle => "",
            ControlMode::Current => "mA",
            ControlMode::Speed => "RPM",
            ControlMode::Torque => "mN·m",
            ControlMode::Pwm => "duty",
        }
    }

    /// Convert a setpoint to its wire value.
    ///
    /// Returns the raw signed field and whether the input was clamped.
    pub fn encode_setpoint(self, value: f64) -> (i32, bool) {
        match self.setpoint_encoding() {
            SetpointEncoding::None => (0, false),
            SetpointEncoding::Fixed(format) => {
                let clamped = !format.check(value);
                (format.encode(value) as i32, clamped)
            }
            SetpointEncoding::Integer => {
                if value.is_nan() {
                    return (0, true);
                }
                let raw = value.trunc();
                let limited = raw.clamp(f64::from(PWM_DUTY_MIN), f64::from(PWM_DUTY_MAX));
                (limited as i32, limited != raw)
            }
        }
    }
}

impl TryFrom<u8> for ControlMode {
    type Error = IcdError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or(IcdError::UnknownMode(code))
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named bit or address.
pub type Named<T> = (T, &'static str);

/// PEEK/POKE memory addresses.
pub mod memory {
    use super::Named;

    pub const SERIAL_NUMBER: u8 = 0x00;
    /// Overspeed fault threshold, UQ24.8 RPM.
    pub const OVERSPEED_FAULT_THRESHOLD: u8 = 0x06;
    pub const ACTIVE_SPEED_LIMIT: u8 = 0x07;

    pub const ALL: &[Named<u8>] = &[
        (SERIAL_NUMBER, "SERIAL_NUMBER"),
        (OVERSPEED_FAULT_THRESHOLD, "OVERSPEED_FAULT_THRESHOLD"),
        (ACTIVE_SPEED_LIMIT, "ACTIVE_SPEED_LIMIT"),
    ];

    pub fn name(addr: u8) -> Option<&'static str> {
        ALL.iter().find(|(a, _)| *a == addr).map(|(_, n)| *n)
    }

    pub fn from_name(name: &str) -> Option<u8> {
        ALL.iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(a, _)| *a)
    }
}

/// Fault word bits (STANDARD telemetry, CLEAR-FAULT mask).
pub mod fault {
    use super::Named;

    pub const MOTOR_DRIVE_FAULT: u32 = 0x0000_0001;
    pub const MOTOR_DRIVE_OTW: u32 = 0x0000_0002;
    pub const HALL_INVALID_STATE: u32 = 0x0000_0004;
    pub const HALL_INVALID_TRANS: u32 = 0x0000_0008;
    pub const OVERVOLTAGE: u32 = 0x0000_0010;
    pub const OVERSPEED_FAULT: u32 = 0x0000_0020;
    pub const OVERSPEED_LIMITED: u32 = 0x0000_0040;
    pub const OVERPOWER_LIMITED: u32 = 0x0000_0080;
    pub const CURRENT_LIMITED: u32 = 0x0000_0100;

    /// Every defined fault bit.
    pub const ALL_MASK: u32 = 0x0000_01FF;

    pub const ALL: &[Named<u32>] = &[
        (MOTOR_DRIVE_FAULT, "MOTOR_DRIVE_FAULT"),
        (MOTOR_DRIVE_OTW, "MOTOR_DRIVE_OTW"),
        (HALL_INVALID_STATE, "HALL_INVALID_STATE"),
        (HALL_INVALID_TRANS, "HALL_INVALID_TRANS"),
        (OVERVOLTAGE, "OVERVOLTAGE"),
        (OVERSPEED_FAULT, "OVERSPEED_FAULT"),
        (OVERSPEED_LIMITED, "OVERSPEED_LIMITED"),
        (OVERPOWER_LIMITED, "OVERPOWER_LIMITED"),
        (CURRENT_LIMITED, "CURRENT_LIMITED"),
    ];
}

/// CONFIG-PROT bits. A set bit disables the protection.
pub mod protection {
    use super::Named;

    pub const OVERSPEED_FAULT: u32 = 0x01;
    pub const OVERSPEED_LIMIT: u32 = 0x02;
    pub const OVERCURRENT_LIMIT: u32 = 0x04;
    pub const EDAC_SCRUB: u32 = 0x08;
    pub const BRAKING_OVERVOLTAGE: u32 = 0x10;

    pub const ALL: &[Named<u32>] = &[
        (OVERSPEED_FAULT, "OVERSPEED_FAULT"),
        (OVERSPEED_LIMIT, "OVERSPEED_LIMIT"),
        (OVERCURRENT_LIMIT, "OVERCURRENT_LIMIT"),
        (EDAC_SCRUB, "EDAC_SCRUB"),
        (BRAKING_OVERVOLTAGE, "BRAKING_OVERVOLTAGE"),
    ];
}

/// Status word bits (STANDARD telemetry).
pub mod status {
    use super::Named;

    pub const OVERSPEED_FAULT_DISABLED: u32 = 0x0002_0000;
    pub const OVERSPEED_LIMIT_DISABLED: u32 = 0x0004_0000;
    pub const OVERCURRENT_DISABLED: u32 = 0x0008_0000;
    pub const EDAC_SCRUB_DISABLED: u32 = 0x0010_0000;
    pub const BRAKING_LOAD_DISABLED: u32 = 0x0020_0000;

    pub const ALL: &[Named<u32>] = &[
        (OVERSPEED_FAULT_DISABLED, "OVERSPEED_FAULT_DISABLED"),
        (OVERSPEED_LIMIT_DISABLED, "OVERSPEED_LIMIT_DISABLED"),
        (OVERCURRENT_DISABLED, "OVERCURRENT_DISABLED"),
        (EDAC_SCRUB_DISABLED, "EDAC_SCRUB_DISABLED"),
        (BRAKING_LOAD_DISABLED, "BRAKING_LOAD_DISABLED"),
    ];
}

/// Names of the bits of `value` present in `table`, in table order.
pub fn flag_names(value: u32, table: &[Named<u32>]) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(bit, _)| value & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// Parse a list of flag names (`|` or `,` separated) into a mask.
///
/// Returns the first unrecognized name on failure.
pub fn parse_flags<'a>(input: &'a str, table: &[Named<u32>]) -> Result<u32, &'a str> {
    input.split(['|', ','])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .try_fold(0u32, |mask, part| {
            table
                .iter()
                .find(|(_, name)| name.eq_ignore_ascii_case(part))
                .map(|(bit, _)| mask | bit)
                .ok_or(part)
        })
}
