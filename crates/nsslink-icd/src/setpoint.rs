//! Setpoint interpretation.
//!
//! The STANDARD block and APP-CMD carry the setpoint as a raw signed
//! 32-bit field whose meaning depends on the control mode next to it.
//! [`project_setpoint`] turns the pair into engineering units, leaving the
//! raw field untouched on the record.

use std::fmt;

use serde::Serialize;

use crate::registers::{ControlMode, SetpointEncoding};

/// A setpoint in the units of its control mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetpointValue {
    Idle,
    /// Milliamps.
    Current(f64),
    /// RPM.
    Speed(f64),
    /// mN·m.
    Torque(f64),
    /// Signed duty value.
    Pwm(i32),
    /// Mode code the ICD does not define; only the raw value is known.
    Unknown { mode: u8, raw: i32 },
}

impl SetpointValue {
    /// Numeric value, when the mode has one.
    pub fn value(&self) -> Option<f64> {
        match *self {
            SetpointValue::Idle | SetpointValue::Unknown { .. } => None,
            SetpointValue::Current(v) | SetpointValue::Speed(v) | SetpointValue::Torque(v) => {
                Some(v)
            }
            SetpointValue::Pwm(v) => Some(f64::from(v)),
        }
    }
}

impl fmt::Display for SetpointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetpointValue::Idle => f.write_str("idle"),
            SetpointValue::Current(v) => write!(f, "{v:.3} mA"),
            SetpointValue::Speed(v) => write!(f, "{v:.3} RPM"),
            SetpointValue::Torque(v) => write!(f, "{v:.3} mN·m"),
            SetpointValue::Pwm(v) => write!(f, "{v} duty"),
            SetpointValue::Unknown { mode, raw } => write!(f, "raw {raw} (mode 0x{mode:02X})"),
        }
    }
}

/// Interpret a raw setpoint under control mode code `mode`.
pub fn project_setpoint(mode: u8, raw: i32) -> SetpointValue {
    let Ok(mode) = ControlMode::try_from(mode) else {
        return SetpointValue::Unknown { mode, raw };
    };
    let value = match mode.setpoint_encoding() {
        SetpointEncoding::Fixed(format) => format.decode(raw as u32),
        SetpointEncoding::None | SetpointEncoding::Integer => 0.0,
    };
    match mode {
        ControlMode::Idle => SetpointValue::Idle,
        ControlMode::Current => SetpointValue::Current(value),
        ControlMode::Speed => SetpointValue::Speed(value),
        ControlMode::Torque => SetpointValue::Torque(value),
        ControlMode::Pwm => SetpointValue::Pwm(raw),
    }
}
