//! Data model of the reaction-wheel interface control document.
//!
//! Everything here is pure: the Q-format fixed-point codec, control modes
//! and register constants, the PING reply and the APP-TM telemetry block
//! layouts. No I/O happens in this crate.

pub mod device;
pub mod error;
pub mod fixed;
pub mod registers;
pub mod setpoint;
pub mod telemetry;

pub use device::DeviceInfo;
pub use error::{IcdError, Result};
pub use fixed::QFormat;
pub use registers::{
    fault, flag_names, memory, parse_flags, protection, status, ControlMode, SetpointEncoding,
    PWM_DUTY_MAX, PWM_DUTY_MIN,
};
pub use setpoint::{project_setpoint, SetpointValue};
pub use telemetry::{
    decode_fields, CurrTelemetry, DecodedField, DiagGeneralTelemetry, FieldDef, FieldKind,
    FieldValue, StandardTelemetry, TempTelemetry, Telemetry, TelemetryBlock, VoltTelemetry,
};
