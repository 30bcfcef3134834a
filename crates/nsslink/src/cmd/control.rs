use nsslink_icd::{fault, flag_names, protection, ControlMode, SetpointEncoding};
use serde::Serialize;

use crate::cmd::{
    open_session, parse_mask, ClearFaultArgs, CmdArgs, ConfigProtArgs, LinkArgs,
};
use crate::exit::{session_error, CliError, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

#[derive(Debug, Serialize)]
struct ModeChange {
    mode: ControlMode,
    setpoint: f64,
    unit: &'static str,
    raw: i32,
    clamped: bool,
}

#[derive(Debug, Serialize)]
struct MaskWrite {
    command: &'static str,
    mask: u32,
    flags: Vec<&'static str>,
}

impl MaskWrite {
    fn emit(&self, format: OutputFormat) {
        let flags = if self.flags.is_empty() {
            "-".to_string()
        } else {
            self.flags.join(" | ")
        };
        emit(
            self,
            &[
                ("command", self.command.to_string()),
                ("mask", format!("0x{:08X}", self.mask)),
                ("flags", flags),
            ],
            format,
        );
    }
}

fn parse_mode(input: &str) -> CliResult<ControlMode> {
    ControlMode::from_name(input).ok_or_else(|| {
        CliError::usage(format!(
            "unknown control mode {input}; expected idle, current, speed, torque or pwm"
        ))
    })
}

pub fn app_command(args: CmdArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mode = parse_mode(&args.mode)?;
    if !args.setpoint.is_finite() {
        return Err(CliError::usage("setpoint must be a finite number"));
    }
    let (raw, clamped) = mode.encode_setpoint(args.setpoint);

    let mut session = open_session(link)?;
    session
        .app_command(mode, args.setpoint)
        .map_err(|err| session_error("mode change failed", err))?;

    let setpoint = match mode.setpoint_encoding() {
        SetpointEncoding::None => 0.0,
        SetpointEncoding::Integer => f64::from(raw),
        SetpointEncoding::Fixed(format) => format.decode(raw as u32),
    };
    let change = ModeChange {
        mode,
        setpoint,
        unit: mode.setpoint_unit(),
        raw,
        clamped,
    };
    emit(
        &change,
        &[
            ("mode", mode.to_string()),
            ("setpoint", format!("{setpoint:.3} {}", change.unit)),
            ("raw", format!("0x{:08X}", raw as u32)),
            ("clamped", clamped.to_string()),
        ],
        format,
    );
    Ok(SUCCESS)
}

pub fn clear_fault(args: ClearFaultArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mask = match args.mask.as_deref() {
        Some(input) => parse_mask(input, fault::ALL)?,
        None => fault::ALL_MASK,
    };

    let mut session = open_session(link)?;
    session
        .clear_fault(mask)
        .map_err(|err| session_error("clear-fault failed", err))?;

    MaskWrite {
        command: "CLEAR-FAULT",
        mask,
        flags: flag_names(mask, fault::ALL),
    }
    .emit(format);
    Ok(SUCCESS)
}

pub fn config_protection(
    args: ConfigProtArgs,
    link: &LinkArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let bits = parse_mask(&args.bits, protection::ALL)?;

    let mut session = open_session(link)?;
    session
        .config_protection(bits)
        .map_err(|err| session_error("config-prot failed", err))?;

    MaskWrite {
        command: "CONFIG-PROT",
        mask: bits,
        flags: flag_names(bits, protection::ALL),
    }
    .emit(format);
    Ok(SUCCESS)
}
