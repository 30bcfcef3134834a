use nsslink_frame::{command_label, Command};
use serde::Serialize;

use crate::cmd::{open_session, parse_u32, LinkArgs, SendArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

#[derive(Debug, Serialize)]
struct RawReply {
    command: String,
    request: String,
    payload: String,
    len: usize,
}

pub fn run(args: SendArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let command = resolve_command(&args.command)?;
    let payload = match args.payload.as_deref() {
        Some(text) => parse_hex(text)?,
        None => Vec::new(),
    };

    let mut session = open_session(link)?;
    let reply = session
        .request(command, payload.clone())
        .map_err(|err| session_error("request failed", err))?;

    let out = RawReply {
        command: command_label(command.code()),
        request: hex::encode(&payload),
        payload: hex::encode(&reply),
        len: reply.len(),
    };
    emit(
        &out,
        &[
            ("command", out.command.clone()),
            ("request", out.request.clone()),
            ("payload", out.payload.clone()),
            ("len", out.len.to_string()),
        ],
        format,
    );
    Ok(SUCCESS)
}

fn resolve_command(input: &str) -> CliResult<Command> {
    if let Some(command) = Command::from_name(input) {
        return Ok(command);
    }
    let code = parse_u32(input).map_err(CliError::usage)?;
    u8::try_from(code)
        .ok()
        .and_then(|code| Command::try_from(code).ok())
        .ok_or_else(|| CliError::usage(format!("unknown command: {input}")))
}

/// Decode hex, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.split_whitespace().collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);
    hex::decode(digits).map_err(|err| CliError::usage(format!("invalid hex payload: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    #[test]
    fn commands_resolve_by_name_or_code() {
        assert_eq!(resolve_command("app-tm").unwrap(), Command::AppTelemetry);
        assert_eq!(resolve_command("TRIP_LCL").unwrap(), Command::TripLcl);
        assert_eq!(resolve_command("0x02").unwrap(), Command::Peek);
        assert_eq!(resolve_command("0x01").unwrap_err().code, USAGE);
        assert_eq!(resolve_command("999").unwrap_err().code, USAGE);
    }

    #[test]
    fn hex_payload_ignores_spaces_and_prefix() {
        assert_eq!(parse_hex("0x06").unwrap(), vec![0x06]);
        assert_eq!(parse_hex("de ad be ef").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(parse_hex("abc").is_err());
    }
}
