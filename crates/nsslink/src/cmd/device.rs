use crate::cmd::{open_session, LinkArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{emit, OutputFormat};

pub fn ping(link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut session = open_session(link)?;
    let device = session
        .ping()
        .map_err(|err| session_error("ping failed", err))?;

    emit(
        &device,
        &[
            ("device_type", format!("0x{:02X}", device.device_type)),
            ("serial", device.serial.to_string()),
            ("firmware", device.version()),
        ],
        format,
    );
    Ok(SUCCESS)
}
