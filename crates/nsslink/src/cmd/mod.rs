use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use nsslink_frame::ADDR_MASK;
use nsslink_session::{Session, SessionConfig, DEFAULT_RETRIES};
use nsslink_transport::{Transport, DEFAULT_BAUD};

use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod control;
pub mod device;
pub mod memory;
pub mod send;
pub mod telemetry;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ping the wheel and print its identity.
    Ping,
    /// Read a 32-bit memory word.
    Peek(PeekArgs),
    /// Write a 32-bit memory word.
    Poke(PokeArgs),
    /// Fetch and decode one telemetry block.
    Tm(TmArgs),
    /// Set control mode and setpoint.
    Cmd(CmdArgs),
    /// Clear latched faults.
    ClearFault(ClearFaultArgs),
    /// Set the protection disable bits.
    ConfigProt(ConfigProtArgs),
    /// Send a raw request and print the reply payload.
    Send(SendArgs),
    /// Poll a telemetry block until interrupted.
    Watch(WatchArgs),
    /// Decode a telemetry block from hex, without a device.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ping => device::ping(link, format),
        Command::Peek(args) => memory::peek(args, link, format),
        Command::Poke(args) => memory::poke(args, link, format),
        Command::Tm(args) => telemetry::tm(args, link, format),
        Command::Cmd(args) => control::app_command(args, link, format),
        Command::ClearFault(args) => control::clear_fault(args, link, format),
        Command::ConfigProt(args) => control::config_protection(args, link, format),
        Command::Send(args) => send::run(args, link, format),
        Command::Watch(args) => telemetry::watch(args, link, format),
        Command::Decode(args) => telemetry::decode(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Link and session settings shared by every device command.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial device of the wheel.
    #[arg(long, env = "NSSLINK_PORT", value_name = "TTY", global = true)]
    pub port: Option<PathBuf>,
    /// Unix socket of a wheel emulator.
    #[arg(
        long,
        env = "NSSLINK_SOCKET",
        value_name = "PATH",
        global = true,
        conflicts_with = "port"
    )]
    pub socket: Option<PathBuf>,
    /// Serial line rate.
    #[arg(long, env = "NSSLINK_BAUD", default_value_t = DEFAULT_BAUD, global = true)]
    pub baud: u32,
    /// Reply timeout per attempt, in milliseconds.
    #[arg(long, env = "NSSLINK_TIMEOUT_MS", default_value_t = 10, global = true)]
    pub timeout_ms: u64,
    /// Retries after the first attempt.
    #[arg(long, env = "NSSLINK_RETRIES", default_value_t = DEFAULT_RETRIES, global = true)]
    pub retries: u32,
    /// Wheel address.
    #[arg(long, env = "NSSLINK_DEST", default_value = "0x07", value_parser = parse_addr, global = true)]
    pub dest: u8,
    /// Host address.
    #[arg(long, env = "NSSLINK_SRC", default_value = "0x11", value_parser = parse_addr, global = true)]
    pub src: u8,
}

impl LinkArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_retries(self.retries)
            .with_addresses(self.dest, self.src)
    }
}

pub type LinkSession = Session<Box<dyn Transport>>;

/// Open the configured transport and start a session on it.
pub fn open_session(link: &LinkArgs) -> CliResult<LinkSession> {
    let transport = open_transport(link)?;
    Session::open(transport, link.session_config())
        .map_err(|err| session_error("session setup failed", err))
}

fn open_transport(link: &LinkArgs) -> CliResult<Box<dyn Transport>> {
    use nsslink_transport::{SerialConfig, SerialPort};

    use crate::exit::transport_error;

    if let Some(path) = &link.port {
        let config = SerialConfig {
            path: path.clone(),
            baud: link.baud,
            ..SerialConfig::default()
        };
        let port = SerialPort::open(&config).map_err(|err| transport_error("open failed", err))?;
        return Ok(Box::new(port));
    }
    if let Some(path) = &link.socket {
        return open_socket(path);
    }
    Err(CliError::usage(
        "no link configured: pass --port or --socket (or set NSSLINK_PORT)",
    ))
}

#[cfg(unix)]
fn open_socket(path: &std::path::Path) -> CliResult<Box<dyn Transport>> {
    use nsslink_transport::UnixSocketTransport;

    let socket = UnixSocketTransport::connect(path)
        .map_err(|err| crate::exit::transport_error("connect failed", err))?;
    Ok(Box::new(socket))
}

#[cfg(not(unix))]
fn open_socket(_path: &std::path::Path) -> CliResult<Box<dyn Transport>> {
    Err(CliError::usage("emulator sockets are only supported on unix"))
}

#[derive(Args, Debug)]
pub struct PeekArgs {
    /// Address as a number (`0x06`) or a register name.
    pub addr: String,
}

#[derive(Args, Debug)]
pub struct PokeArgs {
    /// Address as a number (`0x06`) or a register name.
    pub addr: String,
    /// Value to write.
    #[arg(value_parser = parse_u32)]
    pub value: u32,
}

#[derive(Args, Debug)]
pub struct TmArgs {
    /// Block name or id.
    #[arg(default_value = "standard")]
    pub block: String,
    /// Print the undecoded payload as hex.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct CmdArgs {
    /// Control mode: idle, current, speed, torque or pwm.
    pub mode: String,
    /// Setpoint in the mode's units (mA, RPM, mN·m or duty).
    #[arg(allow_hyphen_values = true, default_value_t = 0.0)]
    pub setpoint: f64,
}

#[derive(Args, Debug)]
pub struct ClearFaultArgs {
    /// Faults to clear, as a number or `NAME|NAME`. Default: all.
    #[arg(long)]
    pub mask: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigProtArgs {
    /// Disable bits, as a number or `NAME|NAME`.
    pub bits: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Command name (`APP-TM`) or code.
    #[arg(long, short = 'c')]
    pub command: String,
    /// Request payload as hex.
    #[arg(long, short = 'p')]
    pub payload: Option<String>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Block name or id.
    #[arg(default_value = "standard")]
    pub block: String,
    /// Poll period (e.g. 1s, 200ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Stop after N samples.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Block name or id.
    pub block: String,
    /// Block bytes as hex; spaces are ignored.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a decimal or `0x` hexadecimal number.
pub fn parse_u32(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let digits = input.replace('_', "");
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

/// Parse a 7-bit NSP address.
pub fn parse_addr(input: &str) -> Result<u8, String> {
    let value = parse_u32(input)?;
    if value > u32::from(ADDR_MASK) {
        return Err(format!("address {input} is above 0x{ADDR_MASK:02X}"));
    }
    Ok(value as u8)
}

/// Parse a flag mask given either numerically or as names from `table`.
pub fn parse_mask(input: &str, table: &[(u32, &'static str)]) -> CliResult<u32> {
    if let Ok(value) = parse_u32(input) {
        return Ok(value);
    }
    nsslink_icd::parse_flags(input, table)
        .map_err(|name| CliError::usage(format!("unknown flag name: {name}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "s" => Duration::from_secs(value),
        _ => Duration::from_millis(value),
    })
}
