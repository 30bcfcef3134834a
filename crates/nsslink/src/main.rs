mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, LinkArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "nsslink", version, about = "NSP reaction wheel link CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(flatten)]
    link: LinkArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { exit::USAGE } else { exit::SUCCESS };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.link, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_link_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nsslink",
            "peek",
            "0x06",
            "--socket",
            "/tmp/wheel.sock",
            "--dest",
            "0x0A",
            "--timeout-ms",
            "25",
        ])
        .expect("peek args should parse");

        assert!(matches!(cli.command, Command::Peek(_)));
        assert_eq!(cli.link.dest, 0x0A);
        assert_eq!(cli.link.timeout_ms, 25);
        assert!(cli.link.port.is_none());
    }

    #[test]
    fn rejects_port_and_socket_together() {
        let err = Cli::try_parse_from([
            "nsslink",
            "--port",
            "/dev/ttyUSB0",
            "--socket",
            "/tmp/wheel.sock",
            "ping",
        ])
        .expect_err("conflicting link args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn negative_setpoints_are_values() {
        let cli = Cli::try_parse_from(["nsslink", "cmd", "speed", "-1500.5"])
            .expect("negative setpoint should parse");
        match cli.command {
            Command::Cmd(args) => {
                assert_eq!(args.mode, "speed");
                assert_eq!(args.setpoint, -1500.5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_address() {
        let err = Cli::try_parse_from(["nsslink", "--dest", "0x80", "ping"])
            .expect_err("8-bit address should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_decode_subcommand() {
        let cli = Cli::try_parse_from(["nsslink", "--format", "pretty", "decode", "temp", "0100"])
            .expect("decode args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Pretty));
        assert!(matches!(cli.command, Command::Decode(_)));
    }
}
