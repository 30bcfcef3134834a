//! Poll a wheel once: identity, every telemetry block, link statistics.
//!
//! Run with:
//!   cargo run --example read-telemetry -- /dev/ttyUSB0
//!   cargo run --example read-telemetry -- --socket /tmp/wheel.sock

use std::error::Error;
use std::time::Duration;

use nsslink::icd::{Telemetry, TelemetryBlock};
use nsslink::session::{Session, SessionConfig};
use nsslink::transport::{SerialConfig, SerialPort, Transport, UnixSocketTransport};

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let transport: Box<dyn Transport> = match args.as_slice() {
        [flag, path] if flag == "--socket" => Box::new(UnixSocketTransport::connect(path)?),
        [path] => Box::new(SerialPort::open(&SerialConfig {
            path: path.into(),
            ..SerialConfig::default()
        })?),
        _ => return Err("usage: read-telemetry <tty> | --socket <path>".into()),
    };

    let config = SessionConfig::default().with_timeout(Duration::from_millis(50));
    let mut wheel = Session::open(transport, config)?;

    println!("{}", wheel.ping()?);
    for block in TelemetryBlock::ALL {
        match wheel.app_telemetry(block)? {
            Telemetry::Standard(tm) => println!(
                "{block}: mode={} setpoint={} speed={:.1} RPM faults={:?}",
                tm.control_mode,
                tm.setpoint_value(),
                tm.speed_rpm,
                tm.fault_names()
            ),
            other => println!("{block}: {other:?}"),
        }
    }
    eprintln!("{}", wheel.stats());
    Ok(())
}
