use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nsslink_icd::TelemetryBlock;
use nsslink_session::{SessionError, SessionStats};
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::send::parse_hex;
use crate::cmd::{open_session, parse_duration, DecodeArgs, LinkArgs, TmArgs, WatchArgs};
use crate::exit::{
    icd_error, session_error, CliError, CliResult, DATA_INVALID, FAILURE, INTERNAL, SUCCESS,
};
use crate::output::{emit, print_telemetry, OutputFormat, TelemetryReport};

const WATCH_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Serialize)]
struct RawBlock {
    block: TelemetryBlock,
    payload: String,
}

#[derive(Debug, Serialize)]
struct WatchSummary {
    samples: u64,
    missed: u64,
    stats: SessionStats,
}

fn parse_block(input: &str) -> CliResult<TelemetryBlock> {
    TelemetryBlock::parse(input).ok_or_else(|| {
        CliError::usage(format!(
            "unknown telemetry block {input}; expected standard, temp, volt, curr or diag-general"
        ))
    })
}

pub fn tm(args: TmArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let block = parse_block(&args.block)?;
    let mut session = open_session(link)?;
    let payload = session
        .app_telemetry_raw(block)
        .map_err(|err| session_error("telemetry request failed", err))?;

    if args.raw {
        let raw = RawBlock {
            block,
            payload: hex::encode(&payload),
        };
        emit(
            &raw,
            &[("block", block.to_string()), ("payload", raw.payload.clone())],
            format,
        );
        return Ok(SUCCESS);
    }

    let report =
        TelemetryReport::build(block, &payload).map_err(|err| icd_error("telemetry decode failed", err))?;
    print_telemetry(&report, format);
    Ok(SUCCESS)
}

pub fn watch(args: WatchArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let block = parse_block(&args.block)?;
    let interval = parse_duration(&args.interval)?;
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut session = open_session(link)?;
    let mut samples = 0u64;
    let mut missed = 0u64;

    while running.load(Ordering::SeqCst) && args.count.map_or(true, |n| samples + missed < n) {
        match session.app_telemetry_raw(block) {
            Ok(payload) => {
                let report = TelemetryReport::build(block, &payload)
                    .map_err(|err| icd_error("telemetry decode failed", err))?;
                print_telemetry(&report, format);
                samples += 1;
            }
            // A wheel that stops answering for a while is reported, not fatal.
            Err(err @ SessionError::Timeout { .. }) => {
                warn!(%err, "sample missed");
                missed += 1;
            }
            Err(err) => return Err(session_error("watch failed", err)),
        }

        if args.count.is_some_and(|n| samples + missed >= n) {
            break;
        }
        let deadline = Instant::now() + interval;
        while running.load(Ordering::SeqCst) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(WATCH_SLICE));
        }
    }

    let stats = session.stats();
    info!(samples, missed, %stats, "watch finished");
    let summary = WatchSummary {
        samples,
        missed,
        stats,
    };
    emit(
        &summary,
        &[
            ("samples", samples.to_string()),
            ("missed", missed.to_string()),
            ("frames_tx", stats.frames_tx.to_string()),
            ("frames_rx", stats.frames_rx.to_string()),
            ("crc_errors", stats.crc_errors.to_string()),
            ("framing_errors", stats.framing_errors.to_string()),
            ("timeouts", stats.timeouts.to_string()),
            ("nacks", stats.nacks.to_string()),
        ],
        format,
    );
    if samples == 0 && missed > 0 {
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

pub fn decode(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let block = parse_block(&args.block)?;
    let bytes = parse_hex(&args.hex).map_err(|err| CliError::new(DATA_INVALID, err.message))?;
    let report = TelemetryReport::build(block, &bytes).map_err(|err| icd_error("decode failed", err))?;
    print_telemetry(&report, format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
