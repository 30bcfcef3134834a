//! Synchronous request/reply engine.
//!
//! One transaction owns the link from the first write to the accepted
//! reply. Replies are matched by command code only, so the input buffer is
//! flushed and the SLIP decoder reset before every attempt.

use std::thread;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use nsslink_frame::{
    command_label, validate_reply, Checksum, Command, Crc16, Frame, FrameError, PacketCodec,
    ReplyError, SlipDecoder,
};
use nsslink_transport::{Transport, TransportError};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::stats::SessionStats;

/// Where the engine is within the current (or last) transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// No transaction has run yet.
    Idle,
    /// Writing the request.
    Sending,
    /// Polling for the reply.
    AwaitingReply,
    /// A valid reply was accepted.
    Success,
    /// The last attempt failed and another one follows.
    Retry,
    /// The transaction failed.
    Fatal,
}

/// A session with one wheel over a byte transport.
pub struct Session<T: Transport, C: Checksum = Crc16> {
    transport: T,
    codec: PacketCodec<C>,
    decoder: SlipDecoder,
    config: SessionConfig,
    stats: SessionStats,
    state: TransactionState,
}

impl<T: Transport> Session<T> {
    /// Open a session using the wheel's CRC-16/CCITT-FALSE.
    pub fn open(transport: T, config: SessionConfig) -> Result<Self> {
        Self::with_checksum(transport, config, Crc16::CCITT_FALSE)
    }
}

impl<T: Transport, C: Checksum> Session<T, C> {
    /// Open a session with a custom frame checksum.
    pub fn with_checksum(transport: T, config: SessionConfig, checksum: C) -> Result<Self> {
        config.validate()?;
        info!(
            dest = config.dest_addr,
            src = config.src_addr,
            timeout_ms = config.timeout.as_millis() as u64,
            retries = config.retries,
            "session opened"
        );
        Ok(Self {
            transport,
            codec: PacketCodec::with_checksum(checksum),
            decoder: SlipDecoder::with_max_frame_len(config.max_frame_len),
            config,
            stats: SessionStats::default(),
            state: TransactionState::Idle,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the link counters.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// End the session and hand back the transport.
    pub fn close(self) -> T {
        info!(stats = %self.stats, "session closed");
        self.transport
    }

    /// Build a request frame addressed per the session config.
    pub fn request_frame(&self, command: Command, payload: impl Into<Bytes>) -> Frame {
        Frame::request(command, payload, self.config.dest_addr, self.config.src_addr)
    }

    /// Send `request` and return the validated reply.
    ///
    /// Checksum, framing and per-attempt timeout failures are retried up to
    /// `retries` times with identical bytes; exhausting them yields
    /// [`SessionError::Timeout`]. Everything else, NACK included, is
    /// returned on the attempt it happens.
    pub fn transact(&mut self, request: &Frame) -> Result<Frame> {
        let mut wire = BytesMut::new();
        self.codec.encode(request, &mut wire);
        let wire = wire.freeze();
        let attempts = self.config.attempts();

        for attempt in 1..=attempts {
            match self.attempt(request, &wire) {
                Ok(reply) => {
                    self.set_state(TransactionState::Success);
                    return Ok(reply);
                }
                Err(err) if err.is_retryable() => {
                    self.set_state(TransactionState::Retry);
                    debug!(
                        command = %command_label(request.command_code()),
                        attempt,
                        attempts,
                        error = %err,
                        "attempt failed"
                    );
                }
                Err(err) => {
                    self.set_state(TransactionState::Fatal);
                    return Err(err);
                }
            }
        }

        self.set_state(TransactionState::Fatal);
        warn!(
            command = %command_label(request.command_code()),
            attempts,
            "transaction timed out"
        );
        Err(SessionError::Timeout {
            command: request.command_code(),
            attempts,
        })
    }

    fn attempt(&mut self, request: &Frame, wire: &[u8]) -> Result<Frame> {
        self.transport.flush_input()?;
        self.decoder.reset();

        self.set_state(TransactionState::Sending);
        let written = self.transport.write(wire)?;
        if written != wire.len() {
            warn!(written, expected = wire.len(), "TX incomplete");
            return Err(TransportError::ShortWrite {
                written,
                expected: wire.len(),
            }
            .into());
        }
        self.stats.frames_tx += 1;
        debug!(
            frame = %hex::encode(request.to_bytes()),
            wire_len = wire.len(),
            "TX"
        );

        self.set_state(TransactionState::AwaitingReply);
        let raw = self.await_frame(request.command_code())?;

        let reply = match self.codec.decode(&raw) {
            Ok(reply) => reply,
            Err(err) => {
                match err {
                    FrameError::Checksum { .. } => self.stats.crc_errors += 1,
                    FrameError::Truncated { .. } => self.stats.framing_errors += 1,
                }
                warn!(frame = %hex::encode(&raw), error = %err, "RX rejected");
                return Err(err.into());
            }
        };
        self.stats.frames_rx += 1;
        debug!(frame = %hex::encode(reply.to_bytes()), "RX");

        if let Err(err) = validate_reply(request, &reply) {
            if matches!(err, ReplyError::Nack { .. }) {
                self.stats.nacks += 1;
            }
            warn!(error = %err, "reply rejected");
            return Err(err.into());
        }
        Ok(reply)
    }

    /// Poll until the decoder yields a frame or the attempt deadline passes.
    fn await_frame(&mut self, command: u8) -> Result<Bytes> {
        let deadline = Instant::now() + self.config.timeout;
        loop {
            let chunk = self.transport.read_available()?;
            if !chunk.is_empty() {
                trace!(len = chunk.len(), "chunk received");
                // Later frames in the same chunk are dropped with the decoder
                // reset on the next attempt.
                if let Some(frame) = self.decoder.feed(&chunk).into_iter().next() {
                    return Ok(frame);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                self.stats.timeouts += 1;
                return Err(SessionError::NoReply {
                    command,
                    timeout: self.config.timeout,
                });
            }
            thread::sleep(self.config.poll_interval.min(deadline - now));
        }
    }

    fn set_state(&mut self, next: TransactionState) {
        trace!(from = ?self.state, to = ?next, "transaction state");
        self.state = next;
    }
}

impl<T: Transport, C: Checksum> std::fmt::Debug for Session<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("state", &self.state)
            .finish()
    }
}
