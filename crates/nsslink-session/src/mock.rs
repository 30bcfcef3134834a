//! Scripted in-memory transport for engine tests.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use nsslink_frame::{Command, Frame, PacketCodec, DEFAULT_DEVICE_ADDR, DEFAULT_HOST_ADDR};
use nsslink_transport::{Transport, TransportError};

/// Plays back one scripted response per write.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    /// Every buffer handed to `write`.
    pub written: Vec<Bytes>,
    /// Calls to `flush_input`.
    pub flushes: usize,
    responses: VecDeque<Vec<u8>>,
    pending: BytesMut,
    read_chunk: Option<usize>,
    fail_writes: bool,
    short_writes: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the bytes that become readable after the next write.
    /// An empty response is silence.
    pub fn respond(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.responses.push_back(bytes.into());
        self
    }

    /// Bytes already buffered before the first transaction.
    pub fn with_stale(mut self, bytes: &[u8]) -> Self {
        self.pending.extend_from_slice(bytes);
        self
    }

    /// Deliver at most `n` bytes per read.
    pub fn read_chunk(mut self, n: usize) -> Self {
        self.read_chunk = Some(n);
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Accept only half of every buffer.
    pub fn short_writes(mut self) -> Self {
        self.short_writes = true;
        self
    }

    pub fn writes(&self) -> usize {
        self.written.len()
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, data: &[u8]) -> nsslink_transport::Result<usize> {
        if self.fail_writes {
            return Err(TransportError::Closed);
        }
        self.written.push(Bytes::copy_from_slice(data));
        if let Some(response) = self.responses.pop_front() {
            self.pending.extend_from_slice(&response);
        }
        if self.short_writes {
            return Ok(data.len() / 2);
        }
        Ok(data.len())
    }

    fn read_available(&mut self) -> nsslink_transport::Result<Bytes> {
        let n = self.read_chunk.unwrap_or(usize::MAX).min(self.pending.len());
        Ok(self.pending.split_to(n).freeze())
    }

    fn flush_input(&mut self) -> nsslink_transport::Result<()> {
        self.flushes += 1;
        self.pending.clear();
        Ok(())
    }
}

/// Wire bytes of a device reply addressed to the default host.
pub(crate) fn reply(command: Command, payload: &[u8], ack: bool) -> Vec<u8> {
    let frame = Frame::reply(
        command,
        Bytes::copy_from_slice(payload),
        ack,
        DEFAULT_HOST_ADDR,
        DEFAULT_DEVICE_ADDR,
    );
    PacketCodec::new().encode_frame(&frame).to_vec()
}

/// Wire bytes of an ACK reply.
pub(crate) fn ack(command: Command, payload: &[u8]) -> Vec<u8> {
    reply(command, payload, true)
}
