//! SLIP byte stuffing (RFC 1055 delimiters).
//!
//! Every encoded frame starts and ends with [`END`], so a receiver joining
//! mid-stream resynchronizes at the next delimiter.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

/// Frame delimiter.
pub const END: u8 = 0xC0;
/// Escape introducer.
pub const ESC: u8 = 0xDB;
/// Escaped form of [`END`] (follows [`ESC`]).
pub const ESC_END: u8 = 0xDC;
/// Escaped form of [`ESC`] (follows [`ESC`]).
pub const ESC_ESC: u8 = 0xDD;

/// Default cap on a partial frame held by [`SlipDecoder`].
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// Byte-stuff `payload` into `dst`, wrapped in delimiters.
pub fn encode_into(payload: &[u8], dst: &mut BytesMut) {
    dst.reserve(payload.len() + 2);
    dst.put_u8(END);
    for &byte in payload {
        match byte {
            END => dst.put_slice(&[ESC, ESC_END]),
            ESC => dst.put_slice(&[ESC, ESC_ESC]),
            _ => dst.put_u8(byte),
        }
    }
    dst.put_u8(END);
}

/// Byte-stuff `payload` into a new buffer.
pub fn encode(payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(payload.len() + 2);
    encode_into(payload, &mut dst);
    dst.freeze()
}

/// Decode every delimited frame in `data`.
///
/// Bytes after the last delimiter are an unterminated frame and are dropped.
pub fn decode(data: &[u8]) -> Vec<Bytes> {
    SlipDecoder::new().feed(data)
}

/// Incremental SLIP decoder.
///
/// Feed it chunks exactly as they arrive from the link; a partial frame is
/// kept across calls until its closing delimiter shows up.
#[derive(Debug)]
pub struct SlipDecoder {
    buf: BytesMut,
    escape_pending: bool,
    discarding: bool,
    max_frame_len: usize,
}

impl Default for SlipDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlipDecoder {
    /// Create a decoder with [`DEFAULT_MAX_FRAME_LEN`].
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Create a decoder that abandons partial frames longer than `max_frame_len`.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(max_frame_len.min(DEFAULT_MAX_FRAME_LEN)),
            escape_pending: false,
            discarding: false,
            max_frame_len,
        }
    }

    /// Consume `chunk` and return the frames it completed, in order.
    ///
    /// Empty frames (back-to-back delimiters) are never emitted.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut frames = Vec::new();

        for &byte in chunk {
            if self.discarding {
                if byte == END {
                    self.discarding = false;
                }
                continue;
            }

            if self.escape_pending {
                self.escape_pending = false;
                match byte {
                    ESC_END => self.push(END),
                    ESC_ESC => self.push(ESC),
                    // Corrupt escape: keep both bytes rather than guess.
                    other => {
                        self.push(ESC);
                        self.push(other);
                    }
                }
                continue;
            }

            match byte {
                ESC => self.escape_pending = true,
                END => {
                    if !self.buf.is_empty() {
                        frames.push(self.buf.split().freeze());
                    }
                }
                other => self.push(other),
            }
        }

        frames
    }

    /// Drop any partial frame and pending escape.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.escape_pending = false;
        self.discarding = false;
    }

    /// Bytes held for the frame currently being assembled.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// True when no partial frame or escape is held.
    pub fn is_idle(&self) -> bool {
        self.buf.is_empty() && !self.escape_pending && !self.discarding
    }

    fn push(&mut self, byte: u8) {
        if self.discarding {
            return;
        }
        if self.buf.len() >= self.max_frame_len {
            warn!(
                max = self.max_frame_len,
                "partial frame exceeds limit, skipping to next delimiter"
            );
            self.buf.clear();
            self.discarding = true;
            return;
        }
        self.buf.put_u8(byte);
    }
}
