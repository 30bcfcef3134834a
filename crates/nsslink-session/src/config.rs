use std::time::Duration;

use nsslink_frame::{ADDR_MASK, DEFAULT_DEVICE_ADDR, DEFAULT_HOST_ADDR, DEFAULT_MAX_FRAME_LEN};

use crate::error::{Result, SessionError};

/// Default reply deadline per attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10);
/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;
/// Default sleep between transport polls while awaiting a reply.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Transaction engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Reply deadline for each attempt.
    pub timeout: Duration,
    /// Retries after the first attempt for retryable failures.
    pub retries: u32,
    /// Wheel address.
    pub dest_addr: u8,
    /// Our address.
    pub src_addr: u8,
    /// Sleep between reads while awaiting a reply.
    pub poll_interval: Duration,
    /// Largest unstuffed frame the decoder will assemble.
    pub max_frame_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            dest_addr: DEFAULT_DEVICE_ADDR,
            src_addr: DEFAULT_HOST_ADDR,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_addresses(mut self, dest_addr: u8, src_addr: u8) -> Self {
        self.dest_addr = dest_addr;
        self.src_addr = src_addr;
        self
    }

    /// Total attempts per transaction.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dest_addr > ADDR_MASK {
            return Err(SessionError::InvalidConfig(format!(
                "destination address {} exceeds {ADDR_MASK}",
                self.dest_addr
            )));
        }
        if self.src_addr > ADDR_MASK {
            return Err(SessionError::InvalidConfig(format!(
                "source address {} exceeds {ADDR_MASK}",
                self.src_addr
            )));
        }
        if self.timeout.is_zero() {
            return Err(SessionError::InvalidConfig("timeout must be non-zero".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(SessionError::InvalidConfig(
                "poll interval must be non-zero".into(),
            ));
        }
        if self.max_frame_len == 0 {
            return Err(SessionError::InvalidConfig(
                "max frame length must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
