use std::fmt;

use serde::Serialize;

/// Link counters for one session.
///
/// Counters only grow; a fresh session starts from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Request frames written, one per attempt.
    pub frames_tx: u64,
    /// Replies that passed the checksum and header checks.
    pub frames_rx: u64,
    pub crc_errors: u64,
    pub framing_errors: u64,
    /// Attempts that ended without a complete frame.
    pub timeouts: u64,
    pub nacks: u64,
}

impl SessionStats {
    /// Attempts that did not produce a usable reply.
    pub fn errors(&self) -> u64 {
        self.crc_errors + self.framing_errors + self.timeouts + self.nacks
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx={} rx={} crc_errors={} framing_errors={} timeouts={} nacks={}",
            self.frames_tx,
            self.frames_rx,
            self.crc_errors,
            self.framing_errors,
            self.timeouts,
            self.nacks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_all_counters() {
        let stats = SessionStats {
            frames_tx: 3,
            timeouts: 3,
            ..SessionStats::default()
        };
        let json = serde_json::to_value(stats).expect("stats should serialize");
        assert_eq!(json["frames_tx"], 3);
        assert_eq!(json["timeouts"], 3);
        assert_eq!(json["nacks"], 0);
        assert_eq!(stats.errors(), 3);
    }
}
