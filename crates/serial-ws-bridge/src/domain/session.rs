//! What a finished relay session reports back to the listener.

use std::fmt;

/// Why a session that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The WebSocket client closed the connection normally.
    ClosedByPeer,
    /// The bridge is shutting down and closed the connection itself.
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::ClosedByPeer => f.write_str("closed by peer"),
            SessionEnd::Shutdown => f.write_str("bridge shutdown"),
        }
    }
}

/// Summary of a session that ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// How the session ended.
    pub end: SessionEnd,
    /// Serial lines forwarded to the WebSocket client.
    pub lines_relayed: u64,
    /// WebSocket messages written to the serial device.
    pub messages_relayed: u64,
    /// Serial lines dropped because they were not valid UTF-8.
    pub lines_dropped: u64,
}

impl SessionReport {
    /// Creates an empty report with the given end reason.
    pub fn new(end: SessionEnd) -> Self {
        Self {
            end,
            lines_relayed: 0,
            messages_relayed: 0,
            lines_dropped: 0,
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} lines out, {} messages in, {} lines dropped)",
            self.end, self.lines_relayed, self.messages_relayed, self.lines_dropped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_has_zero_counters() {
        let report = SessionReport::new(SessionEnd::ClosedByPeer);
        assert_eq!(report.lines_relayed, 0);
        assert_eq!(report.messages_relayed, 0);
        assert_eq!(report.lines_dropped, 0);
    }

    #[test]
    fn test_report_display_includes_counters() {
        let report = SessionReport {
            end: SessionEnd::Shutdown,
            lines_relayed: 3,
            messages_relayed: 2,
            lines_dropped: 1,
        };
        assert_eq!(
            report.to_string(),
            "bridge shutdown (3 lines out, 2 messages in, 1 lines dropped)"
        );
    }
}
