//! Relay session state machine.
//!
//! ```text
//!   Idle ──► Opening ──► Relaying ──► Closing ──► Closed
//!               │                        ▲
//!               └────── open failed ─────┘
//! ```
//!
//! `Closing → Closed` is unconditional: whichever way `Relaying` (or
//! `Opening`) was left, the serial link is released before the session is
//! reported as closed.

use std::fmt;

/// Where a relay session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Created, nothing opened yet.
    Idle,
    /// Opening the serial device.
    Opening,
    /// Moving data in both directions.
    Relaying,
    /// Releasing the serial device.
    Closing,
    /// Finished; the serial device is closed.
    Closed,
}

impl RelayState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: RelayState) -> bool {
        use RelayState::*;
        matches!(
            (self, next),
            (Idle, Opening)
                | (Opening, Relaying)
                | (Opening, Closing)
                | (Relaying, Closing)
                | (Closing, Closed)
        )
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelayState::Idle => "idle",
            RelayState::Opening => "opening",
            RelayState::Relaying => "relaying",
            RelayState::Closing => "closing",
            RelayState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::RelayState::*;
    use super::*;

    #[test]
    fn test_happy_path_transitions_are_legal() {
        assert!(Idle.can_transition_to(Opening));
        assert!(Opening.can_transition_to(Relaying));
        assert!(Relaying.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Closed));
    }

    #[test]
    fn test_open_failure_skips_relaying() {
        assert!(Opening.can_transition_to(Closing));
    }

    #[test]
    fn test_cannot_skip_closing() {
        assert!(!Relaying.can_transition_to(Closed));
        assert!(!Opening.can_transition_to(Closed));
    }

    #[test]
    fn test_closed_has_no_outgoing_transitions() {
        for next in [Idle, Opening, Relaying, Closing, Closed] {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_display_is_lowercase_name() {
        assert_eq!(Relaying.to_string(), "relaying");
    }
}
