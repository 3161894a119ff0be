//! Per-session request sequencing.
//!
//! Every fetch is stamped with the next sequence number of the session that
//! issued it. A response is applied only while its stamp is still the latest
//! one issued for the active session; starting a new session makes every
//! earlier stamp stale at once.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    active: Option<SessionId>,
    latest: u64,
    next_session: u64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session with its counter at 0, superseding the previous one.
    pub fn begin_session(&mut self) -> SessionId {
        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.active = Some(session);
        self.latest = 0;
        session
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    /// Issue the next sequence number for `session`.
    ///
    /// Numbers are only meaningful for the active session; a request for any
    /// other session gets 0, which is never fresh.
    pub fn next_sequence(&mut self, session: SessionId) -> u64 {
        if self.active != Some(session) {
            return 0;
        }
        self.latest += 1;
        self.latest
    }

    pub fn is_fresh(&self, session: SessionId, sequence: u64) -> bool {
        self.active == Some(session) && sequence != 0 && sequence == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let mut sequencer = RequestSequencer::new();
        let session = sequencer.begin_session();

        let first = sequencer.next_sequence(session);
        let second = sequencer.next_sequence(session);

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert!(!sequencer.is_fresh(session, first));
        assert!(sequencer.is_fresh(session, second));
    }

    #[test]
    fn test_new_session_invalidates_previous() {
        let mut sequencer = RequestSequencer::new();
        let old = sequencer.begin_session();
        let seq = sequencer.next_sequence(old);

        let new = sequencer.begin_session();
        assert_ne!(old, new);
        assert!(!sequencer.is_fresh(old, seq));

        // Counter restarts for the new session
        assert_eq!(sequencer.next_sequence(new), 1);
        assert!(!sequencer.is_fresh(old, 1));
        assert!(sequencer.is_fresh(new, 1));
    }

    #[test]
    fn test_nothing_is_fresh_before_first_issue() {
        let mut sequencer = RequestSequencer::new();
        let session = sequencer.begin_session();
        assert!(!sequencer.is_fresh(session, 0));
        assert_eq!(sequencer.next_sequence(SessionId(99)), 0);
    }
}
