//! Per-context capture session.
//!
//! States: `Idle` -> `Capturing` -> `Stopped`, with `begin()` allowed again
//! from `Stopped`. The session owns the ordered entry list, the cumulative
//! serialized-byte counter, and the completeness latch.

use crate::chain::LogChain;
use crate::entry::CaptureEntry;
use glcap_core::{CaptureLimits, Hash, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Never started
    Idle,
    /// Recording every intercepted call
    Capturing,
    /// Ended; behaves as idle
    Stopped,
}

/// Recording state for one captured context
#[derive(Debug, Clone)]
pub struct CaptureSession {
    state: SessionState,
    entries: Vec<CaptureEntry>,
    chain: LogChain,
    limits: CaptureLimits,
    serialized_bytes: u64,
    all_serialized: bool,
    last_was_yield: bool,
    deadline: Option<Timestamp>,
}

impl CaptureSession {
    /// Create an idle session with the given budget
    #[must_use]
    pub fn new(limits: CaptureLimits) -> Self {
        Self {
            state: SessionState::Idle,
            entries: Vec::new(),
            chain: LogChain::new(),
            limits,
            serialized_bytes: 0,
            all_serialized: true,
            last_was_yield: false,
            deadline: None,
        }
    }

    /// Start capturing. Repeating it while capturing has no effect.
    pub fn begin(&mut self) {
        if self.state != SessionState::Capturing {
            debug!(entries = self.entries.len(), "capture begin");
        }
        self.state = SessionState::Capturing;
    }

    /// Stop capturing. Always safe.
    pub fn end(&mut self) {
        if self.state == SessionState::Capturing {
            debug!(entries = self.entries.len(), "capture end");
            self.state = SessionState::Stopped;
        }
        self.deadline = None;
    }

    /// Capture for `duration` starting at `now`; the end fires from [`Self::poll`]
    pub fn period(&mut self, duration: Duration, now: Timestamp) {
        self.begin();
        self.deadline = Some(now.saturating_add(duration));
        debug!(?duration, "capture period scheduled");
    }

    /// Fire a due scheduled end. Returns `true` if the session ended.
    pub fn poll(&mut self, now: Timestamp) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.end();
                true
            }
            _ => false,
        }
    }

    /// Append an entry if capturing. Returns whether it was appended.
    pub fn append(&mut self, entry: CaptureEntry) -> bool {
        if !self.is_capturing() {
            return false;
        }
        self.last_was_yield = entry.is_yield();
        self.chain.push(&entry.digest_bytes());
        self.entries.push(entry);
        true
    }

    /// Append a frame boundary, collapsing consecutive boundaries into one
    pub fn add_yield(&mut self) -> bool {
        if !self.is_capturing() || self.last_was_yield {
            return false;
        }
        self.append(CaptureEntry::Yield)
    }

    /// Append a debug annotation if capturing
    pub fn add_debug_info(&mut self, text: impl Into<String>) -> bool {
        self.append(CaptureEntry::Debug(text.into()))
    }

    /// Whether a payload of `len` must be replaced by a placeholder
    #[must_use]
    pub const fn over_budget(&self, len: u64) -> bool {
        self.limits.exceeds(self.serialized_bytes, len)
    }

    /// Account serialized text added to the artifact
    pub fn add_serialized(&mut self, bytes: u64) {
        self.serialized_bytes = self.serialized_bytes.saturating_add(bytes);
    }

    /// Latch the session as not fully captured
    pub fn mark_incomplete(&mut self) {
        if self.all_serialized {
            warn!(
                serialized_bytes = self.serialized_bytes,
                max_serialize_size = self.limits.max_serialize_size,
                "serialization budget exceeded, substituting placeholders"
            );
        }
        self.all_serialized = false;
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether calls are being recorded
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.state == SessionState::Capturing
    }

    /// Whether the session is not capturing
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        !self.is_capturing()
    }

    /// Recorded entries in call order
    #[must_use]
    pub fn entries(&self) -> &[CaptureEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cumulative serialized text in bytes
    #[must_use]
    pub const fn serialized_bytes(&self) -> u64 {
        self.serialized_bytes
    }

    /// Whether every payload was serialized in full
    #[must_use]
    pub const fn all_serialized(&self) -> bool {
        self.all_serialized
    }

    /// Budget in force
    #[must_use]
    pub const fn limits(&self) -> CaptureLimits {
        self.limits
    }

    /// Pending scheduled end
    #[must_use]
    pub const fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Digest over every entry in order
    #[must_use]
    pub const fn digest(&self) -> Hash {
        self.chain.tip()
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(CaptureLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn call(text: &str) -> CaptureEntry {
        CaptureEntry::Call(text.to_string())
    }

    #[test]
    fn test_initial_state() {
        let session = CaptureSession::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.is_stopped());
        assert!(session.all_serialized());
        assert!(session.is_empty());
    }

    #[test]
    fn test_append_only_while_capturing() {
        let mut session = CaptureSession::default();
        assert!(!session.append(call("gl.flush();")));
        session.begin();
        assert!(session.append(call("gl.flush();")));
        session.end();
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!session.append(call("gl.finish();")));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_begin_again_after_stop() {
        let mut session = CaptureSession::default();
        session.begin();
        session.end();
        session.begin();
        assert!(session.is_capturing());
    }

    #[test]
    fn test_yield_collapses() {
        let mut session = CaptureSession::default();
        session.begin();
        assert!(session.add_yield());
        assert!(!session.add_yield());
        session.append(call("gl.flush();"));
        assert!(session.add_yield());
        let yields = session.entries().iter().filter(|e| e.is_yield()).count();
        assert_eq!(yields, 2);
    }

    #[test]
    fn test_yield_ignored_when_idle() {
        let mut session = CaptureSession::default();
        assert!(!session.add_yield());
        assert!(!session.add_debug_info("x"));
        assert!(session.is_empty());
    }

    #[test]
    fn test_debug_info_resets_yield_collapse() {
        let mut session = CaptureSession::default();
        session.begin();
        session.add_yield();
        session.add_debug_info("marker");
        assert!(session.add_yield());
    }

    #[test]
    fn test_period_ends_on_poll() {
        let mut session = CaptureSession::default();
        let start = Timestamp::from_millis(1000);
        session.period(Duration::from_millis(500), start);
        assert!(session.is_capturing());
        assert!(!session.poll(Timestamp::from_millis(1499)));
        assert!(session.poll(Timestamp::from_millis(1500)));
        assert!(session.is_stopped());
        assert_eq!(session.deadline(), None);
    }

    #[test]
    fn test_end_clears_deadline() {
        let mut session = CaptureSession::default();
        session.period(Duration::from_secs(1), Timestamp::zero());
        session.end();
        assert!(!session.poll(Timestamp::from_millis(5000)));
    }

    #[test]
    fn test_budget_and_latch() {
        let limits = CaptureLimits::default()
            .with_max_serialize_size(10)
            .with_max_array_size(100);
        let mut session = CaptureSession::new(limits);
        assert!(!session.over_budget(50));
        assert!(session.over_budget(101));
        session.add_serialized(11);
        assert!(session.over_budget(1));
        session.mark_incomplete();
        session.mark_incomplete();
        assert!(!session.all_serialized());
    }

    #[test]
    fn test_digest_tracks_entries() {
        let mut a = CaptureSession::default();
        let mut b = CaptureSession::default();
        a.begin();
        b.begin();
        a.append(call("gl.flush();"));
        assert_ne!(a.digest(), b.digest());
        b.append(call("gl.flush();"));
        assert_eq!(a.digest(), b.digest());
    }

    proptest! {
        #[test]
        fn prop_no_adjacent_yields(ops in proptest::collection::vec(0u8..3, 0..64)) {
            let mut session = CaptureSession::default();
            session.begin();
            for op in ops {
                match op {
                    0 => { session.add_yield(); }
                    1 => { session.append(call("gl.flush();")); }
                    _ => { session.add_debug_info("d"); }
                }
            }
            let entries = session.entries();
            for pair in entries.windows(2) {
                prop_assert!(!(pair[0].is_yield() && pair[1].is_yield()));
            }
        }

        #[test]
        fn prop_serialized_bytes_monotonic(adds in proptest::collection::vec(0u64..1_000_000, 0..32)) {
            let mut session = CaptureSession::default();
            let mut last = 0;
            for add in adds {
                session.add_serialized(add);
                prop_assert!(session.serialized_bytes() >= last);
                last = session.serialized_bytes();
            }
        }
    }
}
