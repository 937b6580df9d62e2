//! # Run-lifecycle events emitted by the gatekeeper.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Run management**: open, pause, resume
//! - **Step flow**: candidate peeked, decision committed
//! - **Terminal**: run completed, run failed
//!
//! The [`Event`] struct carries optional metadata such as the run id, the
//! candidate index, the decision, and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use doorman::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DecisionCommitted)
//!     .with_run("run-1")
//!     .with_index(41)
//!     .with_accepted(true);
//!
//! assert_eq!(ev.kind, EventKind::DecisionCommitted);
//! assert_eq!(ev.run.as_deref(), Some("run-1"));
//! assert_eq!(ev.accepted, Some(true));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of run-lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Run management ===
    /// A run was opened against the arrival source.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RunOpened,

    /// Run paused; ledger, counts, and pending candidate untouched.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `at`, `seq`
    RunPaused,

    /// Run resumed after a pause.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `at`, `seq`
    RunResumed,

    // === Step flow ===
    /// First candidate fetched and cached as pending.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `index`: candidate index (always 0)
    /// - `at`, `seq`
    CandidatePeeked,

    /// A decision was committed to the ledger.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `index`: decided candidate index
    /// - `accepted`: the decision
    /// - `at`, `seq`
    DecisionCommitted,

    // === Terminal ===
    /// Run reached capacity or the source ran out of candidates.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `at`, `seq`
    RunCompleted,

    /// Run failed terminally (external or store failure).
    ///
    /// Sets:
    /// - `run`: run id
    /// - `reason`: collaborator-supplied failure reason
    /// - `at`, `seq`
    RunFailed,
}

/// Run-lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Run id, if applicable.
    pub run: Option<Arc<str>>,
    /// Candidate index, for step-flow events.
    pub index: Option<u64>,
    /// Committed decision, for [`EventKind::DecisionCommitted`].
    pub accepted: Option<bool>,
    /// Human-readable reason (failures).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            run: None,
            index: None,
            accepted: None,
            reason: None,
        }
    }

    /// Attaches a run id.
    #[inline]
    pub fn with_run(mut self, run: impl Into<Arc<str>>) -> Self {
        self.run = Some(run.into());
        self
    }

    /// Attaches a candidate index.
    #[inline]
    pub fn with_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    /// Attaches a committed decision.
    #[inline]
    pub fn with_accepted(mut self, accepted: bool) -> Self {
        self.accepted = Some(accepted);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns whether the event marks a terminal run state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::RunCompleted | EventKind::RunFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::RunOpened);
        let b = Event::new(EventKind::RunOpened);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::RunFailed)
            .with_run("r")
            .with_index(3)
            .with_reason("boom");
        assert_eq!(ev.run.as_deref(), Some("r"));
        assert_eq!(ev.index, Some(3));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert!(ev.is_terminal());
        assert!(!Event::new(EventKind::RunPaused).is_terminal());
    }
}
