//! # Per-run mutable state and its transition rules.
//!
//! [`RunState`] is the single mutable record of one admission run: status,
//! counts, the append-only decision ledger, the cached pending candidate,
//! and the constraint set / statistics supplied at run start.
//!
//! ## Rules
//! - State is advanced **only** through the validated step protocol
//!   ([`RunState::validate_decide`] → [`RunState::commit_decision`]);
//!   callers hold the run's lock for the whole sequence.
//! - Ledger entries always carry the attributes cached at peek time.
//! - `Completed` and `Failed` are terminal; nothing mutates a terminal run.
//! - `pause`/`resume` flip `Paused`↔`Running` and touch nothing else.
//! - Per-attribute admitted counts are recomputed from the ledger on
//!   demand, so a recovered process needs no separate bookkeeping.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::error::StepError;
use crate::model::{
    AttributeStatistics, Candidate, Constraint, DecisionRecord, RunId, RunStatus, Scenario,
};

use super::sequence::validate_sequence;

/// Read-only snapshot of a run, as handed to the persistence collaborator
/// after every successful step.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSnapshot {
    /// Run identifier.
    pub id: RunId,
    /// Scenario the run was opened with.
    pub scenario: Scenario,
    /// Current status.
    pub status: RunStatus,
    /// Total admitted count.
    pub admitted_count: u32,
    /// Total rejected count.
    pub rejected_count: u32,
    /// Admissions required to complete the run.
    pub capacity: u32,
    /// Constraint set supplied at run start.
    pub constraints: Vec<Constraint>,
    /// Statistics supplied at run start.
    pub statistics: AttributeStatistics,
    /// Cached pending candidate awaiting a decision, if any.
    pub pending: Option<Candidate>,
    /// Collaborator-supplied reason, set when `status` is `Failed`.
    pub failure_reason: Option<String>,
}

/// Mutable state of one admission run.
///
/// Created `Running` with an empty ledger and no pending candidate; reaches
/// exactly one terminal state and is never mutated thereafter.
#[derive(Debug)]
pub struct RunState {
    id: RunId,
    scenario: Scenario,
    /// Opaque handle the arrival source issued for this run.
    handle: String,
    capacity: u32,
    constraints: Vec<Constraint>,
    statistics: AttributeStatistics,
    status: RunStatus,
    admitted_count: u32,
    rejected_count: u32,
    ledger: Vec<DecisionRecord>,
    pending: Option<Candidate>,
    /// Reason reported by the collaborator if the run failed.
    failure_reason: Option<String>,
}

impl RunState {
    /// Creates a fresh running state with an empty ledger.
    pub fn new(
        id: RunId,
        scenario: Scenario,
        handle: impl Into<String>,
        capacity: u32,
        constraints: Vec<Constraint>,
        statistics: AttributeStatistics,
    ) -> Self {
        Self {
            id,
            scenario,
            handle: handle.into(),
            capacity,
            constraints,
            statistics,
            status: RunStatus::Running,
            admitted_count: 0,
            rejected_count: 0,
            ledger: Vec::new(),
            pending: None,
            failure_reason: None,
        }
    }

    /// Returns the run identifier.
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// Returns the arrival-source handle for this run.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Returns the current status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the required capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the constraint set.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the population statistics.
    pub fn statistics(&self) -> &AttributeStatistics {
        &self.statistics
    }

    /// Returns the total admitted count.
    pub fn admitted_count(&self) -> u32 {
        self.admitted_count
    }

    /// Returns the total rejected count.
    pub fn rejected_count(&self) -> u32 {
        self.rejected_count
    }

    /// Returns the cached pending candidate, if any.
    pub fn pending(&self) -> Option<&Candidate> {
        self.pending.as_ref()
    }

    /// Returns the decision ledger in arrival order.
    pub fn ledger(&self) -> &[DecisionRecord] {
        &self.ledger
    }

    /// Returns the collaborator's failure reason, if the run failed.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Index of the last decided candidate, if any.
    pub fn last_index(&self) -> Option<u64> {
        self.ledger.last().map(|r| r.index)
    }

    /// Per-attribute accepted counts, derived from the ledger.
    ///
    /// Counts every `true` attribute of every accepted record; recomputable
    /// at any time, which is what makes crash recovery bookkeeping-free.
    pub fn admitted_by_attribute(&self) -> HashMap<String, u32> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for record in self.ledger.iter().filter(|r| r.accepted) {
            for (attr, set) in &record.attributes {
                if *set {
                    *counts.entry(attr.clone()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Refuses any operation on a terminal run.
    pub fn ensure_not_terminal(&self) -> Result<(), StepError> {
        if self.status.is_terminal() {
            return Err(StepError::Terminal {
                status: self.status,
            });
        }
        Ok(())
    }

    /// Validates that a first peek is admissible.
    ///
    /// A peek is the very first operation of a run: empty ledger, no
    /// pending candidate. A re-peek while the first candidate is still
    /// pending is allowed (idempotent retry before any decision commits);
    /// anything later fails with [`StepError::PendingMismatch`].
    pub fn validate_peek(&self) -> Result<(), StepError> {
        self.ensure_not_terminal()?;
        if !self.ledger.is_empty() {
            return Err(StepError::PendingMismatch {
                pending: self.pending.as_ref().map(|c| c.index),
                got: 0,
            });
        }
        Ok(())
    }

    /// Validates a decision request for the given index.
    ///
    /// Checks, in order: the run is not terminal, the index matches the
    /// cached pending candidate, and the index extends the ledger sequence.
    /// No state is mutated on failure.
    pub fn validate_decide(&self, index: u64) -> Result<(), StepError> {
        self.ensure_not_terminal()?;
        match &self.pending {
            Some(p) if p.index == index => {}
            other => {
                return Err(StepError::PendingMismatch {
                    pending: other.as_ref().map(|c| c.index),
                    got: index,
                });
            }
        }
        validate_sequence(self.last_index(), index)
    }

    /// Caches the first candidate produced by a peek.
    pub fn cache_pending(&mut self, candidate: Candidate) {
        self.pending = Some(candidate);
    }

    /// Commits one validated decision.
    ///
    /// Takes the cached pending candidate (its attributes are
    /// authoritative), appends the ledger record, adopts the
    /// collaborator-reported counts, caches the next candidate, and
    /// finalizes status: `Completed` once admitted reaches capacity or the
    /// source runs out of candidates, untouched otherwise.
    ///
    /// Callers must have passed [`RunState::validate_decide`] first; a
    /// commit without a pending candidate fails with `PendingMismatch`.
    pub fn commit_decision(
        &mut self,
        accepted: bool,
        admitted_count: u32,
        rejected_count: u32,
        next: Option<Candidate>,
        source_completed: bool,
    ) -> Result<DecisionRecord, StepError> {
        let pending = self.pending.take().ok_or(StepError::PendingMismatch {
            pending: None,
            got: self.last_index().map_or(0, |i| i + 1),
        })?;

        self.admitted_count = admitted_count;
        self.rejected_count = rejected_count;

        let record = DecisionRecord {
            index: pending.index,
            attributes: pending.attributes,
            accepted,
            admitted_after: admitted_count,
            rejected_after: rejected_count,
            at: SystemTime::now(),
        };
        self.ledger.push(record.clone());

        if source_completed || self.admitted_count >= self.capacity || next.is_none() {
            self.status = RunStatus::Completed;
            self.pending = None;
        } else {
            self.pending = next;
        }
        Ok(record)
    }

    /// Moves the run to terminal `Failed`, clearing the pending slot.
    ///
    /// Counts passed by the collaborator (if any) are adopted so the final
    /// snapshot reflects its last word.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        admitted_count: Option<u32>,
        rejected_count: Option<u32>,
    ) {
        if let Some(a) = admitted_count {
            self.admitted_count = a;
        }
        if let Some(r) = rejected_count {
            self.rejected_count = r;
        }
        self.status = RunStatus::Failed;
        self.pending = None;
        self.failure_reason = Some(reason.into());
    }

    /// Marks the run completed without a decision (source exhausted on peek).
    pub fn complete(&mut self, admitted_count: u32, rejected_count: u32) {
        self.admitted_count = admitted_count;
        self.rejected_count = rejected_count;
        self.status = RunStatus::Completed;
        self.pending = None;
    }

    /// Flips `Running` → `Paused`. Ledger, counts, and pending are untouched.
    pub fn pause(&mut self) -> Result<(), StepError> {
        self.ensure_not_terminal()?;
        self.status = RunStatus::Paused;
        Ok(())
    }

    /// Flips `Paused` → `Running`. Ledger, counts, and pending are untouched.
    pub fn resume(&mut self) -> Result<(), StepError> {
        self.ensure_not_terminal()?;
        self.status = RunStatus::Running;
        Ok(())
    }

    /// Builds the snapshot handed to the persistence collaborator.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            id: self.id.clone(),
            scenario: self.scenario,
            status: self.status,
            admitted_count: self.admitted_count,
            rejected_count: self.rejected_count,
            capacity: self.capacity,
            constraints: self.constraints.clone(),
            statistics: self.statistics.clone(),
            pending: self.pending.clone(),
            failure_reason: self.failure_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Candidate;

    fn fresh() -> RunState {
        RunState::new(
            RunId::from("run-1"),
            Scenario(1),
            "game-1",
            3,
            vec![Constraint::new("vip", 2)],
            AttributeStatistics::from_frequencies([("vip", 0.5)]),
        )
    }

    #[test]
    fn test_fresh_run_shape() {
        let state = fresh();
        assert_eq!(state.status(), RunStatus::Running);
        assert!(state.ledger().is_empty());
        assert!(state.pending().is_none());
        assert_eq!(state.last_index(), None);
    }

    #[test]
    fn test_peek_valid_only_before_first_decision() {
        let mut state = fresh();
        assert!(state.validate_peek().is_ok());

        state.cache_pending(Candidate::new(0, [("vip", true)]));
        // Re-peek while the first candidate is still pending is idempotent.
        assert!(state.validate_peek().is_ok());

        state.commit_decision(true, 1, 0, Some(Candidate::new(1, [("vip", false)])), false).unwrap();
        assert!(matches!(
            state.validate_peek(),
            Err(StepError::PendingMismatch { .. })
        ));
    }

    #[test]
    fn test_decide_requires_matching_pending() {
        let mut state = fresh();
        state.cache_pending(Candidate::new(0, [("vip", true)]));
        assert!(state.validate_decide(0).is_ok());
        assert!(matches!(
            state.validate_decide(1),
            Err(StepError::PendingMismatch {
                pending: Some(0),
                got: 1
            })
        ));
    }

    #[test]
    fn test_commit_uses_cached_attributes_and_advances_pending() {
        let mut state = fresh();
        state.cache_pending(Candidate::new(0, [("vip", true)]));

        let record =
            state.commit_decision(true, 1, 0, Some(Candidate::new(1, [("vip", false)])), false).unwrap();
        assert_eq!(record.index, 0);
        assert!(record.accepted);
        assert_eq!(record.attributes.get("vip"), Some(&true));

        assert_eq!(state.admitted_count(), 1);
        assert_eq!(state.pending().map(|c| c.index), Some(1));
        assert_eq!(state.last_index(), Some(0));
        assert_eq!(state.status(), RunStatus::Running);
    }

    #[test]
    fn test_completion_at_capacity() {
        let mut state = fresh();
        state.cache_pending(Candidate::new(0, [("vip", true)]));
        state.commit_decision(true, 1, 0, Some(Candidate::new(1, [("vip", true)])), false).unwrap();
        state.commit_decision(true, 2, 0, Some(Candidate::new(2, [("vip", true)])), false).unwrap();
        state.commit_decision(true, 3, 0, Some(Candidate::new(3, [("vip", true)])), false).unwrap();

        assert_eq!(state.status(), RunStatus::Completed);
        assert!(state.pending().is_none());
        assert!(state.validate_decide(3).is_err());
    }

    #[test]
    fn test_completion_when_source_exhausted() {
        let mut state = fresh();
        state.cache_pending(Candidate::new(0, [("vip", false)]));
        state.commit_decision(false, 0, 1, None, false).unwrap();
        assert_eq!(state.status(), RunStatus::Completed);
    }

    #[test]
    fn test_fail_is_terminal_and_clears_pending() {
        let mut state = fresh();
        state.cache_pending(Candidate::new(0, [("vip", true)]));
        state.fail("upstream gone", Some(0), Some(5));

        assert_eq!(state.status(), RunStatus::Failed);
        assert!(state.pending().is_none());
        assert_eq!(state.rejected_count(), 5);
        assert_eq!(state.failure_reason(), Some("upstream gone"));
        assert!(state.pause().is_err());
        assert!(state.resume().is_err());
        assert!(state.validate_decide(0).is_err());
    }

    #[test]
    fn test_pause_resume_touch_only_status() {
        let mut state = fresh();
        state.cache_pending(Candidate::new(0, [("vip", true)]));
        state.commit_decision(true, 1, 0, Some(Candidate::new(1, [("vip", false)])), false).unwrap();

        state.pause().unwrap();
        assert_eq!(state.status(), RunStatus::Paused);
        assert_eq!(state.ledger().len(), 1);
        assert_eq!(state.admitted_count(), 1);
        assert_eq!(state.pending().map(|c| c.index), Some(1));

        state.resume().unwrap();
        assert_eq!(state.status(), RunStatus::Running);
    }

    #[test]
    fn test_admitted_by_attribute_derived_from_ledger() {
        let mut state = RunState::new(
            RunId::from("run-2"),
            Scenario(1),
            "game-2",
            10,
            vec![Constraint::new("a", 5), Constraint::new("b", 5)],
            AttributeStatistics::default(),
        );
        state.cache_pending(Candidate::new(0, [("a", true), ("b", false)]));
        state.commit_decision(
            true,
            1,
            0,
            Some(Candidate::new(1, [("a", true), ("b", true)])),
            false,
        ).unwrap();
        state.commit_decision(
            true,
            2,
            0,
            Some(Candidate::new(2, [("a", false), ("b", true)])),
            false,
        ).unwrap();
        // Rejected candidate must not count.
        state.commit_decision(false, 2, 1, Some(Candidate::new(3, [("a", true)])), false).unwrap();

        let counts = state.admitted_by_attribute();
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
    }

    #[test]
    fn test_ledger_indices_are_gapless() {
        let mut state = RunState::new(
            RunId::from("run-3"),
            Scenario(2),
            "game-3",
            100,
            vec![],
            AttributeStatistics::default(),
        );
        state.cache_pending(Candidate::new(0, [("x", true)]));
        for i in 0..10u64 {
            state.validate_decide(i).unwrap();
            state.commit_decision(
                i % 2 == 0,
                ((i / 2) + 1) as u32,
                ((i + 1) / 2) as u32,
                Some(Candidate::new(i + 1, [("x", true)])),
                false,
            ).unwrap();
        }
        let indices: Vec<u64> = state.ledger().iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
    }
}
