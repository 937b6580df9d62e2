//! Error types used by the admission step protocol.
//!
//! [`StepError`] covers every way a step request can be refused:
//!
//! - validation errors (`OutOfSequence`, `PendingMismatch`) — local,
//!   recoverable, leave run state untouched;
//! - `External` / `Store` — the run is moved to terminal `Failed` and
//!   persisted before the error reaches the caller;
//! - `Terminal`, `RunNotFound`, `InvalidScenario` — request-level refusals.
//!
//! The type provides `as_label` / `as_message` helpers for logging, in the
//! same shape the rest of the crate's events use.

use thiserror::Error;

use crate::model::RunStatus;

/// # Errors produced by the step protocol.
///
/// Validation variants never mutate run state; failure variants always
/// leave the run in a persisted terminal state before surfacing.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StepError {
    /// Incoming candidate index violates the strict zero-based ordering.
    #[error("out of sequence: expected index {expected}, got {got}")]
    OutOfSequence {
        /// The only index the ledger would accept next.
        expected: u64,
        /// The index the caller submitted.
        got: u64,
    },

    /// Decision submitted for an index that does not match the cached pending candidate.
    #[error("pending mismatch: pending index {pending:?}, got {got}")]
    PendingMismatch {
        /// Index of the cached pending candidate, if any.
        pending: Option<u64>,
        /// The index the caller submitted.
        got: u64,
    },

    /// Arrival source reported terminal failure; the run is now `Failed`.
    #[error("external failure: {reason}")]
    External {
        /// Human-readable reason from the collaborator.
        reason: String,
    },

    /// Persistence collaborator failed while committing a step; the run is now `Failed`.
    #[error("store failure: {reason}")]
    Store {
        /// Underlying store error message.
        reason: String,
    },

    /// Run creation requested with an unsupported scenario; no run was created.
    #[error("invalid scenario: {scenario}")]
    InvalidScenario {
        /// The rejected scenario number.
        scenario: u8,
    },

    /// The run reached a terminal status; no further operations are accepted.
    #[error("run is terminal ({status:?})")]
    Terminal {
        /// Terminal status the run is in.
        status: RunStatus,
    },

    /// No run with the given id is known.
    #[error("run not found: {run}")]
    RunNotFound {
        /// The unknown run id.
        run: String,
    },
}

impl StepError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use doorman::StepError;
    ///
    /// let err = StepError::OutOfSequence { expected: 3, got: 7 };
    /// assert_eq!(err.as_label(), "out_of_sequence");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StepError::OutOfSequence { .. } => "out_of_sequence",
            StepError::PendingMismatch { .. } => "pending_mismatch",
            StepError::External { .. } => "external_failure",
            StepError::Store { .. } => "store_failure",
            StepError::InvalidScenario { .. } => "invalid_scenario",
            StepError::Terminal { .. } => "run_terminal",
            StepError::RunNotFound { .. } => "run_not_found",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Indicates whether the caller may correct its request and retry.
    ///
    /// Returns `true` for the validation variants, which leave run state
    /// untouched; `false` once the run has failed or finished.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StepError::OutOfSequence { .. } | StepError::PendingMismatch { .. }
        )
    }
}
