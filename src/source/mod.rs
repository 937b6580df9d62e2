//! Arrival-source collaborator contract.
//!
//! The engine never fetches candidates itself; it consumes an
//! [`ArrivalSource`] — the upstream that produces the arrival stream,
//! scores decisions, and owns run completion/failure. A production
//! implementation wraps a network client (transport retries included);
//! [`SimulatedSource`] samples a synthetic population for tests and demos.
//!
//! ## Contract
//! - `open_run` returns the run handle plus the constraint set and
//!   population statistics for the scenario.
//! - `advance` with `decision = None` is the **peek**: it returns the first
//!   candidate without consuming a decision slot; every later call carries
//!   the decision for the index it names.
//! - A `Failed` status is terminal and carries a human-readable reason.

mod sim;

pub use sim::{SimConfig, SimulatedSource};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{AttributeStatistics, Candidate, Constraint, Scenario};

/// Error returned by an arrival-source implementation.
///
/// Transport retries are the implementation's concern; by the time this
/// error reaches the engine the source's own retry budget is exhausted and
/// the run will be failed.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The transport could not reach the upstream.
    #[error("source transport error: {message}")]
    Transport {
        /// Underlying transport error message.
        message: String,
    },

    /// The upstream answered with something the contract does not allow.
    #[error("source protocol error: {message}")]
    Protocol {
        /// What was malformed.
        message: String,
    },
}

/// Lifecycle status reported by the arrival source per advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceStatus {
    /// More candidates will follow.
    Running,
    /// The run finished successfully upstream.
    Completed,
    /// The run failed upstream; see [`Advance::reason`].
    Failed,
}

/// Result of opening a run against the source.
#[derive(Clone, Debug)]
pub struct RunSetup {
    /// Opaque handle identifying the run upstream.
    pub handle: String,
    /// Per-attribute minimum-count quotas for the scenario.
    pub constraints: Vec<Constraint>,
    /// Population statistics for the scenario.
    pub statistics: AttributeStatistics,
}

/// Result of one advance call.
#[derive(Clone, Debug)]
pub struct Advance {
    /// Upstream run status after this call.
    pub status: SourceStatus,
    /// Authoritative admitted count after this call.
    pub admitted_count: u32,
    /// Authoritative rejected count after this call.
    pub rejected_count: u32,
    /// Next candidate to decide, absent when the run is over.
    pub next_candidate: Option<Candidate>,
    /// Human-readable reason, set when `status` is `Failed`.
    pub reason: Option<String>,
}

/// # Upstream producer of the sequential arrival stream.
///
/// Implementations own the transport (and its retries) and the authority
/// over run completion. The engine calls `advance` strictly in arrival
/// order, one call at a time per run, from inside the run's lock.
#[async_trait]
pub trait ArrivalSource: Send + Sync + 'static {
    /// Opens a new run for the scenario.
    async fn open_run(&self, scenario: Scenario) -> Result<RunSetup, SourceError>;

    /// Reports the decision for `index` and fetches the next candidate.
    ///
    /// The first call per run passes `decision = None` (peek semantics:
    /// returns candidate 0 without consuming a decision slot).
    async fn advance(
        &self,
        handle: &str,
        index: u64,
        decision: Option<bool>,
    ) -> Result<Advance, SourceError>;
}
