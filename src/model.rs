//! # Core data model for admission runs.
//!
//! This module defines the vocabulary shared by the decision engine, the
//! run state machine, and the collaborator traits:
//!
//! - [`Constraint`] — a per-attribute minimum-count quota.
//! - [`AttributeStatistics`] — aggregate statistics about the arrival population.
//! - [`Candidate`] — one arrival, described by a boolean attribute vector.
//! - [`DecisionRecord`] — one immutable ledger entry per decided candidate.
//! - [`RunStatus`] — lifecycle of a run (`Running`/`Paused` live, `Completed`/`Failed` terminal).
//! - [`RunId`] / [`Scenario`] — identifiers for runs and supported scenarios.
//!
//! ## Rules
//! - Ledger entries carry the candidate attributes *as cached at peek time*;
//!   callers never resupply attributes on decide.
//! - Per-attribute admitted counts are derived from the ledger, never stored.

use std::collections::HashMap;
use std::time::SystemTime;

use rand::Rng;

/// Minimum-count quota for one boolean attribute.
///
/// A run is satisfied when, for every constraint, the number of admitted
/// candidates with `attributes[attribute] == true` is at least `min_count`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Attribute identifier, unique within a run.
    pub attribute: String,
    /// Minimum number of admitted candidates that must carry the attribute.
    pub min_count: u32,
}

impl Constraint {
    /// Creates a constraint for `attribute` with the given minimum count.
    pub fn new(attribute: impl Into<String>, min_count: u32) -> Self {
        Self {
            attribute: attribute.into(),
            min_count,
        }
    }
}

/// Aggregate statistics about the remaining arrival population.
///
/// `relative_frequencies` maps each attribute to the probability in `[0, 1]`
/// that a future candidate carries it. `correlations` is carried through for
/// completeness but consulted by no strategy.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeStatistics {
    /// Attribute → probability that a future candidate carries it.
    pub relative_frequencies: HashMap<String, f64>,
    /// Optional attribute-pair correlations (unused by any strategy).
    pub correlations: Option<HashMap<String, HashMap<String, f64>>>,
}

impl AttributeStatistics {
    /// Builds statistics from an iterator of `(attribute, frequency)` pairs.
    pub fn from_frequencies<I, S>(freqs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            relative_frequencies: freqs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            correlations: None,
        }
    }
}

/// One arrival in the sequential admission stream.
///
/// Candidates are produced by the arrival source in strictly increasing
/// index order starting at 0.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    /// Zero-based arrival index.
    pub index: u64,
    /// Boolean attribute vector.
    pub attributes: HashMap<String, bool>,
}

impl Candidate {
    /// Creates a candidate from an index and `(attribute, value)` pairs.
    pub fn new<I, S>(index: u64, attributes: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            index,
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns whether the candidate carries the given attribute.
    pub fn has(&self, attribute: &str) -> bool {
        self.attributes.get(attribute).copied().unwrap_or(false)
    }
}

/// Immutable ledger entry: one per decided candidate.
///
/// The ordered sequence of records for a run is the **ledger**; its index
/// values are exactly `0..N-1`, strictly increasing, no gaps, no repeats.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionRecord {
    /// Arrival index of the decided candidate.
    pub index: u64,
    /// Attribute vector as cached when the candidate was peeked.
    pub attributes: HashMap<String, bool>,
    /// Whether the candidate was admitted.
    pub accepted: bool,
    /// Total admitted count after this decision.
    pub admitted_after: u32,
    /// Total rejected count after this decision.
    pub rejected_after: u32,
    /// Wall-clock timestamp of the commit.
    #[cfg_attr(feature = "serde", serde(skip, default = "SystemTime::now"))]
    pub at: SystemTime,
}

/// Lifecycle status of an admission run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RunStatus {
    /// Accepting steps.
    Running,
    /// Temporarily halted; resumable without touching ledger or pending cache.
    Paused,
    /// Terminal: external failure while advancing. No further transitions.
    Failed,
    /// Terminal: capacity reached (or source exhausted). No further transitions.
    Completed,
}

impl RunStatus {
    /// Returns `true` for [`RunStatus::Completed`] and [`RunStatus::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
        }
    }
}

/// Opaque identifier of one admission run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunId(String);

impl RunId {
    /// Generates a fresh random id (32 hex characters).
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut s = String::with_capacity(32);
        for _ in 0..16 {
            let byte: u8 = rng.random();
            s.push_str(&format!("{byte:02x}"));
        }
        Self(s)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scenario selector understood by the arrival source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scenario(pub u8);

impl Scenario {
    /// Scenarios the upstream source supports.
    pub const SUPPORTED: [u8; 3] = [1, 2, 3];

    /// Returns whether this scenario is in the supported set.
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(&self.0)
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
