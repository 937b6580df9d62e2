//! Persistence collaborator contract.
//!
//! The engine never persists anything itself; after every successful step
//! it hands the updated [`RunSnapshot`](crate::run::RunSnapshot) and the
//! freshly committed [`DecisionRecord`](crate::model::DecisionRecord) to a
//! [`RunStore`]. The store owns its own atomicity; the engine assumes
//! at-most-one committed record per candidate index.
//!
//! A crash between the arrival-source call and persistence is recovered by
//! replaying the same candidate index against the persisted pending cache.
//!
//! ## Contents
//! - [`RunStore`] the async persistence trait
//! - [`MemoryStore`] an in-memory implementation for tests and embedding

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{DecisionRecord, RunId};
use crate::run::RunSnapshot;

/// Error returned by a store implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not complete the operation.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Underlying store error message.
        message: String,
    },
}

/// # Durable record of runs and their ledgers.
///
/// Implementations must make `save` + `append` atomic per step from the
/// reader's point of view; the engine calls them in that order, inside the
/// run's lock, before the step result reaches the caller.
#[async_trait]
pub trait RunStore: Send + Sync + 'static {
    /// Persists the run snapshot (counts, status, pending cache).
    async fn save(&self, snapshot: &RunSnapshot) -> Result<(), StoreError>;

    /// Appends one committed decision to the run's ledger.
    async fn append(&self, run: &RunId, record: &DecisionRecord) -> Result<(), StoreError>;

    /// Loads the last persisted snapshot, if the run is known.
    async fn load(&self, run: &RunId) -> Result<Option<RunSnapshot>, StoreError>;

    /// Returns a page of the persisted ledger in arrival order.
    async fn records(
        &self,
        run: &RunId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, StoreError>;
}
