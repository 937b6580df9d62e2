//! # Per-run lock registry.
//!
//! Each active run is represented by one `Arc<tokio::sync::Mutex<RunState>>`.
//! Holding the mutex serializes the whole validate → decide → external-call
//! → state-update sequence for that run; unrelated runs proceed fully in
//! parallel.
//!
//! ## Rules
//! - Registration is a get-or-create on a shared map, double-checked under
//!   the write lock, so a racing duplicate registration for the same id
//!   never produces two lock objects.
//! - Entries are **evicted once the run reaches a terminal state**; a
//!   long-lived multi-tenant process therefore holds locks only for live
//!   runs. Terminal-run queries fall back to the persistence collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::model::RunId;
use crate::run::RunState;

/// Shared handle to one run's lock + state.
pub type RunCell = Arc<Mutex<RunState>>;

/// Registry of live runs, keyed by run id.
#[derive(Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<RunId, RunCell>>,
}

impl RunRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a run, returning its cell.
    ///
    /// Get-or-create semantics: if a cell for the id already exists
    /// (racing registration), the existing cell is returned and the given
    /// state is dropped, so at most one lock object ever exists per id.
    pub async fn register(&self, state: RunState) -> RunCell {
        let id = state.id().clone();
        {
            let runs = self.runs.read().await;
            if let Some(cell) = runs.get(&id) {
                return cell.clone();
            }
        }
        let mut runs = self.runs.write().await;
        // Double-check: another registration may have won the race.
        if let Some(cell) = runs.get(&id) {
            return cell.clone();
        }
        let cell: RunCell = Arc::new(Mutex::new(state));
        runs.insert(id, cell.clone());
        cell
    }

    /// Returns the cell for a live run, if present.
    pub async fn get(&self, id: &RunId) -> Option<RunCell> {
        let runs = self.runs.read().await;
        runs.get(id).cloned()
    }

    /// Removes a terminal run's cell from the registry.
    pub async fn evict(&self, id: &RunId) {
        let mut runs = self.runs.write().await;
        runs.remove(id);
    }

    /// Number of live runs currently registered.
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Returns true if no live runs are registered.
    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeStatistics, RunId, Scenario};

    fn state(id: &str) -> RunState {
        RunState::new(
            RunId::from(id),
            Scenario(1),
            "h",
            10,
            vec![],
            AttributeStatistics::default(),
        )
    }

    #[tokio::test]
    async fn test_register_then_get() {
        let registry = RunRegistry::new();
        let cell = registry.register(state("a")).await;
        let again = registry.get(&RunId::from("a")).await.expect("cell");
        assert!(Arc::ptr_eq(&cell, &again));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_returns_existing_cell() {
        let registry = RunRegistry::new();
        let first = registry.register(state("a")).await;
        let second = registry.register(state("a")).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_creates_one_cell() {
        let registry = Arc::new(RunRegistry::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let reg = registry.clone();
            handles.push(tokio::spawn(
                async move { reg.register(state("same")).await },
            ));
        }
        let mut cells = Vec::new();
        for h in handles {
            cells.push(h.await.expect("join"));
        }
        assert_eq!(registry.len().await, 1);
        for c in &cells[1..] {
            assert!(Arc::ptr_eq(&cells[0], c));
        }
    }

    #[tokio::test]
    async fn test_evict_removes_cell() {
        let registry = RunRegistry::new();
        registry.register(state("a")).await;
        registry.register(state("b")).await;
        registry.evict(&RunId::from("a")).await;
        assert!(registry.get(&RunId::from("a")).await.is_none());
        assert!(registry.get(&RunId::from("b")).await.is_some());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_independent_runs_do_not_contend() {
        let registry = RunRegistry::new();
        let a = registry.register(state("a")).await;
        let b = registry.register(state("b")).await;
        // Holding a's lock must not block b's.
        let _ga = a.lock().await;
        let gb = b.try_lock();
        assert!(gb.is_ok());
    }
}
