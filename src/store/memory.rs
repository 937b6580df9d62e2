//! # In-memory run store.
//!
//! [`MemoryStore`] keeps snapshots and ledgers in a `tokio::sync::RwLock`
//! guarded map. Used by the test suite and by embedders that do not need
//! durability; a production deployment implements [`RunStore`] over a real
//! database instead.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::{DecisionRecord, RunId};
use crate::run::RunSnapshot;

use super::{RunStore, StoreError};

#[derive(Default)]
struct Tables {
    snapshots: HashMap<RunId, RunSnapshot>,
    ledgers: HashMap<RunId, Vec<DecisionRecord>>,
}

/// In-memory [`RunStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn save(&self, snapshot: &RunSnapshot) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .snapshots
            .insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn append(&self, run: &RunId, record: &DecisionRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .ledgers
            .entry(run.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn load(&self, run: &RunId) -> Result<Option<RunSnapshot>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.snapshots.get(run).cloned())
    }

    async fn records(
        &self,
        run: &RunId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, StoreError> {
        let tables = self.tables.read().await;
        let ledger = tables.ledgers.get(run).map(Vec::as_slice).unwrap_or(&[]);
        Ok(ledger.iter().skip(offset).take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeStatistics, RunStatus, Scenario};
    use std::collections::HashMap as Map;
    use std::time::SystemTime;

    fn snapshot(id: &str) -> RunSnapshot {
        RunSnapshot {
            id: RunId::from(id),
            scenario: Scenario(1),
            status: RunStatus::Running,
            admitted_count: 0,
            rejected_count: 0,
            capacity: 10,
            constraints: vec![],
            statistics: AttributeStatistics::default(),
            pending: None,
            failure_reason: None,
        }
    }

    fn record(index: u64) -> DecisionRecord {
        DecisionRecord {
            index,
            attributes: Map::new(),
            accepted: index % 2 == 0,
            admitted_after: 0,
            rejected_after: 0,
            at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let store = MemoryStore::new();
        let id = RunId::from("r1");
        assert!(store.load(&id).await.unwrap().is_none());
        store.save(&snapshot("r1")).await.unwrap();
        let loaded = store.load(&id).await.unwrap().expect("snapshot");
        assert_eq!(loaded.capacity, 10);
    }

    #[tokio::test]
    async fn test_records_pagination() {
        let store = MemoryStore::new();
        let id = RunId::from("r2");
        for i in 0..5 {
            store.append(&id, &record(i)).await.unwrap();
        }
        let page = store.records(&id, 1, 2).await.unwrap();
        let indices: Vec<u64> = page.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);

        let empty = store.records(&RunId::from("absent"), 0, 10).await.unwrap();
        assert!(empty.is_empty());
    }
}
