//! # Gatekeeper: the admission engine's orchestrator.
//!
//! [`Gatekeeper`] owns the collaborators and drives the step protocol:
//!
//! ```text
//!          ┌────────────┐   advance    ┌───────────────┐
//!  caller ─► Gatekeeper ├─────────────►│ ArrivalSource │
//!          │            │◄─────────────┤ (upstream)    │
//!          │  registry  │  candidate   └───────────────┘
//!          │  ┌──────┐  │
//!          │  │ lock │  │   save/append   ┌──────────┐
//!          │  │ per  │  ├────────────────►│ RunStore │
//!          │  │ run  │  │                 └──────────┘
//!          │  └──────┘  │   publish   ┌─────┐
//!          └────────────┴────────────►│ Bus │──► subscribers
//!                                     └─────┘
//! ```
//!
//! ## Rules
//! - Every step runs under the run's lock, end to end: validate, decide,
//!   call the arrival source, commit, persist. Two concurrent requests for
//!   one run serialize; the loser revalidates against the advanced state.
//! - The arrival source is called **before** commit; its reported counts
//!   are authoritative and the commit adopts them verbatim.
//! - A source or store failure moves the run to terminal `Failed` and
//!   persists that final snapshot before the error reaches the caller.
//! - Terminal runs are evicted from the registry; queries for them fall
//!   back to the store. Eviction is skipped when the final snapshot could
//!   not be saved, so the failed state stays queryable in memory.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::{decide, DecisionInputs, Strategy};
use crate::error::StepError;
use crate::events::{Bus, Event, EventKind};
use crate::model::{Candidate, DecisionRecord, RunId, RunStatus, Scenario};
use crate::run::{RunSnapshot, RunState};
use crate::source::{ArrivalSource, SourceStatus};
use crate::store::{RunStore, StoreError};
use crate::subscribers::Subscribe;

use super::locks::{RunCell, RunRegistry};

/// Page size used when replaying a persisted ledger.
const LEDGER_PAGE: usize = 1024;

/// Caller-facing view of a run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
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
    /// Index of the candidate awaiting a decision, if any.
    pub pending_index: Option<u64>,
    /// Collaborator-supplied reason, set when `status` is `Failed`.
    pub failure_reason: Option<String>,
}

impl RunSummary {
    fn from_snapshot(snapshot: &RunSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            scenario: snapshot.scenario,
            status: snapshot.status,
            admitted_count: snapshot.admitted_count,
            rejected_count: snapshot.rejected_count,
            capacity: snapshot.capacity,
            pending_index: snapshot.pending.as_ref().map(|c| c.index),
            failure_reason: snapshot.failure_reason.clone(),
        }
    }
}

/// Result of one committed decision step.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepOutcome {
    /// Run view after the step.
    pub run: RunSummary,
    /// The ledger record this step committed.
    pub record: DecisionRecord,
    /// Index of the next candidate to decide, absent when the run is over.
    pub next_index: Option<u64>,
    /// Per-attribute accepted counts after the step.
    pub admitted_by_attribute: HashMap<String, u32>,
}

/// Full dump of a run: final view plus the complete decision ledger.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunExport {
    /// Run view at export time.
    pub run: RunSummary,
    /// Every committed decision, in arrival order.
    pub records: Vec<DecisionRecord>,
}

/// How the decision for a step is produced.
enum DecisionMode {
    /// Caller supplied the decision.
    Supplied(bool),
    /// Engine decides the pending candidate with a strategy.
    Auto(Strategy),
}

/// # Orchestrator of admission runs.
///
/// Holds explicitly constructed collaborator handles; nothing is resolved
/// lazily or globally, so tests and embedders swap implementations freely.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use doorman::{Config, Gatekeeper, MemoryStore, Scenario, SimConfig, SimulatedSource};
///
/// # async fn demo() -> Result<(), doorman::StepError> {
/// let gatekeeper = Gatekeeper::new(
///     Config::default(),
///     Arc::new(SimulatedSource::new(SimConfig::default())),
///     Arc::new(MemoryStore::new()),
/// );
///
/// let run = gatekeeper.open_run(Scenario(1)).await?;
/// let first = gatekeeper.peek_next(&run.id).await?;
/// # let _ = first;
/// # Ok(())
/// # }
/// ```
pub struct Gatekeeper {
    cfg: Config,
    source: Arc<dyn ArrivalSource>,
    store: Arc<dyn RunStore>,
    bus: Bus,
    registry: RunRegistry,
}

impl Gatekeeper {
    /// Creates a gatekeeper over the given collaborators.
    pub fn new(cfg: Config, source: Arc<dyn ArrivalSource>, store: Arc<dyn RunStore>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        Self {
            cfg,
            source,
            store,
            bus,
            registry: RunRegistry::new(),
        }
    }

    /// Returns the event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Creates a new receiver for run-lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Attaches a subscriber, driven by a dedicated worker task.
    ///
    /// The worker skips lagged events and exits when the gatekeeper (and
    /// with it the bus sender) is dropped. Must be called from within a
    /// tokio runtime.
    pub fn attach_subscriber(&self, subscriber: Arc<dyn Subscribe>) {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subscriber.on_event(&ev).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Opens a new run for the scenario.
    ///
    /// Validates the scenario, opens the run upstream, persists the fresh
    /// snapshot, registers the run, and publishes [`EventKind::RunOpened`].
    pub async fn open_run(&self, scenario: Scenario) -> Result<RunSummary, StepError> {
        if !scenario.is_supported() {
            return Err(StepError::InvalidScenario {
                scenario: scenario.0,
            });
        }

        let setup = self
            .source
            .open_run(scenario)
            .await
            .map_err(|e| StepError::External {
                reason: e.to_string(),
            })?;

        let state = RunState::new(
            RunId::generate(),
            scenario,
            setup.handle,
            self.cfg.capacity,
            setup.constraints,
            setup.statistics,
        );
        let snapshot = state.snapshot();
        self.store
            .save(&snapshot)
            .await
            .map_err(|e| StepError::Store {
                reason: e.to_string(),
            })?;

        self.registry.register(state).await;
        self.bus
            .publish(Event::new(EventKind::RunOpened).with_run(snapshot.id.to_string()));
        Ok(RunSummary::from_snapshot(&snapshot))
    }

    /// Fetches and caches the first candidate of a run.
    ///
    /// Idempotent while candidate 0 is still pending: a retry returns the
    /// cached candidate without touching the arrival source. Returns
    /// `Ok(None)` when the source reports the run over before any
    /// candidate arrives (the run completes).
    pub async fn peek_next(&self, run: &RunId) -> Result<Option<Candidate>, StepError> {
        let cell = self.cell(run).await?;
        let mut state = cell.lock().await;
        self.peek_locked(&mut state).await
    }

    /// Commits a caller-supplied decision for the named candidate index.
    pub async fn submit_decision(
        &self,
        run: &RunId,
        index: u64,
        accept: bool,
    ) -> Result<StepOutcome, StepError> {
        self.step(run, index, DecisionMode::Supplied(accept)).await
    }

    /// Decides the named pending candidate with a strategy and commits the
    /// result.
    ///
    /// The index must match the pending candidate, exactly as for
    /// [`Gatekeeper::submit_decision`]; only the decision itself is
    /// computed internally. Falls back to the configured default strategy
    /// when the caller passes none.
    pub async fn auto_step(
        &self,
        run: &RunId,
        index: u64,
        strategy: Option<Strategy>,
    ) -> Result<StepOutcome, StepError> {
        let strategy = strategy.unwrap_or(self.cfg.default_strategy);
        self.step(run, index, DecisionMode::Auto(strategy)).await
    }

    /// Pauses a run. Ledger, counts, and pending candidate are untouched.
    pub async fn pause(&self, run: &RunId) -> Result<RunSummary, StepError> {
        let cell = self.cell(run).await?;
        let mut state = cell.lock().await;
        state.pause()?;
        let snapshot = state.snapshot();
        self.store
            .save(&snapshot)
            .await
            .map_err(|e| StepError::Store {
                reason: e.to_string(),
            })?;
        self.bus
            .publish(Event::new(EventKind::RunPaused).with_run(snapshot.id.to_string()));
        Ok(RunSummary::from_snapshot(&snapshot))
    }

    /// Resumes a paused run.
    pub async fn resume(&self, run: &RunId) -> Result<RunSummary, StepError> {
        let cell = self.cell(run).await?;
        let mut state = cell.lock().await;
        state.resume()?;
        let snapshot = state.snapshot();
        self.store
            .save(&snapshot)
            .await
            .map_err(|e| StepError::Store {
                reason: e.to_string(),
            })?;
        self.bus
            .publish(Event::new(EventKind::RunResumed).with_run(snapshot.id.to_string()));
        Ok(RunSummary::from_snapshot(&snapshot))
    }

    /// Returns the current view of a run, live or terminal.
    pub async fn run_summary(&self, run: &RunId) -> Result<RunSummary, StepError> {
        if let Some(cell) = self.registry.get(run).await {
            let state = cell.lock().await;
            return Ok(RunSummary::from_snapshot(&state.snapshot()));
        }
        match self.load_snapshot(run).await? {
            Some(snapshot) => Ok(RunSummary::from_snapshot(&snapshot)),
            None => Err(StepError::RunNotFound {
                run: run.to_string(),
            }),
        }
    }

    /// Per-attribute accepted counts for a run.
    ///
    /// For a live run the counts are derived from the in-memory ledger; for
    /// a terminal (evicted) run they are recomputed by replaying the
    /// persisted ledger page by page.
    pub async fn admitted_by_attribute(
        &self,
        run: &RunId,
    ) -> Result<HashMap<String, u32>, StepError> {
        if let Some(cell) = self.registry.get(run).await {
            let state = cell.lock().await;
            return Ok(state.admitted_by_attribute());
        }
        if self.load_snapshot(run).await?.is_none() {
            return Err(StepError::RunNotFound {
                run: run.to_string(),
            });
        }

        let mut counts: HashMap<String, u32> = HashMap::new();
        let mut offset = 0;
        loop {
            let page = self.page(run, offset, LEDGER_PAGE).await?;
            if page.is_empty() {
                break;
            }
            offset += page.len();
            for record in page.iter().filter(|r| r.accepted) {
                for (attr, set) in &record.attributes {
                    if *set {
                        *counts.entry(attr.clone()).or_insert(0) += 1;
                    }
                }
            }
        }
        Ok(counts)
    }

    /// Returns a page of the run's decision ledger in arrival order.
    pub async fn records(
        &self,
        run: &RunId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, StepError> {
        if self.registry.get(run).await.is_none() && self.load_snapshot(run).await?.is_none() {
            return Err(StepError::RunNotFound {
                run: run.to_string(),
            });
        }
        self.page(run, offset, limit).await
    }

    /// Exports the run view together with its complete ledger.
    pub async fn export(&self, run: &RunId) -> Result<RunExport, StepError> {
        let summary = self.run_summary(run).await?;
        let mut records = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.page(run, offset, LEDGER_PAGE).await?;
            if page.is_empty() {
                break;
            }
            offset += page.len();
            records.extend(page);
        }
        Ok(RunExport {
            run: summary,
            records,
        })
    }

    /// Resolves a run's lock cell, or explains why it cannot.
    ///
    /// Registry misses are checked against the store: a persisted terminal
    /// run answers [`StepError::Terminal`], anything else is unknown.
    /// (Live runs are always registered; only terminal ones are evicted.)
    async fn cell(&self, run: &RunId) -> Result<RunCell, StepError> {
        if let Some(cell) = self.registry.get(run).await {
            return Ok(cell);
        }
        match self.load_snapshot(run).await? {
            Some(snapshot) if snapshot.status.is_terminal() => Err(StepError::Terminal {
                status: snapshot.status,
            }),
            _ => Err(StepError::RunNotFound {
                run: run.to_string(),
            }),
        }
    }

    async fn load_snapshot(&self, run: &RunId) -> Result<Option<RunSnapshot>, StepError> {
        self.store.load(run).await.map_err(|e| StepError::Store {
            reason: e.to_string(),
        })
    }

    async fn page(
        &self,
        run: &RunId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DecisionRecord>, StepError> {
        self.store
            .records(run, offset, limit)
            .await
            .map_err(|e| StepError::Store {
                reason: e.to_string(),
            })
    }

    /// Peek body, run under the caller-held run lock.
    async fn peek_locked(&self, state: &mut RunState) -> Result<Option<Candidate>, StepError> {
        state.validate_peek()?;
        if let Some(pending) = state.pending() {
            // Retry before the first commit: serve the cached candidate.
            return Ok(Some(pending.clone()));
        }

        let advance = match self.source.advance(state.handle(), 0, None).await {
            Ok(advance) => advance,
            Err(e) => return Err(self.seal_failed(state, e.to_string(), None).await),
        };

        match advance.status {
            SourceStatus::Failed => {
                let reason = advance
                    .reason
                    .unwrap_or_else(|| "arrival source failed".to_string());
                Err(self
                    .seal_failed(
                        state,
                        reason,
                        Some((advance.admitted_count, advance.rejected_count)),
                    )
                    .await)
            }
            SourceStatus::Completed => {
                state.complete(advance.admitted_count, advance.rejected_count);
                if let Err(e) = self.store.save(&state.snapshot()).await {
                    return Err(self.seal_store_failure(state, e).await);
                }
                self.bus
                    .publish(Event::new(EventKind::RunCompleted).with_run(state.id().to_string()));
                self.registry.evict(state.id()).await;
                Ok(None)
            }
            SourceStatus::Running => {
                let candidate = match advance.next_candidate {
                    Some(candidate) => candidate,
                    None => {
                        let reason = "source reported running without a candidate".to_string();
                        return Err(self.seal_failed(state, reason, None).await);
                    }
                };
                state.cache_pending(candidate.clone());
                if let Err(e) = self.store.save(&state.snapshot()).await {
                    return Err(self.seal_store_failure(state, e).await);
                }
                self.bus.publish(
                    Event::new(EventKind::CandidatePeeked)
                        .with_run(state.id().to_string())
                        .with_index(candidate.index),
                );
                Ok(Some(candidate))
            }
        }
    }

    /// One full decision step, under the run's lock.
    ///
    /// Order matters: validate first (no mutation on refusal), then the
    /// arrival source, then commit with the cached attributes and the
    /// source's authoritative counts, then persist, then publish.
    async fn step(
        &self,
        run: &RunId,
        index: u64,
        mode: DecisionMode,
    ) -> Result<StepOutcome, StepError> {
        let cell = self.cell(run).await?;
        let mut state = cell.lock().await;

        state.validate_decide(index)?;

        let accept = match mode {
            DecisionMode::Supplied(accept) => accept,
            DecisionMode::Auto(strategy) => {
                let pending = match state.pending() {
                    Some(pending) => pending.clone(),
                    None => {
                        return Err(StepError::PendingMismatch {
                            pending: None,
                            got: index,
                        });
                    }
                };
                let admitted_by_attr = state.admitted_by_attribute();
                let inputs = DecisionInputs {
                    attributes: &pending.attributes,
                    constraints: state.constraints(),
                    admitted_by_attr: &admitted_by_attr,
                    admitted_count: state.admitted_count(),
                    capacity: state.capacity(),
                    relative_frequencies: &state.statistics().relative_frequencies,
                };
                decide(strategy, &inputs)
            }
        };

        let advance = match self
            .source
            .advance(state.handle(), index, Some(accept))
            .await
        {
            Ok(advance) => advance,
            Err(e) => return Err(self.seal_failed(&mut state, e.to_string(), None).await),
        };
        if advance.status == SourceStatus::Failed {
            let reason = advance
                .reason
                .unwrap_or_else(|| "arrival source failed".to_string());
            return Err(self
                .seal_failed(
                    &mut state,
                    reason,
                    Some((advance.admitted_count, advance.rejected_count)),
                )
                .await);
        }

        let record = state.commit_decision(
            accept,
            advance.admitted_count,
            advance.rejected_count,
            advance.next_candidate,
            advance.status == SourceStatus::Completed,
        )?;

        if let Err(e) = self.store.append(state.id(), &record).await {
            return Err(self.seal_store_failure(&mut state, e).await);
        }
        if let Err(e) = self.store.save(&state.snapshot()).await {
            return Err(self.seal_store_failure(&mut state, e).await);
        }

        let run_id = state.id().to_string();
        self.bus.publish(
            Event::new(EventKind::DecisionCommitted)
                .with_run(run_id.clone())
                .with_index(record.index)
                .with_accepted(accept),
        );
        if state.status() == RunStatus::Completed {
            self.bus
                .publish(Event::new(EventKind::RunCompleted).with_run(run_id));
            self.registry.evict(state.id()).await;
        }

        Ok(StepOutcome {
            run: RunSummary::from_snapshot(&state.snapshot()),
            next_index: state.pending().map(|c| c.index),
            admitted_by_attribute: state.admitted_by_attribute(),
            record,
        })
    }

    /// Moves the run to `Failed`, persists, publishes, and evicts.
    ///
    /// Eviction is skipped if the final save fails, so the failed state
    /// remains queryable in memory. Always returns the error to surface.
    async fn seal_failed(
        &self,
        state: &mut RunState,
        reason: String,
        counts: Option<(u32, u32)>,
    ) -> StepError {
        let (admitted, rejected) = match counts {
            Some((a, r)) => (Some(a), Some(r)),
            None => (None, None),
        };
        state.fail(reason.clone(), admitted, rejected);
        let saved = self.store.save(&state.snapshot()).await;
        self.bus.publish(
            Event::new(EventKind::RunFailed)
                .with_run(state.id().to_string())
                .with_reason(reason.clone()),
        );
        if saved.is_ok() {
            self.registry.evict(state.id()).await;
        }
        StepError::External { reason }
    }

    /// Like [`Gatekeeper::seal_failed`], for persistence failures mid-step.
    async fn seal_store_failure(&self, state: &mut RunState, err: StoreError) -> StepError {
        let reason = err.to_string();
        state.fail(reason.clone(), None, None);
        let saved = self.store.save(&state.snapshot()).await;
        self.bus.publish(
            Event::new(EventKind::RunFailed)
                .with_run(state.id().to_string())
                .with_reason(reason.clone()),
        );
        if saved.is_ok() {
            self.registry.evict(state.id()).await;
        }
        StepError::Store { reason }
    }
}
