//! # doorman
//!
//! **Doorman** is an online constrained-admission engine for Rust.
//!
//! It decides, one arrival at a time, whether to admit or reject each
//! candidate against per-attribute minimum-count quotas, with a fixed
//! admission capacity and irrevocable decisions. The crate is designed as
//! a building block for services that front a sequential upstream of
//! candidates and must fill capacity while keeping every quota satisfiable.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!       caller (API / driver loop)
//!            │ open / peek / decide / auto-step / pause / query
//!            ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Gatekeeper (orchestrator)                                    │
//! │  - RunRegistry (one async lock per live run)                  │
//! │  - Bus (broadcast events)                                     │
//! │  - Strategy engine (pure decision functions)                  │
//! └──────┬──────────────────────────┬──────────────────────┬──────┘
//!        ▼                          ▼                      ▼
//! ┌───────────────┐        ┌─────────────────┐     ┌─────────────┐
//! │ ArrivalSource │        │    RunStore     │     │     Bus     │
//! │ (upstream of  │        │ (snapshots and  │     │ (broadcast  │
//! │  candidates)  │        │  ledger pages)  │     │  channel)   │
//! └───────────────┘        └─────────────────┘     └──────┬──────┘
//!                                                         ▼
//!                                                   subscribers
//!                                                 (Subscribe impls)
//! ```
//!
//! ### Step protocol
//! ```text
//! open_run(scenario) ──► source.open_run ──► register ──► RunOpened
//!
//! peek_next(run)                     (first operation only, idempotent)
//!   ├─► validate: empty ledger, not terminal
//!   ├─► source.advance(index 0, no decision) ──► cache candidate 0
//!   └─► CandidatePeeked
//!
//! loop per candidate:
//!   ├─► validate: not terminal, index matches pending, extends sequence
//!   ├─► decision: caller-supplied, or a Strategy over the pending
//!   │   candidate's attributes / deficits / remaining capacity
//!   ├─► source.advance(index, decision)     (authoritative counts)
//!   │       ├─ Running   ──► commit record, cache next candidate
//!   │       ├─ Completed ──► commit record, run → Completed
//!   │       └─ Failed    ──► run → Failed, error surfaces
//!   ├─► store.append(record) + store.save(snapshot)
//!   └─► DecisionCommitted (+ RunCompleted / RunFailed)
//!
//! Terminal runs are evicted from the registry; queries for them are
//! answered from the store. Every further step is refused.
//! ```
//!
//! ## Features
//! | Area            | Description                                                          | Key types / traits                        |
//! |-----------------|----------------------------------------------------------------------|-------------------------------------------|
//! | **Orchestration** | Open, step, pause, query, and export admission runs.               | [`Gatekeeper`], [`StepOutcome`]           |
//! | **Strategies**  | Five interchangeable decision strategies over quota deficits.        | [`Strategy`], [`decide`], [`DecisionInputs`] |
//! | **Collaborators** | Pluggable upstream and persistence seams.                          | [`ArrivalSource`], [`RunStore`]           |
//! | **Events**      | Broadcast run-lifecycle events to subscribers.                       | [`Event`], [`EventKind`], [`Subscribe`]   |
//! | **Errors**      | Typed refusals and failures of the step protocol.                    | [`StepError`]                             |
//! | **Configuration** | Centralize capacity, bus sizing, and the default strategy.         | [`Config`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//! - `serde`: `Serialize`/`Deserialize` for the model and result types.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use doorman::{Config, Gatekeeper, MemoryStore, Scenario, SimConfig, SimulatedSource};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), doorman::StepError> {
//!     let mut sim = SimConfig::default();
//!     sim.capacity = 10;
//!
//!     let mut cfg = Config::default();
//!     cfg.capacity = 10;
//!
//!     let gatekeeper = Gatekeeper::new(
//!         cfg,
//!         Arc::new(SimulatedSource::new(sim)),
//!         Arc::new(MemoryStore::new()),
//!     );
//!
//!     // Open a run and let the default strategy drive it to completion.
//!     let run = gatekeeper.open_run(Scenario(1)).await?;
//!     let Some(first) = gatekeeper.peek_next(&run.id).await? else {
//!         return Ok(()); // completed before any candidate arrived
//!     };
//!
//!     let mut index = first.index;
//!     loop {
//!         let outcome = gatekeeper.auto_step(&run.id, index, None).await?;
//!         if outcome.run.status.is_terminal() {
//!             println!(
//!                 "run {} finished: {} admitted, {} rejected",
//!                 outcome.run.id, outcome.run.admitted_count, outcome.run.rejected_count,
//!             );
//!             break;
//!         }
//!         index = match outcome.next_index {
//!             Some(next) => next,
//!             None => break,
//!         };
//!     }
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod engine;
mod error;
mod events;
mod model;
mod run;
mod source;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Gatekeeper, RunExport, RunSummary, StepOutcome};
pub use engine::{decide, tightness, DecisionInputs, Strategy, EPS};
pub use error::StepError;
pub use events::{Bus, Event, EventKind};
pub use model::{
    AttributeStatistics, Candidate, Constraint, DecisionRecord, RunId, RunStatus, Scenario,
};
pub use run::{validate_sequence, RunSnapshot};
pub use source::{
    Advance, ArrivalSource, RunSetup, SimConfig, SimulatedSource, SourceError, SourceStatus,
};
pub use store::{MemoryStore, RunStore, StoreError};
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
