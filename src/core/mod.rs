//! Engine core: run orchestration and per-run locking.
//!
//! This module contains the embedded orchestration layer of the engine.
//! The public API from this module is [`Gatekeeper`] plus its result
//! types; everything else is internal.
//!
//! Internal modules:
//! - [`locks`]: per-run lock registry with get-or-create registration and
//!   eviction of terminal runs;
//! - [`gatekeeper`]: drives the step protocol against the arrival source,
//!   the store, and the event bus.

mod gatekeeper;
mod locks;

pub use gatekeeper::{Gatekeeper, RunExport, RunSummary, StepOutcome};
