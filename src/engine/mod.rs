//! Admission decision engine.
//!
//! This module groups the **what-to-do** half of the crate: given one
//! candidate and the current run aggregates, produce an irrevocable
//! admit/reject decision.
//!
//! ## Contents
//! - [`Strategy`] the five interchangeable decision algorithms + name parsing
//! - [`DecisionInputs`], [`decide`] borrowed inputs and the pure dispatch
//! - [`tightness`] per-constraint urgency ratios (reporting aid)
//!
//! ## Quick wiring
//! ```text
//! Gatekeeper::auto_step(run, strategy)
//!      └─► RunState aggregates ─► DecisionInputs ─► decide(strategy, &inputs)
//!           decision forwarded to the ArrivalSource together with the index
//! ```
//!
//! The engine is pure and synchronous; it never suspends, never mutates,
//! and never panics on well-formed numeric inputs.

mod decide;
mod strategy;

pub use decide::{decide, tightness, DecisionInputs, EPS};
pub use strategy::Strategy;
