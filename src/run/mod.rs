//! Run state machine and sequencing.
//!
//! This module groups the **when-is-it-legal** half of the crate: the
//! strict arrival-index validator and the per-run mutable state that only
//! validated decisions may advance.
//!
//! ## Contents
//! - [`validate_sequence`] strict, gapless, zero-based index validation
//! - [`RunState`] status, ledger, pending cache, transition rules
//! - [`RunSnapshot`] the read-only view handed to the persistence seam
//!
//! ## Quick wiring
//! ```text
//! Gatekeeper step (under the run's lock):
//!   validate_peek / validate_decide ─► ArrivalSource::advance ─►
//!   commit_decision / fail / complete ─► RunStore::save
//! ```

mod sequence;
mod state;

pub use sequence::validate_sequence;
pub use state::{RunSnapshot, RunState};
