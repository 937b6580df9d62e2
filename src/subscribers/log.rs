//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [opened] run=4f2a…
//! [peeked] run=4f2a… idx=0
//! [decided] run=4f2a… idx=41 accepted=true
//! [paused] run=4f2a…
//! [resumed] run=4f2a…
//! [completed] run=4f2a…
//! [failed] run=4f2a… reason="too many rejections"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let run = e.run.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::RunOpened => {
                println!("[opened] run={run}");
            }
            EventKind::CandidatePeeked => {
                println!("[peeked] run={run} idx={:?}", e.index);
            }
            EventKind::DecisionCommitted => {
                println!(
                    "[decided] run={run} idx={:?} accepted={:?}",
                    e.index, e.accepted
                );
            }
            EventKind::RunPaused => {
                println!("[paused] run={run}");
            }
            EventKind::RunResumed => {
                println!("[resumed] run={run}");
            }
            EventKind::RunCompleted => {
                println!("[completed] run={run}");
            }
            EventKind::RunFailed => {
                println!("[failed] run={run} reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
