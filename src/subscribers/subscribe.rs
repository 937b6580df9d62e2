//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers
//! into the engine. Each subscriber attached via
//! [`Gatekeeper::attach_subscriber`](crate::Gatekeeper::attach_subscriber)
//! is driven by a dedicated worker loop fed from the event bus.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) — they do **not** block
//!   the step path nor other subscribers.
//! - A subscriber that falls behind the bus ring buffer skips the lagged
//!   events; the durable record of a run is the store, never the bus.
//!
//! ## Example (skeleton)
//! ```rust
//! use doorman::{Event, Subscribe};
//!
//! struct Audit;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Audit {
//!     async fn on_event(&self, _event: &Event) {
//!         // write audit record...
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative
/// waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    ///
    /// # Parameters
    /// - `event`: Reference to the event (does not transfer ownership)
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
