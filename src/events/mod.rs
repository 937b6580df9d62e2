//! Run-lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the gatekeeper's step path.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: [`Gatekeeper`](crate::Gatekeeper) (one event per run transition).
//! - **Consumers**: workers spawned by `Gatekeeper::attach_subscriber`, and
//!   any caller holding a receiver from `Gatekeeper::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
