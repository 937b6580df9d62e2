//! Event consumers.
//!
//! ## Contents
//! - [`Subscribe`] the extension-point trait for custom event handlers
//! - [`LogWriter`] a stdout demo subscriber (feature = `logging`)
//!
//! Subscribers are attached through
//! [`Gatekeeper::attach_subscriber`](crate::Gatekeeper::attach_subscriber),
//! which spawns one forwarding worker per subscriber off the event bus.

mod subscribe;

pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
