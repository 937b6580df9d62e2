//! # Global engine configuration.
//!
//! [`Config`] defines the defaults a [`Gatekeeper`](crate::Gatekeeper)
//! applies to new runs: required capacity, event-bus capacity, and the
//! decision strategy used when a caller does not name one.
//!
//! # Example
//! ```
//! use doorman::{Config, Strategy};
//!
//! let mut cfg = Config::default();
//! cfg.capacity = 500;
//! cfg.default_strategy = Strategy::ExpectedFeasible;
//!
//! assert_eq!(cfg.capacity, 500);
//! ```

use crate::engine::Strategy;

/// Global configuration for the admission engine.
///
/// Controls run capacity, event-bus sizing, and the default strategy.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of admissions required to complete a run.
    pub capacity: u32,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Strategy used by `auto_step` when the caller passes none.
    pub default_strategy: Strategy,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `capacity = 1000`
    /// - `bus_capacity = 1024`
    /// - `default_strategy = Strategy::GreedyTightness`
    fn default() -> Self {
        Self {
            capacity: 1000,
            bus_capacity: 1024,
            default_strategy: Strategy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.capacity, 1000);
        assert_eq!(cfg.bus_capacity, 1024);
        assert_eq!(cfg.default_strategy, Strategy::GreedyTightness);
    }
}
