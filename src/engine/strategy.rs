//! # Decision strategies for admission runs.
//!
//! [`Strategy`] names one of the five interchangeable decision algorithms.
//! All strategies reject when no slots remain; they differ in how they
//! trade current quota deficits against expected future supply.
//!
//! - [`Strategy::GreedyTightness`] — admit iff the candidate helps any open deficit (default).
//! - [`Strategy::ExpectedFeasible`] — additionally admit quota-neutral candidates
//!   while expected future supply still covers every deficit.
//! - [`Strategy::RiskAdjustedFeasible`] — like expected-feasible with a one-sigma
//!   safety margin against binomial variance; its accept set is always a
//!   subset of expected-feasible's.
//! - [`Strategy::ProportionalControl`] — steer admitted proportions towards
//!   `min_count / capacity` targets; never auto-admits on zero deficits.
//! - [`Strategy::Lookahead1`] — one-step branch comparison of worst-case
//!   slack between accepting and rejecting.

/// One of the five admission decision algorithms.
///
/// Parsed from a normalized name (case-insensitive, `-` and `_`
/// interchangeable); unrecognized names fall back to the default rather
/// than failing, so a misconfigured caller degrades to the safest
/// behavior instead of stalling a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Admit iff the candidate satisfies at least one attribute with positive deficit.
    #[default]
    GreedyTightness,
    /// Greedy shortcut plus an expected-supply guard for quota-neutral candidates.
    ExpectedFeasible,
    /// Expected-supply guard tightened by one standard deviation of future supply.
    RiskAdjustedFeasible,
    /// Score candidates by how far admitted proportions lag their targets.
    ProportionalControl,
    /// Compare worst-case slack across the accept and reject branches.
    Lookahead1,
}

impl Strategy {
    /// Parses a strategy name, falling back to [`Strategy::GreedyTightness`].
    ///
    /// Names are matched case-insensitively with hyphens and underscores
    /// interchangeable: `"Risk-Adjusted-Feasible"` and
    /// `"risk_adjusted_feasible"` select the same variant.
    ///
    /// # Example
    /// ```
    /// use doorman::Strategy;
    ///
    /// assert_eq!(Strategy::parse("Expected-Feasible"), Strategy::ExpectedFeasible);
    /// assert_eq!(Strategy::parse("lookahead_1"), Strategy::Lookahead1);
    /// assert_eq!(Strategy::parse("no-such-thing"), Strategy::GreedyTightness);
    /// ```
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "greedy_tightness" => Strategy::GreedyTightness,
            "expected_feasible" => Strategy::ExpectedFeasible,
            "risk_adjusted_feasible" => Strategy::RiskAdjustedFeasible,
            "proportional_control" => Strategy::ProportionalControl,
            "lookahead_1" => Strategy::Lookahead1,
            // Explicit fallback: unrecognized names degrade to greedy.
            _ => Strategy::GreedyTightness,
        }
    }

    /// Returns the canonical snake_case name of the strategy.
    pub fn as_label(&self) -> &'static str {
        match self {
            Strategy::GreedyTightness => "greedy_tightness",
            Strategy::ExpectedFeasible => "expected_feasible",
            Strategy::RiskAdjustedFeasible => "risk_adjusted_feasible",
            Strategy::ProportionalControl => "proportional_control",
            Strategy::Lookahead1 => "lookahead_1",
        }
    }

    /// Returns whether the strategy consults relative frequencies.
    pub fn uses_frequencies(&self) -> bool {
        matches!(
            self,
            Strategy::ExpectedFeasible | Strategy::RiskAdjustedFeasible | Strategy::Lookahead1
        )
    }
}

impl std::str::FromStr for Strategy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Strategy::parse(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        assert_eq!(Strategy::parse("greedy_tightness"), Strategy::GreedyTightness);
        assert_eq!(Strategy::parse("expected_feasible"), Strategy::ExpectedFeasible);
        assert_eq!(
            Strategy::parse("risk_adjusted_feasible"),
            Strategy::RiskAdjustedFeasible
        );
        assert_eq!(
            Strategy::parse("proportional_control"),
            Strategy::ProportionalControl
        );
        assert_eq!(Strategy::parse("lookahead_1"), Strategy::Lookahead1);
    }

    #[test]
    fn test_parse_is_case_and_separator_insensitive() {
        assert_eq!(
            Strategy::parse("Risk-Adjusted-Feasible"),
            Strategy::RiskAdjustedFeasible
        );
        assert_eq!(Strategy::parse("LOOKAHEAD-1"), Strategy::Lookahead1);
        assert_eq!(Strategy::parse("  greedy-tightness "), Strategy::GreedyTightness);
    }

    #[test]
    fn test_parse_unknown_falls_back_to_greedy() {
        assert_eq!(Strategy::parse(""), Strategy::GreedyTightness);
        assert_eq!(Strategy::parse("optimal"), Strategy::GreedyTightness);
    }

    #[test]
    fn test_labels_round_trip() {
        for s in [
            Strategy::GreedyTightness,
            Strategy::ExpectedFeasible,
            Strategy::RiskAdjustedFeasible,
            Strategy::ProportionalControl,
            Strategy::Lookahead1,
        ] {
            assert_eq!(Strategy::parse(s.as_label()), s);
        }
    }
}
