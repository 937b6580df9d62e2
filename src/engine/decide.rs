//! # Pure decision functions, one per strategy.
//!
//! Every function here is synchronous, non-blocking, and free of side
//! effects: `(candidate attributes, constraints, admitted counts, capacity,
//! relative frequencies) → admit/reject`. All floating-point inequality
//! checks use a fixed tolerance [`EPS`] to counter jitter, and every
//! division is floor-guarded against zero denominators. The functions never
//! panic on well-formed numeric inputs.
//!
//! ## Shared shape
//! Let `remaining = max(0, capacity − admitted_count)`; every strategy
//! rejects immediately when `remaining = 0`. Let
//! `deficit(a) = max(0, min_count(a) − admitted_by_attr[a])`.
//!
//! When no attribute has a positive deficit, all strategies except
//! proportional-control admit unconditionally to fill capacity.
//! Proportional-control always falls through to its scoring rule; see
//! [`decide`] for the rationale.

use std::collections::HashMap;

use crate::model::Constraint;

use super::strategy::Strategy;

/// Tolerance for floating-point inequality checks.
pub const EPS: f64 = 1e-9;

/// Sentinel slack for a branch with no remaining positive deficits.
const NO_DEFICIT_SLACK: f64 = 1e9;

/// Everything a strategy may consult when deciding one candidate.
///
/// Borrowed views onto run state; building one is free.
#[derive(Clone, Copy, Debug)]
pub struct DecisionInputs<'a> {
    /// The pending candidate's boolean attribute vector.
    pub attributes: &'a HashMap<String, bool>,
    /// Per-attribute minimum-count quotas for the run.
    pub constraints: &'a [Constraint],
    /// Current per-attribute accepted counts (derived from the ledger).
    pub admitted_by_attr: &'a HashMap<String, u32>,
    /// Total accepted count so far.
    pub admitted_count: u32,
    /// Admissions required to complete the run.
    pub capacity: u32,
    /// Attribute → probability a future candidate carries it.
    pub relative_frequencies: &'a HashMap<String, f64>,
}

impl<'a> DecisionInputs<'a> {
    fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.admitted_count)
    }

    fn has(&self, attribute: &str) -> bool {
        self.attributes.get(attribute).copied().unwrap_or(false)
    }

    fn frequency(&self, attribute: &str) -> f64 {
        self.relative_frequencies
            .get(attribute)
            .copied()
            .unwrap_or(0.0)
    }

    /// Per-constraint deficits in constraint order.
    fn deficits(&self) -> Vec<(&'a str, u32)> {
        self.constraints
            .iter()
            .map(|c| {
                let cur = self.admitted_by_attr.get(&c.attribute).copied().unwrap_or(0);
                (c.attribute.as_str(), c.min_count.saturating_sub(cur))
            })
            .collect()
    }
}

/// Decides one candidate with the given strategy.
///
/// Dispatches to the pure per-strategy function. Proportional-control is
/// the one variant evaluated without the "no deficits → auto-admit"
/// shortcut: it scores every candidate against proportion targets, so a
/// run with all quotas already met still rejects candidates that bring no
/// lagging attribute.
pub fn decide(strategy: Strategy, inputs: &DecisionInputs<'_>) -> bool {
    if inputs.remaining() == 0 {
        return false;
    }
    match strategy {
        Strategy::GreedyTightness => decide_greedy_tightness(inputs),
        Strategy::ExpectedFeasible => decide_expected_feasible(inputs),
        Strategy::RiskAdjustedFeasible => decide_risk_adjusted_feasible(inputs, 1.0),
        Strategy::ProportionalControl => decide_proportional_control(inputs),
        Strategy::Lookahead1 => decide_lookahead_1(inputs),
    }
}

/// Per-attribute tightness ratios: `deficit / remaining` per constraint.
///
/// Reporting aid: the ratio ranks open deficits by urgency but does not
/// alter any strategy's accept/reject outcome.
pub fn tightness(inputs: &DecisionInputs<'_>) -> HashMap<String, f64> {
    let remaining = inputs.remaining().max(1) as f64;
    inputs
        .deficits()
        .into_iter()
        .map(|(attr, deficit)| (attr.to_string(), deficit as f64 / remaining))
        .collect()
}

/// Greedy-tightness: admit iff the candidate helps at least one open deficit.
fn decide_greedy_tightness(inputs: &DecisionInputs<'_>) -> bool {
    let deficits = inputs.deficits();
    if deficits.iter().all(|&(_, d)| d == 0) {
        // No deficits: accept to fill quickly.
        return true;
    }
    deficits
        .iter()
        .any(|&(attr, deficit)| deficit > 0 && inputs.has(attr))
}

/// Expected-feasible: greedy shortcut, then guard quota-neutral admits
/// against expected future supply per unsatisfied deficit.
fn decide_expected_feasible(inputs: &DecisionInputs<'_>) -> bool {
    let deficits = inputs.deficits();
    if deficits.iter().all(|&(_, d)| d == 0) {
        return true;
    }
    if deficits
        .iter()
        .any(|&(attr, deficit)| deficit > 0 && inputs.has(attr))
    {
        return true;
    }
    // Accepting burns a slot; every open deficit must still be coverable
    // by expected supply over the slots that remain afterwards.
    let rem_after = (inputs.remaining() - 1) as f64;
    for (attr, deficit) in deficits {
        if deficit == 0 || inputs.has(attr) {
            continue;
        }
        let expected_supply = inputs.frequency(attr) * rem_after;
        if expected_supply < deficit as f64 - EPS {
            return false;
        }
    }
    true
}

/// Risk-adjusted-feasible: expected-feasible with a `z`-sigma margin
/// subtracted from expected supply (binomial standard deviation).
///
/// Subtracting `z·std` only tightens the guard, so this strategy's accept
/// set is always a subset of expected-feasible's for identical inputs.
fn decide_risk_adjusted_feasible(inputs: &DecisionInputs<'_>, z: f64) -> bool {
    let deficits = inputs.deficits();
    if deficits.iter().all(|&(_, d)| d == 0) {
        return true;
    }
    if deficits
        .iter()
        .any(|&(attr, deficit)| deficit > 0 && inputs.has(attr))
    {
        return true;
    }
    let rem_after = (inputs.remaining() - 1) as f64;
    for (attr, deficit) in deficits {
        if deficit == 0 || inputs.has(attr) {
            continue;
        }
        let p = inputs.frequency(attr);
        let expected = p * rem_after;
        let std = (rem_after * p * (1.0 - p)).max(0.0).sqrt();
        if expected - z * std < deficit as f64 - EPS {
            return false;
        }
    }
    true
}

/// Proportional-control: admit iff the candidate carries positive
/// proportional need.
///
/// `need(a) = max(0, min_count(a)/capacity − admitted_by_attr[a]/admitted)`,
/// summed over attributes the candidate satisfies. Zero raw deficits do not
/// auto-admit here; a quota already at target contributes zero need.
fn decide_proportional_control(inputs: &DecisionInputs<'_>) -> bool {
    let capacity = inputs.capacity.max(1) as f64;
    let admitted = inputs.admitted_count.max(1) as f64;
    let mut score = 0.0;
    for c in inputs.constraints {
        if !inputs.has(&c.attribute) {
            continue;
        }
        let target = c.min_count as f64 / capacity;
        let current = inputs.admitted_by_attr.get(&c.attribute).copied().unwrap_or(0) as f64
            / admitted;
        score += (target - current).max(0.0);
    }
    score > 0.0
}

/// Lookahead-1: compare worst-case slack between the accept and reject
/// branches; on a tie, admit iff the candidate helps any open deficit.
fn decide_lookahead_1(inputs: &DecisionInputs<'_>) -> bool {
    let deficits = inputs.deficits();
    if deficits.iter().all(|&(_, d)| d == 0) {
        return true;
    }

    let branch_min_slack = |accept: bool| -> f64 {
        let rem = (inputs.remaining() - u32::from(accept)) as f64;
        let mut best = f64::INFINITY;
        for &(attr, deficit) in &deficits {
            let adjusted = if accept && inputs.has(attr) {
                deficit.saturating_sub(1)
            } else {
                deficit
            };
            if adjusted == 0 {
                continue;
            }
            let slack = inputs.frequency(attr) * rem - adjusted as f64;
            if slack < best {
                best = slack;
            }
        }
        if best.is_infinite() {
            NO_DEFICIT_SLACK
        } else {
            best
        }
    };

    let s_accept = branch_min_slack(true);
    let s_reject = branch_min_slack(false);
    if s_accept > s_reject + EPS {
        return true;
    }
    if s_reject > s_accept + EPS {
        return false;
    }
    deficits
        .iter()
        .any(|&(attr, deficit)| deficit > 0 && inputs.has(attr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Constraint;

    fn attrs(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    fn counts(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    fn freqs(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_all_strategies_reject_when_full() {
        let a = attrs(&[("berlin", true)]);
        let c = vec![Constraint::new("berlin", 400)];
        let by = counts(&[("berlin", 100)]);
        let f = freqs(&[("berlin", 0.5)]);
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 1000,
            capacity: 1000,
            relative_frequencies: &f,
        };
        for s in [
            Strategy::GreedyTightness,
            Strategy::ExpectedFeasible,
            Strategy::RiskAdjustedFeasible,
            Strategy::ProportionalControl,
            Strategy::Lookahead1,
        ] {
            assert!(!decide(s, &inputs), "{} admitted with zero slots", s.as_label());
        }
    }

    #[test]
    fn test_greedy_admits_when_no_deficits() {
        let a = attrs(&[("berlin", false)]);
        let c = vec![Constraint::new("berlin", 0)];
        let by = counts(&[("berlin", 0)]);
        let f = HashMap::new();
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 10,
            capacity: 1000,
            relative_frequencies: &f,
        };
        assert!(decide(Strategy::GreedyTightness, &inputs));
    }

    #[test]
    fn test_greedy_rejects_candidate_that_helps_no_deficit() {
        let a = attrs(&[("berlin", false)]);
        let c = vec![Constraint::new("berlin", 400)];
        let by = counts(&[("berlin", 100)]);
        let f = HashMap::new();
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 100,
            capacity: 1000,
            relative_frequencies: &f,
        };
        assert!(!decide(Strategy::GreedyTightness, &inputs));
    }

    #[test]
    fn test_greedy_admits_via_indirect_deficit_match() {
        // Scenario: berlin deficit 50, black deficit 10; candidate only berlin.
        let a = attrs(&[("berlin", true), ("black", false)]);
        let c = vec![
            Constraint::new("berlin", 400),
            Constraint::new("black", 800),
        ];
        let by = counts(&[("berlin", 350), ("black", 790)]);
        let f = HashMap::new();
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 900,
            capacity: 1000,
            relative_frequencies: &f,
        };
        assert!(decide(Strategy::GreedyTightness, &inputs));
    }

    #[test]
    fn test_expected_feasible_guard_rejects() {
        // capacity 10, admitted 8; black needs 9, has 8; candidate not black.
        // After accepting: 1 slot left, expected supply 0.4 < deficit 1.
        let a = attrs(&[("black", false)]);
        let c = vec![Constraint::new("black", 9)];
        let by = counts(&[("black", 8)]);
        let f = freqs(&[("black", 0.4)]);
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 8,
            capacity: 10,
            relative_frequencies: &f,
        };
        assert!(!decide(Strategy::ExpectedFeasible, &inputs));
    }

    #[test]
    fn test_expected_feasible_admits_neutral_when_supply_ample() {
        // Deficit 10, 99 slots remain after accepting, p = 0.5 → expected 49.5.
        let a = attrs(&[("black", false)]);
        let c = vec![Constraint::new("black", 10)];
        let by = counts(&[]);
        let f = freqs(&[("black", 0.5)]);
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 900,
            capacity: 1000,
            relative_frequencies: &f,
        };
        assert!(decide(Strategy::ExpectedFeasible, &inputs));
    }

    #[test]
    fn test_risk_adjusted_is_subset_of_expected_feasible() {
        // Sweep a range of supply margins; wherever risk-adjusted admits,
        // expected-feasible must admit too.
        let a = attrs(&[("x", false)]);
        let by = counts(&[]);
        for min_count in [1u32, 5, 20, 60] {
            for p10 in 0..=10u32 {
                let p = f64::from(p10) / 10.0;
                let c = vec![Constraint::new("x", min_count)];
                let f = freqs(&[("x", p)]);
                let inputs = DecisionInputs {
                    attributes: &a,
                    constraints: &c,
                    admitted_by_attr: &by,
                    admitted_count: 900,
                    capacity: 1000,
                    relative_frequencies: &f,
                };
                let risk = decide(Strategy::RiskAdjustedFeasible, &inputs);
                let expected = decide(Strategy::ExpectedFeasible, &inputs);
                assert!(
                    !risk || expected,
                    "risk admitted but expected rejected at min_count={min_count} p={p}"
                );
            }
        }
    }

    #[test]
    fn test_risk_adjusted_rejects_on_the_margin_expected_admits() {
        // Deficit 5, 9 slots after accepting, p = 0.6:
        // expected = 5.4 ≥ 5, but 5.4 − 1·std(≈1.47) = 3.93 < 5.
        let a = attrs(&[("x", false)]);
        let c = vec![Constraint::new("x", 5)];
        let by = counts(&[]);
        let f = freqs(&[("x", 0.6)]);
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 0,
            capacity: 10,
            relative_frequencies: &f,
        };
        assert!(decide(Strategy::ExpectedFeasible, &inputs));
        assert!(!decide(Strategy::RiskAdjustedFeasible, &inputs));
    }

    #[test]
    fn test_proportional_control_scores_instead_of_auto_admitting() {
        // vip quota met exactly in proportion terms is overshot:
        // target 100/1000 = 0.1, current 100/500 = 0.2 → need 0, score 0 → reject.
        let a = attrs(&[("vip", true)]);
        let c = vec![Constraint::new("vip", 100)];
        let by = counts(&[("vip", 100)]);
        let f = HashMap::new();
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 500,
            capacity: 1000,
            relative_frequencies: &f,
        };
        assert!(!decide(Strategy::ProportionalControl, &inputs));
    }

    #[test]
    fn test_proportional_control_admits_lagging_attribute() {
        // target 0.4, current 100/500 = 0.2 → need 0.2 > 0 → admit.
        let a = attrs(&[("berlin", true)]);
        let c = vec![Constraint::new("berlin", 400)];
        let by = counts(&[("berlin", 100)]);
        let f = HashMap::new();
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 500,
            capacity: 1000,
            relative_frequencies: &f,
        };
        assert!(decide(Strategy::ProportionalControl, &inputs));
    }

    #[test]
    fn test_proportional_control_rejects_unhelpful_candidate() {
        let a = attrs(&[("berlin", false)]);
        let c = vec![Constraint::new("berlin", 400)];
        let by = counts(&[("berlin", 100)]);
        let f = HashMap::new();
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 500,
            capacity: 1000,
            relative_frequencies: &f,
        };
        assert!(!decide(Strategy::ProportionalControl, &inputs));
    }

    #[test]
    fn test_lookahead_tie_breaks_towards_satisfied_deficit() {
        // p = 1.0 makes both branches tie exactly:
        // accept: 1.0·9 − 4 = 5; reject: 1.0·10 − 5 = 5.
        let a = attrs(&[("x", true)]);
        let c = vec![Constraint::new("x", 5)];
        let by = counts(&[]);
        let f = freqs(&[("x", 1.0)]);
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 0,
            capacity: 10,
            relative_frequencies: &f,
        };
        assert!(decide(Strategy::Lookahead1, &inputs));
    }

    #[test]
    fn test_lookahead_tie_rejects_unhelpful_candidate() {
        // Candidate carries no constrained attribute: both branches see the
        // same deficits, reject branch keeps one more slot, so slack is
        // strictly better on reject when p > 0; with p = 0 both tie at the
        // same negative slack and the tie-break rejects.
        let a = attrs(&[("x", false)]);
        let c = vec![Constraint::new("x", 5)];
        let by = counts(&[]);
        let f = freqs(&[("x", 0.0)]);
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 0,
            capacity: 10,
            relative_frequencies: &f,
        };
        assert!(!decide(Strategy::Lookahead1, &inputs));
    }

    #[test]
    fn test_lookahead_clears_last_deficit_via_sentinel() {
        // Accepting clears the only deficit → accept branch scores the
        // sentinel and dominates.
        let a = attrs(&[("x", true)]);
        let c = vec![Constraint::new("x", 1)];
        let by = counts(&[]);
        let f = freqs(&[("x", 0.1)]);
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 0,
            capacity: 10,
            relative_frequencies: &f,
        };
        assert!(decide(Strategy::Lookahead1, &inputs));
    }

    #[test]
    fn test_tightness_ratios() {
        let a = attrs(&[]);
        let c = vec![
            Constraint::new("berlin", 400),
            Constraint::new("black", 800),
        ];
        let by = counts(&[("berlin", 350), ("black", 790)]);
        let f = HashMap::new();
        let inputs = DecisionInputs {
            attributes: &a,
            constraints: &c,
            admitted_by_attr: &by,
            admitted_count: 900,
            capacity: 1000,
            relative_frequencies: &f,
        };
        let t = tightness(&inputs);
        assert!((t["berlin"] - 0.5).abs() < EPS);
        assert!((t["black"] - 0.1).abs() < EPS);
    }
}
