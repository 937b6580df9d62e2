//! # Simulated arrival source.
//!
//! [`SimulatedSource`] samples a synthetic population from configured
//! relative frequencies with a seeded RNG, so protocol tests and demos can
//! drive full runs deterministically without a network upstream.
//!
//! Game rules mirror the real upstream: a run completes when the admitted
//! count reaches capacity, and fails once rejections exceed the configured
//! limit.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::model::{AttributeStatistics, Candidate, Constraint, Scenario};

use super::{Advance, ArrivalSource, RunSetup, SourceError, SourceStatus};

/// Configuration of the synthetic population and game rules.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Admissions that complete a run.
    pub capacity: u32,
    /// Rejections past which a run fails.
    pub rejection_limit: u32,
    /// Constraint set handed out at run open.
    pub constraints: Vec<Constraint>,
    /// Population statistics handed out at run open; candidates are
    /// sampled i.i.d. from `relative_frequencies`.
    pub statistics: AttributeStatistics,
    /// RNG seed; fixed seed → reproducible arrival stream.
    pub seed: u64,
}

impl Default for SimConfig {
    /// Capacity 1000 and rejection limit 20_000, the upstream game rules.
    fn default() -> Self {
        Self {
            capacity: 1000,
            rejection_limit: 20_000,
            constraints: Vec::new(),
            statistics: AttributeStatistics::default(),
            seed: 0,
        }
    }
}

/// Per-run simulation state.
struct SimRun {
    rng: StdRng,
    /// Frequencies in stable (sorted) order so sampling is reproducible.
    frequencies: Vec<(String, f64)>,
    next_index: u64,
    admitted: u32,
    rejected: u32,
    done: bool,
}

impl SimRun {
    fn sample(&mut self) -> Candidate {
        let index = self.next_index;
        self.next_index += 1;
        let rng = &mut self.rng;
        let attributes: HashMap<String, bool> = self
            .frequencies
            .iter()
            .map(|(attr, p)| (attr.clone(), rng.random_bool(p.clamp(0.0, 1.0))))
            .collect();
        Candidate { index, attributes }
    }
}

/// Deterministic in-process [`ArrivalSource`].
pub struct SimulatedSource {
    config: SimConfig,
    runs: Mutex<HashMap<String, SimRun>>,
    opened: Mutex<u64>,
}

impl SimulatedSource {
    /// Creates a source with the given population and game rules.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            runs: Mutex::new(HashMap::new()),
            opened: Mutex::new(0),
        }
    }
}

#[async_trait]
impl ArrivalSource for SimulatedSource {
    async fn open_run(&self, _scenario: Scenario) -> Result<RunSetup, SourceError> {
        let mut opened = self.opened.lock().await;
        *opened += 1;
        let handle = format!("sim-{}", *opened);
        drop(opened);

        let mut frequencies: Vec<(String, f64)> = self
            .config
            .statistics
            .relative_frequencies
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        frequencies.sort_by(|a, b| a.0.cmp(&b.0));

        let mut runs = self.runs.lock().await;
        runs.insert(
            handle.clone(),
            SimRun {
                rng: StdRng::seed_from_u64(self.config.seed),
                frequencies,
                next_index: 0,
                admitted: 0,
                rejected: 0,
                done: false,
            },
        );

        Ok(RunSetup {
            handle,
            constraints: self.config.constraints.clone(),
            statistics: self.config.statistics.clone(),
        })
    }

    async fn advance(
        &self,
        handle: &str,
        index: u64,
        decision: Option<bool>,
    ) -> Result<Advance, SourceError> {
        let mut runs = self.runs.lock().await;
        let run = runs.get_mut(handle).ok_or_else(|| SourceError::Protocol {
            message: format!("unknown run handle: {handle}"),
        })?;

        if run.done {
            return Err(SourceError::Protocol {
                message: "run is already over".to_string(),
            });
        }

        match decision {
            None => {
                // Peek: only ever legal for candidate 0, before any decision.
                if index != 0 || run.next_index != 0 {
                    return Err(SourceError::Protocol {
                        message: format!("peek at index {index} after stream started"),
                    });
                }
                let first = run.sample();
                Ok(Advance {
                    status: SourceStatus::Running,
                    admitted_count: 0,
                    rejected_count: 0,
                    next_candidate: Some(first),
                    reason: None,
                })
            }
            Some(accept) => {
                // The decided index must be the most recently issued candidate.
                if index + 1 != run.next_index {
                    return Err(SourceError::Protocol {
                        message: format!(
                            "decision for index {index}, expected {}",
                            run.next_index.saturating_sub(1)
                        ),
                    });
                }
                if accept {
                    run.admitted += 1;
                } else {
                    run.rejected += 1;
                }

                if run.admitted >= self.config.capacity {
                    run.done = true;
                    return Ok(Advance {
                        status: SourceStatus::Completed,
                        admitted_count: run.admitted,
                        rejected_count: run.rejected,
                        next_candidate: None,
                        reason: None,
                    });
                }
                if run.rejected > self.config.rejection_limit {
                    run.done = true;
                    return Ok(Advance {
                        status: SourceStatus::Failed,
                        admitted_count: run.admitted,
                        rejected_count: run.rejected,
                        next_candidate: None,
                        reason: Some("rejection limit exceeded".to_string()),
                    });
                }

                let next = run.sample();
                Ok(Advance {
                    status: SourceStatus::Running,
                    admitted_count: run.admitted,
                    rejected_count: run.rejected,
                    next_candidate: Some(next),
                    reason: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(capacity: u32, limit: u32) -> SimulatedSource {
        SimulatedSource::new(SimConfig {
            capacity,
            rejection_limit: limit,
            constraints: vec![Constraint::new("vip", 2)],
            statistics: AttributeStatistics::from_frequencies([("vip", 0.5)]),
            seed: 7,
        })
    }

    #[tokio::test]
    async fn test_peek_returns_candidate_zero_without_counting() {
        let src = source(5, 100);
        let setup = src.open_run(Scenario(1)).await.unwrap();
        let adv = src.advance(&setup.handle, 0, None).await.unwrap();
        assert_eq!(adv.status, SourceStatus::Running);
        assert_eq!(adv.admitted_count, 0);
        assert_eq!(adv.rejected_count, 0);
        assert_eq!(adv.next_candidate.map(|c| c.index), Some(0));
    }

    #[tokio::test]
    async fn test_stream_indices_are_sequential() {
        let src = source(100, 1000);
        let setup = src.open_run(Scenario(1)).await.unwrap();
        src.advance(&setup.handle, 0, None).await.unwrap();
        for i in 0..10u64 {
            let adv = src.advance(&setup.handle, i, Some(false)).await.unwrap();
            assert_eq!(adv.next_candidate.map(|c| c.index), Some(i + 1));
        }
    }

    #[tokio::test]
    async fn test_completes_at_capacity() {
        let src = source(2, 100);
        let setup = src.open_run(Scenario(1)).await.unwrap();
        src.advance(&setup.handle, 0, None).await.unwrap();
        let a0 = src.advance(&setup.handle, 0, Some(true)).await.unwrap();
        assert_eq!(a0.status, SourceStatus::Running);
        let a1 = src.advance(&setup.handle, 1, Some(true)).await.unwrap();
        assert_eq!(a1.status, SourceStatus::Completed);
        assert_eq!(a1.admitted_count, 2);
        assert!(a1.next_candidate.is_none());
    }

    #[tokio::test]
    async fn test_fails_past_rejection_limit() {
        let src = source(10, 2);
        let setup = src.open_run(Scenario(1)).await.unwrap();
        src.advance(&setup.handle, 0, None).await.unwrap();
        src.advance(&setup.handle, 0, Some(false)).await.unwrap();
        src.advance(&setup.handle, 1, Some(false)).await.unwrap();
        let adv = src.advance(&setup.handle, 2, Some(false)).await.unwrap();
        assert_eq!(adv.status, SourceStatus::Failed);
        assert_eq!(adv.reason.as_deref(), Some("rejection limit exceeded"));
    }

    #[tokio::test]
    async fn test_same_seed_same_stream() {
        let a = source(100, 1000);
        let b = source(100, 1000);
        let sa = a.open_run(Scenario(1)).await.unwrap();
        let sb = b.open_run(Scenario(1)).await.unwrap();
        let ca = a.advance(&sa.handle, 0, None).await.unwrap().next_candidate;
        let cb = b.advance(&sb.handle, 0, None).await.unwrap().next_candidate;
        assert_eq!(ca, cb);
    }

    #[tokio::test]
    async fn test_unknown_handle_is_protocol_error() {
        let src = source(5, 5);
        let err = src.advance("nope", 0, None).await.unwrap_err();
        assert!(matches!(err, SourceError::Protocol { .. }));
    }
}
