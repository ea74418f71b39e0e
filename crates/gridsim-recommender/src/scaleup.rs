//! The scale-up recommendation loop.
//!
//! Drives successive simulation rounds until the pending workload is
//! placed or no further progress is possible, folding each round's
//! winner into the accumulated recommendation. Winning node additions
//! are committed to the sandbox permanently so later rounds see them
//! in eligibility counts; losing trials were already rolled back by
//! their own cleanup.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use gridsim_core::{ClusterSpec, MachineCatalog, Node, NodePool, Pod, TrialSettings};
use gridsim_sandbox::Sandbox;

use crate::eligibility::eligible_pools;
use crate::error::{RecommenderError, RecommenderResult};
use crate::scorer::StrategyWeights;
use crate::trial::run_round;

/// Accumulated advice: pool name → additional nodes recommended.
///
/// Backed by a `BTreeMap` so iteration (and serialized output) is
/// deterministically name-ordered. Grows monotonically during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Recommendation(BTreeMap<String, u32>);

impl Recommendation {
    pub fn add(&mut self, pool: &str, count: u32) {
        *self.0.entry(pool.to_string()).or_insert(0) += count;
    }

    pub fn get(&self, pool: &str) -> u32 {
        self.0.get(pool).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total_nodes(&self) -> u32 {
        self.0.values().sum()
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum TerminalReason {
    /// Every pending pod was placed.
    AllPlaced,
    /// A round produced no winner; the remaining workload cannot be
    /// scheduled by any eligible pool. Not an error.
    UnschedulableRemainder,
    /// A winning action failed to shrink the pending set. Not an error.
    NoProgress,
    /// Every trial of a round failed; partial results are preserved.
    Failed(String),
}

/// Best-effort result of a scale-up run. Always carries whatever
/// recommendation accumulated before the terminal condition.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub recommendation: Recommendation,
    /// Pods still unplaced when the loop stopped.
    pub unplaced: Vec<Pod>,
    pub reason: TerminalReason,
    pub rounds: u32,
}

/// The round loop.
pub struct ScaleUpRecommender {
    sandbox: Sandbox,
    cluster: ClusterSpec,
    catalog: MachineCatalog,
    weights: StrategyWeights,
    settings: TrialSettings,
    cancel: watch::Receiver<bool>,
}

impl ScaleUpRecommender {
    pub fn new(
        sandbox: Sandbox,
        cluster: ClusterSpec,
        catalog: MachineCatalog,
        weights: StrategyWeights,
        settings: TrialSettings,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self { sandbox, cluster, catalog, weights, settings, cancel }
    }

    /// Run rounds until a terminal condition is reached.
    ///
    /// The loop is bounded by the initial pending pod count: every
    /// committed winner must place at least one pod, so more rounds
    /// than pods can never be needed.
    pub async fn run(&self) -> RecommenderResult<RunOutcome> {
        let mut recommendation = Recommendation::default();
        let mut pending = self.sandbox.list_unscheduled_pods().await;
        let max_rounds = pending.len() as u32;
        let mut rounds = 0u32;

        for round in 1..=max_rounds {
            if pending.is_empty() {
                break;
            }

            let pools = eligible_pools(&self.sandbox, &self.cluster).await?;
            info!(round, pending = pending.len(), eligible = pools.len(), "scale-up round");

            let winner = match run_round(
                &self.sandbox,
                &self.catalog,
                &pools,
                &pending,
                &self.weights,
                &self.settings,
                round,
                &self.cancel,
            )
            .await
            {
                Ok(winner) => winner,
                Err(RecommenderError::AllTrialsFailed(msg)) => {
                    warn!(round, error = %msg, "every trial failed; stopping with partial results");
                    return Ok(RunOutcome {
                        recommendation,
                        unplaced: pending,
                        reason: TerminalReason::Failed(msg),
                        rounds,
                    });
                }
                Err(e) => return Err(e),
            };
            rounds = round;

            let Some(winner) = winner else {
                info!(round, unplaced = pending.len(), "no winner; remainder is unschedulable");
                return Ok(RunOutcome {
                    recommendation,
                    unplaced: pending,
                    reason: TerminalReason::UnschedulableRemainder,
                    rounds,
                });
            };

            // Guard against a winning action that placed nothing.
            if same_pods(&winner.unplaced, &pending) {
                warn!(round, pool = %winner.pool.name, "winner made no progress; stopping");
                return Ok(RunOutcome {
                    recommendation,
                    unplaced: pending,
                    reason: TerminalReason::NoProgress,
                    rounds,
                });
            }

            self.commit_winner(&winner.pool, round).await?;
            recommendation.add(&winner.pool.name, winner.nodes_added);
            pending = winner.unplaced;
        }

        if pending.is_empty() {
            info!(rounds, total = recommendation.total_nodes(), "all pods placed");
            Ok(RunOutcome {
                recommendation,
                unplaced: Vec::new(),
                reason: TerminalReason::AllPlaced,
                rounds,
            })
        } else {
            // Round bound exhausted with workload left: report the stall.
            warn!(rounds, unplaced = pending.len(), "round bound reached; stopping");
            Ok(RunOutcome {
                recommendation,
                unplaced: pending,
                reason: TerminalReason::NoProgress,
                rounds,
            })
        }
    }

    /// Durably add the winning pool's node(s) to the sandbox, mirroring
    /// the shape the trial scored: one node per zone in scope.
    async fn commit_winner(&self, pool: &NodePool, round: u32) -> RecommenderResult<()> {
        let machine = self
            .catalog
            .get(&pool.machine_type)
            .ok_or_else(|| RecommenderError::UnknownMachineType(pool.machine_type.clone()))?;

        let zones: Vec<Option<&str>> = if pool.zones.is_empty() {
            vec![None]
        } else {
            pool.zones.iter().map(|z| Some(z.as_str())).collect()
        };

        let mut nodes = Vec::with_capacity(zones.len());
        for zone in zones {
            let name = match zone {
                Some(z) => format!("{}-r{}-{}", pool.name, round, z),
                None => format!("{}-r{}", pool.name, round),
            };
            let mut node = Node::from_machine(&name, &pool.name, machine, zone);
            node.taints = pool.taints.clone();
            nodes.push(node);
        }

        info!(pool = %pool.name, round, nodes = nodes.len(), "committing winning node addition");
        self.sandbox.add_nodes(nodes).await?;
        Ok(())
    }
}

fn same_pods(a: &[Pod], b: &[Pod]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<&str> = a.iter().map(|p| p.name.as_str()).collect();
    let mut right: Vec<&str> = b.iter().map(|p| p.name.as_str()).collect();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}
