//! One simulation round: concurrent trial fan-out and winner fan-in.
//!
//! Every eligible pool gets one isolated trial task. A trial owns the
//! label namespace `{pool}-{round}`: its nodes and pod copies all carry
//! that label, its nodes are tainted with it, and its pod copies both
//! tolerate the taint and select for the label — so a trial's pods can
//! only land on that trial's nodes and concurrent trials never alias
//! each other inside the shared sandbox.
//!
//! Results flow over a channel sized to the trial count. Each task owns
//! a sender clone dropped at task exit, so the drain loop completes
//! only after every trial has reported — close-after-join, never
//! close-after-first-result.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use gridsim_core::{
    MachineCatalog, MachineType, Node, NodePool, Pod, Resources, Taint, Toleration,
    TrialSettings,
};
use gridsim_sandbox::{Sandbox, wait_for_placement};

use crate::error::{RecommenderError, RecommenderResult};
use crate::scorer::{StrategyWeights, score_trial};

/// Label key marking every object a trial creates.
pub const SIMULATION_RUN_LABEL: &str = "gridsim.io/simulation-run";

/// Outcome of one successful trial.
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub pool: NodePool,
    pub score: f64,
    /// Original pending pods still unplaced after this trial.
    pub unplaced: Vec<Pod>,
    /// Nodes the trial added (one per zone for zone-spread pools).
    pub nodes_added: u32,
}

/// The trial selected as a round's winner.
pub type RoundWinner = TrialResult;

struct TrialReport {
    pool_name: String,
    outcome: RecommenderResult<TrialResult>,
}

/// Execute one round over the eligible pools and pending workload.
///
/// Returns the winning trial, or `None` when no trial managed to place
/// any pending pod (including the empty-pool and empty-pending cases).
/// Individual trial failures are isolated; only when every trial fails
/// does the round return the aggregate error.
pub async fn run_round(
    sandbox: &Sandbox,
    catalog: &MachineCatalog,
    pools: &[NodePool],
    pending: &[Pod],
    weights: &StrategyWeights,
    settings: &TrialSettings,
    round: u32,
    cancel: &watch::Receiver<bool>,
) -> RecommenderResult<Option<RoundWinner>> {
    if pools.is_empty() || pending.is_empty() {
        return Ok(None);
    }

    let (tx, mut rx) = mpsc::channel::<TrialReport>(pools.len());
    for pool in pools {
        let tx = tx.clone();
        let sandbox = sandbox.clone();
        let catalog = catalog.clone();
        let pool = pool.clone();
        let pending = pending.to_vec();
        let weights = *weights;
        let settings = settings.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let pool_name = pool.name.clone();
            let outcome =
                run_trial(&sandbox, &catalog, &pool, &pending, &weights, &settings, round, cancel)
                    .await;
            let _ = tx.send(TrialReport { pool_name, outcome }).await;
        });
    }
    drop(tx);

    let mut successes = Vec::new();
    let mut failures: Vec<(String, RecommenderError)> = Vec::new();
    while let Some(report) = rx.recv().await {
        match report.outcome {
            Ok(result) => successes.push(result),
            Err(e) => {
                warn!(pool = %report.pool_name, error = %e, round, "trial failed");
                failures.push((report.pool_name, e));
            }
        }
    }

    if *cancel.borrow() {
        return Err(RecommenderError::Cancelled);
    }

    if successes.is_empty() {
        if failures.is_empty() {
            return Ok(None);
        }
        let joined = failures
            .iter()
            .map(|(pool, e)| format!("{pool}: {e}"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(RecommenderError::AllTrialsFailed(joined));
    }

    // Only trials that placed at least one pending pod can win.
    let mut candidates: Vec<TrialResult> = successes
        .into_iter()
        .filter(|r| r.unplaced.len() < pending.len())
        .collect();
    candidates.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.pool.name.cmp(&b.pool.name))
    });

    let Some(winner) = candidates.into_iter().next() else {
        return Ok(None);
    };
    info!(
        round,
        pool = %winner.pool.name,
        score = winner.score,
        unplaced = winner.unplaced.len(),
        "round winner selected"
    );
    Ok(Some(winner))
}

/// Run one isolated trial, releasing every labeled resource on exit —
/// success, failure, or cancellation alike.
#[allow(clippy::too_many_arguments)]
async fn run_trial(
    sandbox: &Sandbox,
    catalog: &MachineCatalog,
    pool: &NodePool,
    pending: &[Pod],
    weights: &StrategyWeights,
    settings: &TrialSettings,
    round: u32,
    cancel: watch::Receiver<bool>,
) -> RecommenderResult<TrialResult> {
    let run_id = format!("{}-{}", pool.name, round);
    let result =
        trial_body(sandbox, catalog, pool, pending, weights, settings, &run_id, cancel).await;

    let (nodes, pods) = sandbox.remove_labeled(SIMULATION_RUN_LABEL, &run_id).await;
    debug!(run = %run_id, nodes, pods, "trial resources released");
    result
}

#[allow(clippy::too_many_arguments)]
async fn trial_body(
    sandbox: &Sandbox,
    catalog: &MachineCatalog,
    pool: &NodePool,
    pending: &[Pod],
    weights: &StrategyWeights,
    settings: &TrialSettings,
    run_id: &str,
    mut cancel: watch::Receiver<bool>,
) -> RecommenderResult<TrialResult> {
    if *cancel.borrow() {
        return Err(RecommenderError::Cancelled);
    }

    let machine = catalog
        .get(&pool.machine_type)
        .ok_or_else(|| RecommenderError::UnknownMachineType(pool.machine_type.clone()))?;
    let reference_cost = catalog.max_hourly_cost().ok_or(RecommenderError::EmptyCatalog)?;

    let trial_nodes = build_trial_nodes(pool, machine, run_id);
    let nodes_added = trial_nodes.len() as u32;
    sandbox.add_nodes(trial_nodes).await?;

    let (copies, origin) = copy_pending(pending, run_id);
    sandbox.add_pods(copies).await?;
    debug!(run = %run_id, nodes = nodes_added, pods = origin.len(), "trial launched");

    tokio::select! {
        _ = wait_for_placement(
            sandbox,
            Some((SIMULATION_RUN_LABEL, run_id)),
            settings.placement_timeout(),
            settings.poll_interval(),
        ) => {}
        _ = cancelled(&mut cancel) => return Err(RecommenderError::Cancelled),
    }

    let trial_pods = sandbox.list_pods_labeled(SIMULATION_RUN_LABEL, run_id).await;
    let placed: Vec<Resources> = trial_pods
        .iter()
        .filter(|p| p.is_scheduled())
        .map(|p| p.requests)
        .collect();
    let unplaced: Vec<Pod> = trial_pods
        .iter()
        .filter(|p| !p.is_scheduled())
        .filter_map(|p| origin.get(&p.name).cloned())
        .collect();

    let score = score_trial(machine, nodes_added, &placed, reference_cost, weights);
    debug!(
        run = %run_id,
        score,
        placed = placed.len(),
        unplaced = unplaced.len(),
        "trial scored"
    );

    Ok(TrialResult { pool: pool.clone(), score, unplaced, nodes_added })
}

/// Resolves only when cancellation is actually signalled; if the
/// cancellation source is dropped, cancellation can no longer happen
/// and this future stays pending.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// One tainted, labeled node per zone in scope (a single node for
/// zone-free pools), carrying forward the pool's own taints.
fn build_trial_nodes(pool: &NodePool, machine: &MachineType, run_id: &str) -> Vec<Node> {
    let zones: Vec<Option<&str>> = if pool.zones.is_empty() {
        vec![None]
    } else {
        pool.zones.iter().map(|z| Some(z.as_str())).collect()
    };

    zones
        .into_iter()
        .map(|zone| {
            let name = match zone {
                Some(z) => format!("{run_id}-{z}"),
                None => format!("{run_id}-node"),
            };
            let mut node = Node::from_machine(&name, &pool.name, machine, zone);
            node.taints = pool.taints.clone();
            node.taints.push(Taint::new(SIMULATION_RUN_LABEL, run_id));
            node.labels
                .insert(SIMULATION_RUN_LABEL.to_string(), run_id.to_string());
            node
        })
        .collect()
}

/// Copy the pending workload into the trial's label namespace. The
/// copies tolerate the trial taint and select for the trial label, so
/// they are only ever placeable onto this trial's nodes. Returns the
/// copies plus a map from copy name back to the original pod.
fn copy_pending(pending: &[Pod], run_id: &str) -> (Vec<Pod>, HashMap<String, Pod>) {
    let mut copies = Vec::with_capacity(pending.len());
    let mut origin = HashMap::with_capacity(pending.len());
    for pod in pending {
        let mut copy = pod.clone();
        copy.name = format!("{}-sim-{}", pod.name, run_id);
        copy.labels
            .insert(SIMULATION_RUN_LABEL.to_string(), run_id.to_string());
        copy.tolerations
            .push(Toleration::new(SIMULATION_RUN_LABEL, run_id));
        copy.node_selector
            .insert(SIMULATION_RUN_LABEL.to_string(), run_id.to_string());
        copy.node_name = None;
        origin.insert(copy.name.clone(), pod.clone());
        copies.push(copy);
    }
    (copies, origin)
}
