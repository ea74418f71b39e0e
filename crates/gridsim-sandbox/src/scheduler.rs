//! The sandbox's scheduling component.
//!
//! Authoritative for pod-to-node placement inside the sandbox. A
//! placement pass binds every pending pod it can to a feasible node
//! (tolerations, node selector, resource fit), preferring the node
//! that will be most full after placement. The background loop runs a
//! pass on an interval until shutdown.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, trace};

use gridsim_core::{Node, Pod, Resources};

use crate::error::SandboxResult;
use crate::store::Sandbox;

/// Binds pending pods to sandbox nodes.
pub struct Scheduler {
    sandbox: Sandbox,
}

impl Scheduler {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    /// Run one placement pass. Returns the number of pods bound.
    ///
    /// Pods are considered in name order; each is bound to the feasible
    /// node with the least remaining capacity after placement
    /// (best-fit), so capacity fragments as little as possible.
    pub async fn run_pass(&self) -> SandboxResult<usize> {
        let nodes = self.sandbox.list_nodes().await;
        let mut free: HashMap<String, Resources> = HashMap::new();
        for node in &nodes {
            free.insert(node.name.clone(), self.sandbox.free_capacity(&node.name).await?);
        }

        let pending = self.sandbox.list_unscheduled_pods().await;
        let mut bound = 0usize;

        for pod in &pending {
            let Some(target) = best_fit(pod, &nodes, &free) else {
                trace!(pod = %pod.name, "no feasible node");
                continue;
            };
            self.sandbox.bind_pod(&pod.name, &target).await?;
            if let Some(f) = free.get_mut(&target) {
                *f = f.minus_saturating(&pod.requests);
            }
            bound += 1;
        }

        if bound > 0 {
            debug!(bound, pending = pending.len(), "placement pass complete");
        }
        Ok(bound)
    }

    /// Run the scheduling loop until shutdown is signalled.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = interval.as_millis() as u64, "sandbox scheduler started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.run_pass().await {
                        tracing::error!(error = %e, "placement pass failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("sandbox scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// True when the pod could run on the node given its free capacity.
pub fn feasible(pod: &Pod, node: &Node, free: &Resources) -> bool {
    pod.tolerates(node) && pod.matches_selector(node) && pod.requests.fits_within(free)
}

/// Pick the feasible node that will be most full after placing the pod.
fn best_fit(pod: &Pod, nodes: &[Node], free: &HashMap<String, Resources>) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for node in nodes {
        let Some(avail) = free.get(&node.name) else { continue };
        if !feasible(pod, node, avail) {
            continue;
        }
        let left = avail.minus_saturating(&pod.requests);
        let slack = fraction(left.cpu_millis, node.allocatable.cpu_millis)
            + fraction(left.memory_bytes, node.allocatable.memory_bytes);
        match best {
            Some((s, _)) if s <= slack => {}
            _ => best = Some((slack, &node.name)),
        }
    }
    best.map(|(_, name)| name.to_string())
}

fn fraction(part: u64, whole: u64) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

/// Wait until no unscheduled pods remain (optionally only those with
/// the given label), or the timeout elapses. Returns true when all
/// pods were placed in time.
pub async fn wait_for_placement(
    sandbox: &Sandbox,
    label: Option<(&str, &str)>,
    timeout: Duration,
    poll: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let pending = match label {
            Some((k, v)) => sandbox.list_unscheduled_pods_labeled(k, v).await,
            None => sandbox.list_unscheduled_pods().await,
        };
        if pending.is_empty() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(poll).await;
    }
}
