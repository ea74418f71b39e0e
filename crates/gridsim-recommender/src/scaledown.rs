//! Scale-down candidate ranking.
//!
//! Orders current nodes most-removable first by descending machine
//! cost — the policy favors cost reduction over node-count reduction.
//! Ranking only; acting on it (and any idle-duration gating) belongs
//! to the caller.

use std::collections::HashMap;

use tracing::debug;

use gridsim_core::{ClusterSpec, MachineCatalog, Node, Pod, Resources};
use gridsim_sandbox::{Sandbox, scheduler::feasible};

use crate::error::{RecommenderError, RecommenderResult};

/// Rank removable nodes by descending cost (ties by ascending name).
///
/// A node is excluded when removing it would take its pool below the
/// configured minimum size, or when it hosts a pod with no feasible
/// path (tolerations, selector, free capacity) to any other node.
/// Nodes in pools absent from the cluster spec are never offered.
pub async fn scale_down_candidates(
    sandbox: &Sandbox,
    cluster: &ClusterSpec,
    catalog: &MachineCatalog,
) -> RecommenderResult<Vec<String>> {
    let nodes = sandbox.list_nodes().await;

    let pool_min: HashMap<&str, u32> = cluster
        .worker_pools
        .iter()
        .map(|p| (p.name.as_str(), p.min))
        .collect();
    let mut pool_size: HashMap<&str, u32> = HashMap::new();
    for node in &nodes {
        *pool_size.entry(node.pool.as_str()).or_insert(0) += 1;
    }

    let mut free: HashMap<String, Resources> = HashMap::new();
    for node in &nodes {
        free.insert(node.name.clone(), sandbox.free_capacity(&node.name).await?);
    }

    let mut ranked: Vec<(f64, &Node)> = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let machine = catalog
            .get(&node.machine_type)
            .ok_or_else(|| RecommenderError::UnknownMachineType(node.machine_type.clone()))?;
        ranked.push((machine.hourly_cost, node));
    }
    ranked.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.name.cmp(&b.1.name))
    });

    let mut candidates = Vec::new();
    for (cost, node) in ranked {
        let Some(&min) = pool_min.get(node.pool.as_str()) else {
            debug!(node = %node.name, pool = %node.pool, "pool not in spec; skipping");
            continue;
        };
        let size = pool_size.get(node.pool.as_str()).copied().unwrap_or(0);
        if size.saturating_sub(1) < min {
            debug!(node = %node.name, pool = %node.pool, "removal would breach pool minimum");
            continue;
        }

        let hosted = sandbox.pods_on_node(&node.name).await;
        if !all_relocatable(&hosted, node, &nodes, &free) {
            debug!(node = %node.name, "hosts a pod with no path to another node");
            continue;
        }

        debug!(node = %node.name, cost, "scale-down candidate");
        candidates.push(node.name.clone());
    }
    Ok(candidates)
}

/// True when every hosted pod could land on some node other than `from`.
fn all_relocatable(
    hosted: &[Pod],
    from: &Node,
    nodes: &[Node],
    free: &HashMap<String, Resources>,
) -> bool {
    hosted.iter().all(|pod| {
        nodes.iter().any(|other| {
            other.name != from.name
                && free
                    .get(&other.name)
                    .is_some_and(|avail| feasible(pod, other, avail))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_core::{MachineType, WorkerPoolSpec};
    use std::collections::BTreeMap;

    fn machine(name: &str, cost: f64) -> MachineType {
        MachineType {
            name: name.to_string(),
            cpu_millis: 2000,
            memory_bytes: 8192,
            hourly_cost: cost,
        }
    }

    fn pool_spec(name: &str, min: u32) -> WorkerPoolSpec {
        WorkerPoolSpec {
            name: name.to_string(),
            zones: Vec::new(),
            machine_type: "big".to_string(),
            min,
            max: 10,
            current: 0,
            taints: Vec::new(),
        }
    }

    fn cluster(pools: Vec<WorkerPoolSpec>) -> ClusterSpec {
        ClusterSpec { name: "dev".to_string(), worker_pools: pools }
    }

    fn pod(name: &str, cpu: u64) -> Pod {
        Pod {
            name: name.to_string(),
            labels: BTreeMap::new(),
            requests: Resources::new(cpu, 512),
            tolerations: Vec::new(),
            node_selector: BTreeMap::new(),
            node_name: None,
        }
    }

    async fn two_node_sandbox() -> (Sandbox, MachineCatalog) {
        let sandbox = Sandbox::new();
        let big = machine("big", 10.0);
        let small = machine("small", 5.0);
        sandbox
            .add_nodes(vec![
                Node::from_machine("n1", "a", &big, None),
                Node::from_machine("n2", "a", &small, None),
            ])
            .await
            .unwrap();
        let catalog = MachineCatalog::from_machines([big, small]);
        (sandbox, catalog)
    }

    #[tokio::test]
    async fn ranks_most_expensive_first() {
        let (sandbox, catalog) = two_node_sandbox().await;
        let spec = cluster(vec![pool_spec("a", 1)]);

        let candidates = scale_down_candidates(&sandbox, &spec, &catalog).await.unwrap();
        assert_eq!(candidates, vec!["n1", "n2"]);
    }

    #[tokio::test]
    async fn pool_minimum_excludes_nodes() {
        let (sandbox, catalog) = two_node_sandbox().await;
        // min 2 with 2 nodes: removing either would breach it.
        let spec = cluster(vec![pool_spec("a", 2)]);

        let candidates = scale_down_candidates(&sandbox, &spec, &catalog).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn unplaceable_hosted_pod_excludes_node() {
        let (sandbox, catalog) = two_node_sandbox().await;
        let spec = cluster(vec![pool_spec("a", 0)]);

        // Fill n2 so the pod on n1 has nowhere to go.
        sandbox.add_pods(vec![pod("filler", 2000)]).await.unwrap();
        sandbox.bind_pod("filler", "n2").await.unwrap();
        sandbox.add_pods(vec![pod("p1", 1500)]).await.unwrap();
        sandbox.bind_pod("p1", "n1").await.unwrap();

        let candidates = scale_down_candidates(&sandbox, &spec, &catalog).await.unwrap();
        // n1's pod can't relocate; n2's can (n1 has room).
        assert_eq!(candidates, vec!["n2"]);
    }

    #[tokio::test]
    async fn relocatable_pods_keep_node_removable() {
        let (sandbox, catalog) = two_node_sandbox().await;
        let spec = cluster(vec![pool_spec("a", 0)]);

        sandbox.add_pods(vec![pod("p1", 100)]).await.unwrap();
        sandbox.bind_pod("p1", "n1").await.unwrap();

        let candidates = scale_down_candidates(&sandbox, &spec, &catalog).await.unwrap();
        assert_eq!(candidates, vec!["n1", "n2"]);
    }

    #[tokio::test]
    async fn unknown_pool_is_never_offered() {
        let (sandbox, catalog) = two_node_sandbox().await;
        let spec = cluster(vec![]);

        let candidates = scale_down_candidates(&sandbox, &spec, &catalog).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn equal_cost_ties_break_by_name() {
        let sandbox = Sandbox::new();
        let m = machine("big", 10.0);
        sandbox
            .add_nodes(vec![
                Node::from_machine("beta", "a", &m, None),
                Node::from_machine("alpha", "a", &m, None),
            ])
            .await
            .unwrap();
        let catalog = MachineCatalog::from_machines([m]);
        let spec = cluster(vec![pool_spec("a", 0)]);

        let candidates = scale_down_candidates(&sandbox, &spec, &catalog).await.unwrap();
        assert_eq!(candidates, vec!["alpha", "beta"]);
    }
}
