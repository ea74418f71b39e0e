//! Eligible-pool derivation.
//!
//! A pool is eligible for a trial while its live sandbox node count is
//! below its configured maximum. Counts are queried live each round —
//! prior rounds' committed winners must be visible here.

use gridsim_core::{ClusterSpec, NodePool};
use gridsim_sandbox::Sandbox;

use crate::error::RecommenderResult;

/// Derive the pools that still have headroom, ordered by name.
///
/// Pools at or over their maximum are silently excluded.
pub async fn eligible_pools(
    sandbox: &Sandbox,
    cluster: &ClusterSpec,
) -> RecommenderResult<Vec<NodePool>> {
    let mut pools = Vec::with_capacity(cluster.worker_pools.len());
    for spec in &cluster.worker_pools {
        let current = sandbox.list_nodes_in_pool(&spec.name).await.len() as u32;
        if current >= spec.max {
            continue;
        }
        pools.push(NodePool {
            name: spec.name.clone(),
            zones: spec.zones.clone(),
            machine_type: spec.machine_type.clone(),
            max: spec.max,
            current,
            taints: spec.taints.clone(),
        });
    }
    pools.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_core::{MachineType, Node, WorkerPoolSpec};

    fn machine() -> MachineType {
        MachineType {
            name: "m".to_string(),
            cpu_millis: 1000,
            memory_bytes: 4096,
            hourly_cost: 0.1,
        }
    }

    fn pool_spec(name: &str, max: u32) -> WorkerPoolSpec {
        WorkerPoolSpec {
            name: name.to_string(),
            zones: Vec::new(),
            machine_type: "m".to_string(),
            min: 0,
            max,
            current: 0,
            taints: Vec::new(),
        }
    }

    fn cluster(pools: Vec<WorkerPoolSpec>) -> ClusterSpec {
        ClusterSpec { name: "dev".to_string(), worker_pools: pools }
    }

    #[tokio::test]
    async fn pool_at_max_is_excluded() {
        let sandbox = Sandbox::new();
        let m = machine();
        sandbox
            .add_nodes(vec![
                Node::from_machine("a-0", "a", &m, None),
                Node::from_machine("a-1", "a", &m, None),
            ])
            .await
            .unwrap();

        let spec = cluster(vec![pool_spec("a", 2), pool_spec("b", 1)]);
        let pools = eligible_pools(&sandbox, &spec).await.unwrap();

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name, "b");
    }

    #[tokio::test]
    async fn live_counts_override_configured_current() {
        let sandbox = Sandbox::new();
        let m = machine();
        sandbox
            .add_nodes(vec![Node::from_machine("a-0", "a", &m, None)])
            .await
            .unwrap();

        // Config says 0, sandbox says 1.
        let spec = cluster(vec![pool_spec("a", 3)]);
        let pools = eligible_pools(&sandbox, &spec).await.unwrap();
        assert_eq!(pools[0].current, 1);
    }

    #[tokio::test]
    async fn output_is_name_ordered() {
        let sandbox = Sandbox::new();
        let spec = cluster(vec![pool_spec("zeta", 1), pool_spec("alpha", 1)]);

        let pools = eligible_pools(&sandbox, &spec).await.unwrap();
        let names: Vec<&str> = pools.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
