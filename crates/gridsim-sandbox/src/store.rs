//! Sandbox — shared in-memory cluster copy.
//!
//! All concurrent trials mutate the same store; isolation comes from
//! per-trial labels, never from holding the store locked across an
//! operation. Individual operations are safe to call from any task
//! (`Clone + Send + Sync` via `Arc<RwLock<_>>`), and every listing
//! supports label filtering so one trial's queries never observe
//! another trial's objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use gridsim_core::{ClusterSpec, MachineCatalog, Node, Pod, Resources};

use crate::error::{SandboxError, SandboxResult};
use crate::template::PodTemplate;

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    pods: BTreeMap<String, Pod>,
}

/// The disposable cluster copy trials run against.
#[derive(Clone, Default)]
pub struct Sandbox {
    inner: Arc<RwLock<State>>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// List all nodes, ordered by name.
    pub async fn list_nodes(&self) -> Vec<Node> {
        self.inner.read().await.nodes.values().cloned().collect()
    }

    /// List the nodes belonging to a named worker pool.
    pub async fn list_nodes_in_pool(&self, pool: &str) -> Vec<Node> {
        self.inner
            .read()
            .await
            .nodes
            .values()
            .filter(|n| n.pool == pool)
            .cloned()
            .collect()
    }

    /// List nodes carrying the given label.
    pub async fn list_nodes_labeled(&self, key: &str, value: &str) -> Vec<Node> {
        self.inner
            .read()
            .await
            .nodes
            .values()
            .filter(|n| n.has_label(key, value))
            .cloned()
            .collect()
    }

    /// Add nodes to the sandbox. Node names must be unique.
    pub async fn add_nodes(&self, nodes: Vec<Node>) -> SandboxResult<()> {
        let mut state = self.inner.write().await;
        for node in &nodes {
            if state.nodes.contains_key(&node.name) {
                return Err(SandboxError::DuplicateNode(node.name.clone()));
            }
        }
        for node in nodes {
            debug!(node = %node.name, pool = %node.pool, "node added");
            state.nodes.insert(node.name.clone(), node);
        }
        Ok(())
    }

    /// Free (unrequested) capacity on a node: allocatable minus the
    /// requests of every pod bound to it.
    pub async fn free_capacity(&self, node_name: &str) -> SandboxResult<Resources> {
        let state = self.inner.read().await;
        let node = state
            .nodes
            .get(node_name)
            .ok_or_else(|| SandboxError::NodeNotFound(node_name.to_string()))?;
        let used = state
            .pods
            .values()
            .filter(|p| p.node_name.as_deref() == Some(node_name))
            .fold(Resources::default(), |acc, p| acc.plus(&p.requests));
        Ok(node.allocatable.minus_saturating(&used))
    }

    // ── Pods ───────────────────────────────────────────────────────

    /// List all pods, ordered by name.
    pub async fn list_pods(&self) -> Vec<Pod> {
        self.inner.read().await.pods.values().cloned().collect()
    }

    /// List pods carrying the given label.
    pub async fn list_pods_labeled(&self, key: &str, value: &str) -> Vec<Pod> {
        self.inner
            .read()
            .await
            .pods
            .values()
            .filter(|p| p.has_label(key, value))
            .cloned()
            .collect()
    }

    /// List pods not yet bound to any node.
    pub async fn list_unscheduled_pods(&self) -> Vec<Pod> {
        self.inner
            .read()
            .await
            .pods
            .values()
            .filter(|p| !p.is_scheduled())
            .cloned()
            .collect()
    }

    /// List unbound pods carrying the given label.
    pub async fn list_unscheduled_pods_labeled(&self, key: &str, value: &str) -> Vec<Pod> {
        self.inner
            .read()
            .await
            .pods
            .values()
            .filter(|p| !p.is_scheduled() && p.has_label(key, value))
            .cloned()
            .collect()
    }

    /// List the pods bound to a node.
    pub async fn pods_on_node(&self, node_name: &str) -> Vec<Pod> {
        self.inner
            .read()
            .await
            .pods
            .values()
            .filter(|p| p.node_name.as_deref() == Some(node_name))
            .cloned()
            .collect()
    }

    /// Add pods to the sandbox. Pod names must be unique.
    pub async fn add_pods(&self, pods: Vec<Pod>) -> SandboxResult<()> {
        let mut state = self.inner.write().await;
        for pod in &pods {
            if state.pods.contains_key(&pod.name) {
                return Err(SandboxError::DuplicatePod(pod.name.clone()));
            }
        }
        for pod in pods {
            state.pods.insert(pod.name.clone(), pod);
        }
        Ok(())
    }

    /// Instantiate `count` pods from a template.
    pub async fn create_pods_from_template(
        &self,
        template: &PodTemplate,
        count: u32,
    ) -> SandboxResult<()> {
        let pods: Vec<Pod> = (0..count).map(|i| template.instantiate(i)).collect();
        debug!(template = %template.name, count, "creating pods from template");
        self.add_pods(pods).await
    }

    /// Bind a pod to a node. Called by the scheduling component only.
    pub async fn bind_pod(&self, pod_name: &str, node_name: &str) -> SandboxResult<()> {
        let mut state = self.inner.write().await;
        if !state.nodes.contains_key(node_name) {
            return Err(SandboxError::NodeNotFound(node_name.to_string()));
        }
        let pod = state
            .pods
            .get_mut(pod_name)
            .ok_or_else(|| SandboxError::PodNotFound(pod_name.to_string()))?;
        pod.node_name = Some(node_name.to_string());
        debug!(pod = pod_name, node = node_name, "pod bound");
        Ok(())
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Remove every node and pod carrying the given label, returning
    /// `(nodes_removed, pods_removed)`. Pods left bound to a removed
    /// node are unbound.
    pub async fn remove_labeled(&self, key: &str, value: &str) -> (usize, usize) {
        let mut state = self.inner.write().await;

        let doomed_nodes: Vec<String> = state
            .nodes
            .values()
            .filter(|n| n.has_label(key, value))
            .map(|n| n.name.clone())
            .collect();
        for name in &doomed_nodes {
            state.nodes.remove(name);
        }

        let doomed_pods: Vec<String> = state
            .pods
            .values()
            .filter(|p| p.has_label(key, value))
            .map(|p| p.name.clone())
            .collect();
        for name in &doomed_pods {
            state.pods.remove(name);
        }

        for pod in state.pods.values_mut() {
            if let Some(bound) = &pod.node_name
                && doomed_nodes.contains(bound)
            {
                pod.node_name = None;
            }
        }

        debug!(
            key,
            value,
            nodes = doomed_nodes.len(),
            pods = doomed_pods.len(),
            "labeled objects removed"
        );
        (doomed_nodes.len(), doomed_pods.len())
    }

    /// Remove every object from the sandbox.
    pub async fn clear_all(&self) {
        let mut state = self.inner.write().await;
        let (n, p) = (state.nodes.len(), state.pods.len());
        state.nodes.clear();
        state.pods.clear();
        debug!(nodes = n, pods = p, "sandbox cleared");
    }

    /// Materialize the source cluster's node set into the sandbox.
    ///
    /// For each worker pool, nodes are added until the pool's live count
    /// reaches its configured `current` size, spreading across the
    /// pool's zones round-robin. Idempotent: pools already at or above
    /// `current` are left alone.
    pub async fn seed_from_spec(
        &self,
        spec: &ClusterSpec,
        catalog: &MachineCatalog,
    ) -> SandboxResult<usize> {
        let mut added = 0usize;
        for pool in &spec.worker_pools {
            let machine = catalog
                .get(&pool.machine_type)
                .ok_or_else(|| SandboxError::UnknownMachineType(pool.machine_type.clone()))?;
            let existing = self.list_nodes_in_pool(&pool.name).await.len() as u32;
            for i in existing..pool.current {
                let zone = if pool.zones.is_empty() {
                    None
                } else {
                    Some(pool.zones[i as usize % pool.zones.len()].as_str())
                };
                let name = match zone {
                    Some(z) => format!("{}-{}-seed-{}", pool.name, z, i),
                    None => format!("{}-seed-{}", pool.name, i),
                };
                let mut node = Node::from_machine(&name, &pool.name, machine, zone);
                node.taints = pool.taints.clone();
                self.add_nodes(vec![node]).await?;
                added += 1;
            }
        }
        Ok(added)
    }
}
