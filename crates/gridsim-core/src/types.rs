//! Cluster data model shared across gridsim crates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resource quantity pair used for both capacity and requests.
///
/// CPU is tracked in millicores, memory in bytes, so all arithmetic
/// stays integral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub cpu_millis: u64,
    pub memory_bytes: u64,
}

impl Resources {
    pub fn new(cpu_millis: u64, memory_bytes: u64) -> Self {
        Self { cpu_millis, memory_bytes }
    }

    /// True when `self` fits entirely inside `avail`.
    pub fn fits_within(&self, avail: &Resources) -> bool {
        self.cpu_millis <= avail.cpu_millis && self.memory_bytes <= avail.memory_bytes
    }

    pub fn plus(&self, other: &Resources) -> Resources {
        Resources {
            cpu_millis: self.cpu_millis + other.cpu_millis,
            memory_bytes: self.memory_bytes + other.memory_bytes,
        }
    }

    /// Subtraction that floors at zero rather than underflowing.
    pub fn minus_saturating(&self, other: &Resources) -> Resources {
        Resources {
            cpu_millis: self.cpu_millis.saturating_sub(other.cpu_millis),
            memory_bytes: self.memory_bytes.saturating_sub(other.memory_bytes),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.cpu_millis == 0 && self.memory_bytes == 0
    }
}

/// A node taint. Pods without a matching toleration are kept off the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taint {
    pub key: String,
    pub value: String,
}

impl Taint {
    pub fn new(key: &str, value: &str) -> Self {
        Self { key: key.to_string(), value: value.to_string() }
    }
}

/// A pod toleration — matches a taint with the same key and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toleration {
    pub key: String,
    pub value: String,
}

impl Toleration {
    pub fn new(key: &str, value: &str) -> Self {
        Self { key: key.to_string(), value: value.to_string() }
    }

    pub fn tolerates(&self, taint: &Taint) -> bool {
        self.key == taint.key && self.value == taint.value
    }
}

/// Label carrying a node's worker pool membership.
pub const POOL_LABEL: &str = "gridsim.io/pool";
/// Label carrying a node's availability zone.
pub const ZONE_LABEL: &str = "topology.gridsim.io/zone";

/// A node in the (sandbox) cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Worker pool this node belongs to.
    pub pool: String,
    pub machine_type: String,
    pub zone: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub taints: Vec<Taint>,
    /// Schedulable capacity of the node.
    pub allocatable: Resources,
}

impl Node {
    /// Build a node of the given machine shape for a pool.
    pub fn from_machine(
        name: &str,
        pool: &str,
        machine: &MachineType,
        zone: Option<&str>,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(POOL_LABEL.to_string(), pool.to_string());
        if let Some(z) = zone {
            labels.insert(ZONE_LABEL.to_string(), z.to_string());
        }
        Self {
            name: name.to_string(),
            pool: pool.to_string(),
            machine_type: machine.name.clone(),
            zone: zone.map(str::to_string),
            labels,
            taints: Vec::new(),
            allocatable: machine.allocatable(),
        }
    }

    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }
}

/// A workload unit — an opaque placement request.
///
/// The recommender only reads and copies pods; placement semantics
/// (tolerations, selectors, requests) belong to the sandbox scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub requests: Resources,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
    /// Required node labels — all must match for the pod to land.
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
    /// The node this pod is bound to, if any.
    #[serde(default)]
    pub node_name: Option<String>,
}

impl Pod {
    pub fn is_scheduled(&self) -> bool {
        self.node_name.is_some()
    }

    pub fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.get(key).is_some_and(|v| v == value)
    }

    /// True when every taint on the node is covered by a toleration.
    pub fn tolerates(&self, node: &Node) -> bool {
        node.taints
            .iter()
            .all(|taint| self.tolerations.iter().any(|t| t.tolerates(taint)))
    }

    /// True when every node-selector entry matches a node label.
    pub fn matches_selector(&self, node: &Node) -> bool {
        self.node_selector
            .iter()
            .all(|(k, v)| node.labels.get(k).is_some_and(|nv| nv == v))
    }
}

/// A machine shape from the catalog: capacity plus hourly cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineType {
    pub name: String,
    pub cpu_millis: u64,
    pub memory_bytes: u64,
    pub hourly_cost: f64,
}

impl MachineType {
    pub fn allocatable(&self) -> Resources {
        Resources::new(self.cpu_millis, self.memory_bytes)
    }
}

/// Lookup table of machine shapes keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MachineCatalog {
    machines: BTreeMap<String, MachineType>,
}

impl MachineCatalog {
    pub fn from_machines(machines: impl IntoIterator<Item = MachineType>) -> Self {
        Self {
            machines: machines
                .into_iter()
                .map(|m| (m.name.clone(), m))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MachineType> {
        self.machines.get(name)
    }

    /// Hourly cost of the most expensive catalog machine, used as the
    /// normalization reference for scoring.
    pub fn max_hourly_cost(&self) -> Option<f64> {
        self.machines
            .values()
            .map(|m| m.hourly_cost)
            .fold(None, |acc, c| match acc {
                Some(max) if max >= c => Some(max),
                _ => Some(c),
            })
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

/// Configured definition of a worker pool in the source cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPoolSpec {
    pub name: String,
    #[serde(default)]
    pub zones: Vec<String>,
    pub machine_type: String,
    pub min: u32,
    pub max: u32,
    /// Node count in the source cluster at config time. Used only to
    /// seed the sandbox; live counts are always re-queried.
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub taints: Vec<Taint>,
}

/// The source cluster: a name plus its worker pool definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub name: String,
    pub worker_pools: Vec<WorkerPoolSpec>,
}

/// Immutable snapshot of a worker pool taken at the start of a round.
///
/// `current` reflects the live sandbox node count at snapshot time;
/// staleness across rounds is expected, the pool list is re-derived
/// every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePool {
    pub name: String,
    pub zones: Vec<String>,
    pub machine_type: String,
    pub max: u32,
    pub current: u32,
    pub taints: Vec<Taint>,
}
