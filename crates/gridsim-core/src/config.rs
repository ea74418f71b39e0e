//! gridsim.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{ClusterSpec, MachineCatalog, MachineType};

/// Top-level configuration for the gridsim daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridsimConfig {
    pub cluster: ClusterSpec,
    pub machines: Vec<MachineType>,
    #[serde(default)]
    pub trial: TrialSettings,
    #[serde(default)]
    pub weights: WeightSettings,
}

/// Timing knobs for one simulation trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSettings {
    /// Upper bound on how long a trial waits for the sandbox scheduler
    /// to place its pods.
    #[serde(default = "default_placement_timeout_secs")]
    pub placement_timeout_secs: u64,
    /// How often a waiting trial re-checks placement.
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
}

impl TrialSettings {
    pub fn placement_timeout(&self) -> Duration {
        Duration::from_secs(self.placement_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

impl Default for TrialSettings {
    fn default() -> Self {
        Self {
            placement_timeout_secs: default_placement_timeout_secs(),
            poll_interval_millis: default_poll_interval_millis(),
        }
    }
}

/// Strategy weight coefficients, constant for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSettings {
    #[serde(default = "default_weight")]
    pub waste: f64,
    #[serde(default = "default_weight")]
    pub cost: f64,
}

impl Default for WeightSettings {
    fn default() -> Self {
        Self { waste: default_weight(), cost: default_weight() }
    }
}

fn default_placement_timeout_secs() -> u64 {
    15
}

fn default_poll_interval_millis() -> u64 {
    250
}

fn default_weight() -> f64 {
    1.0
}

impl GridsimConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GridsimConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn catalog(&self) -> MachineCatalog {
        MachineCatalog::from_machines(self.machines.iter().cloned())
    }
}
