//! Trial scoring.
//!
//! A trial's score is a cost to minimize:
//!
//! ```text
//! score = waste_weight * waste + cost_weight * cost
//! ```
//!
//! `cost` is the total hourly cost of the trial's added nodes divided
//! by the most expensive catalog machine's cost; `waste` is the unused
//! fraction of the added capacity in the dominant (most constrained)
//! resource dimension. Both are dimensionless, so the weights tune
//! meaningfully across machine types.

use gridsim_core::{MachineType, Resources};

/// Caller-supplied weight coefficients, constant for a whole run.
#[derive(Debug, Clone, Copy)]
pub struct StrategyWeights {
    pub waste: f64,
    pub cost: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self { waste: 1.0, cost: 1.0 }
    }
}

/// Score one trial outcome.
///
/// `placed` holds the resource requests of the pods the scheduler
/// actually put onto the trial's `nodes_added` nodes of type `machine`.
/// `reference_cost` is the catalog's maximum hourly machine cost.
pub fn score_trial(
    machine: &MachineType,
    nodes_added: u32,
    placed: &[Resources],
    reference_cost: f64,
    weights: &StrategyWeights,
) -> f64 {
    let n = u64::from(nodes_added.max(1));
    let capacity = Resources::new(machine.cpu_millis * n, machine.memory_bytes * n);
    let used = placed
        .iter()
        .fold(Resources::default(), |acc, r| acc.plus(r));

    // Dominant dimension: the more constrained of cpu and memory.
    let cpu_util = utilization(used.cpu_millis, capacity.cpu_millis);
    let mem_util = utilization(used.memory_bytes, capacity.memory_bytes);
    let waste = 1.0 - cpu_util.max(mem_util).min(1.0);

    let cost = if reference_cost > 0.0 {
        machine.hourly_cost * nodes_added as f64 / reference_cost
    } else {
        0.0
    };

    weights.waste * waste + weights.cost * cost
}

fn utilization(used: u64, capacity: u64) -> f64 {
    if capacity == 0 { 0.0 } else { used as f64 / capacity as f64 }
}
