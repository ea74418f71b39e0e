//! gridsim-core — shared domain types for the scaling recommender.
//!
//! Holds the cluster data model (nodes, pods, worker pools, machine
//! catalog) and the `gridsim.toml` configuration parser. Every other
//! crate in the workspace builds on these types; this crate has no
//! knowledge of the sandbox, the scheduler, or HTTP.

pub mod config;
pub mod types;

pub use config::{GridsimConfig, TrialSettings, WeightSettings};
pub use types::*;
