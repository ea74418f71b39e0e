//! gridsim-sandbox — the disposable cluster copy.
//!
//! The sandbox is a shared in-memory store of nodes and pods that
//! scaling trials mutate freely. Isolation between concurrent trials is
//! achieved purely through labels: every listing operation supports
//! label filtering, and `remove_labeled` tears down everything a trial
//! created in one call.
//!
//! The crate also hosts the sandbox's scheduling component — the
//! authority for pod-to-node placement inside the sandbox — and YAML
//! pod template loading.

pub mod error;
pub mod scheduler;
pub mod store;
pub mod template;

pub use error::{SandboxError, SandboxResult};
pub use scheduler::{Scheduler, wait_for_placement};
pub use store::Sandbox;
pub use template::PodTemplate;
