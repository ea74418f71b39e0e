//! YAML pod templates.
//!
//! Pending workload is deployed into the sandbox from a template plus a
//! replica count; each replica becomes one `Pod` named `{name}-{index}`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gridsim_core::{Pod, Resources, Toleration};

/// A pod template loaded from a YAML manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodTemplate {
    pub name: String,
    pub requests: Resources,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
    #[serde(default)]
    pub node_selector: BTreeMap<String, String>,
}

impl PodTemplate {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let template: PodTemplate = serde_yaml::from_str(content)?;
        Ok(template)
    }

    /// Build the `index`-th replica of this template.
    pub fn instantiate(&self, index: u32) -> Pod {
        Pod {
            name: format!("{}-{}", self.name, index),
            labels: self.labels.clone(),
            requests: self.requests,
            tolerations: self.tolerations.clone(),
            node_selector: self.node_selector.clone(),
            node_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
name: batch-job
requests:
  cpu_millis: 500
  memory_bytes: 1073741824
labels:
  app: batch
tolerations:
  - key: workload
    value: batch
"#;

    #[test]
    fn parses_manifest() {
        let template = PodTemplate::from_yaml(MANIFEST).unwrap();
        assert_eq!(template.name, "batch-job");
        assert_eq!(template.requests.cpu_millis, 500);
        assert_eq!(template.tolerations.len(), 1);
        assert!(template.node_selector.is_empty());
    }

    #[test]
    fn instantiate_numbers_replicas() {
        let template = PodTemplate::from_yaml(MANIFEST).unwrap();
        let p0 = template.instantiate(0);
        let p2 = template.instantiate(2);

        assert_eq!(p0.name, "batch-job-0");
        assert_eq!(p2.name, "batch-job-2");
        assert!(!p0.is_scheduled());
        assert_eq!(p0.labels.get("app").map(String::as_str), Some("batch"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(PodTemplate::from_yaml("requests: [nonsense").is_err());
    }
}
