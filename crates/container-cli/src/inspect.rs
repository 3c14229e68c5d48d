use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ContainerError, ContainerResult};

/// The subset of `docker inspect` / `docker image inspect` output we read.
///
/// Both commands print a JSON array with one object per target; images and
/// containers share the `Config` shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectDocument {
    #[serde(default)]
    pub config: InspectConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectConfig {
    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,
}

impl InspectDocument {
    /// Parse the raw output of an inspect command for `target`.
    pub fn parse(target: &str, raw: &str) -> ContainerResult<Self> {
        let docs: Vec<InspectDocument> =
            serde_json::from_str(raw).map_err(|e| ContainerError::Inspect {
                target: target.to_string(),
                detail: e.to_string(),
            })?;
        docs.into_iter().next().ok_or_else(|| ContainerError::Inspect {
            target: target.to_string(),
            detail: "empty inspect result".to_string(),
        })
    }

    /// `true` when the image ships a self-configuring entrypoint script.
    pub fn declares_entrypoint(&self) -> bool {
        let in_entrypoint = self
            .config
            .entrypoint
            .iter()
            .flatten()
            .any(|part| part.contains("entrypoint"));
        let in_labels = self
            .config
            .labels
            .iter()
            .flatten()
            .any(|(k, v)| k.contains("entrypoint") || v.contains("entrypoint"));
        in_entrypoint || in_labels
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.config
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// `true` when `key` is set to `"true"`.
    pub fn label_is_true(&self, key: &str) -> bool {
        self.label(key) == Some("true")
    }
}
