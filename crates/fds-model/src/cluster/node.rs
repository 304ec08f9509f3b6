use serde::{Deserialize, Serialize};

use crate::Labels;

/// Cluster node with its labels.
///
/// Topology keys (zone, region, hostname...) are ordinary node labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique node name.
    pub name: String,
    /// Node labels, including topology labels.
    #[serde(default, skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
}

impl Node {
    /// Create a node without labels.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
        }
    }

    /// Attach a label.
    ///
    /// This is a builder-style helper.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key, value);
        self
    }
}
