//! API object shapes and their conversion into model types.
//!
//! Only the fields the controller reads are declared; everything else is ignored.
//! Deployments additionally keep their raw JSON so that an update re-submits the
//! object unchanged apart from the pod template annotations.
use serde::Deserialize;
use serde_json::{Map, Value};

use fds_core::UpdateError;
use fds_model::{AntiAffinityTerm, LabelSelector, Labels, Node, Pod, Workload};

const API_VERSION: &str = "apps/v1";

#[derive(Debug, Deserialize)]
pub(crate) struct List<T> {
    // a plain `default` would require `T: Default`
    #[serde(default = "Vec::new")]
    pub(crate) items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    labels: Option<Labels>,
    #[serde(default)]
    annotations: Option<Labels>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NodeObject {
    #[serde(default)]
    metadata: ObjectMeta,
}

impl From<NodeObject> for Node {
    fn from(obj: NodeObject) -> Self {
        Node {
            name: obj.metadata.name,
            labels: obj.metadata.labels.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PodObject {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: PodSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    node_name: Option<String>,
    #[serde(default)]
    affinity: Option<Affinity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Affinity {
    #[serde(default)]
    pod_anti_affinity: Option<PodAntiAffinity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodAntiAffinity {
    /// Preferred terms are ignored: only hard rules are enforced.
    #[serde(default)]
    required_during_scheduling_ignored_during_execution: Option<Vec<AntiAffinityTerm>>,
}

impl PodObject {
    /// Convert, defaulting the namespace to the one queried.
    pub(crate) fn into_pod(self, namespace: &str) -> Pod {
        let anti_affinity = self
            .spec
            .affinity
            .and_then(|a| a.pod_anti_affinity)
            .and_then(|a| a.required_during_scheduling_ignored_during_execution)
            .unwrap_or_default();

        Pod {
            name: self.metadata.name,
            namespace: self
                .metadata
                .namespace
                .unwrap_or_else(|| namespace.to_string()),
            node_name: self.spec.node_name.filter(|n| !n.is_empty()),
            labels: self.metadata.labels.unwrap_or_default(),
            anti_affinity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeploymentObject {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: DeploymentSpec,
}

#[derive(Debug, Default, Deserialize)]
struct DeploymentSpec {
    #[serde(default)]
    selector: Option<LabelSelector>,
    #[serde(default)]
    template: Option<PodTemplate>,
}

#[derive(Debug, Default, Deserialize)]
struct PodTemplate {
    #[serde(default)]
    metadata: ObjectMeta,
}

/// Convert a raw deployment into a workload, keeping the raw object.
///
/// A deployment without selector gets an empty one, which the API server never
/// produces for `apps/v1`.
pub(crate) fn workload_from_value(raw: Value) -> Result<Workload, serde_json::Error> {
    let obj: DeploymentObject = serde_json::from_value(raw.clone())?;

    let mut object = raw;
    // list items come without type meta; PUT expects it
    if let Value::Object(map) = &mut object {
        map.entry("apiVersion")
            .or_insert_with(|| Value::from(API_VERSION));
        map.entry("kind")
            .or_insert_with(|| Value::from(fds_model::WORKLOAD_KIND));
    }

    let template_annotations = obj
        .spec
        .template
        .and_then(|t| t.metadata.annotations)
        .unwrap_or_default();

    Ok(Workload {
        namespace: obj.metadata.namespace.unwrap_or_default(),
        name: obj.metadata.name,
        selector: obj.spec.selector.unwrap_or_default(),
        template_annotations,
        object,
    })
}

/// Raw object to submit for `workload`: the stored object with
/// `spec.template.metadata.annotations` replaced by the workload's template annotations.
pub(crate) fn updated_object(workload: &Workload) -> Result<Value, UpdateError> {
    let mut object = workload.object.clone();
    let root = object
        .as_object_mut()
        .ok_or_else(|| UpdateError::InvalidObject(format!("{} is not a JSON object", workload.reference())))?;

    let annotations: Map<String, Value> = workload
        .template_annotations
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(v)))
        .collect();

    let metadata = child(root, "spec", workload)
        .and_then(|spec| child(spec, "template", workload))
        .and_then(|template| child(template, "metadata", workload))?;
    metadata.insert("annotations".into(), Value::Object(annotations));

    Ok(object)
}

/// Object-valued child of `parent`, created if missing.
fn child<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
    workload: &Workload,
) -> Result<&'a mut Map<String, Value>, UpdateError> {
    parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| {
            UpdateError::InvalidObject(format!("{}: '{key}' is not an object", workload.reference()))
        })
}
