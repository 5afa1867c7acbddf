//! Narrow pod view
//!
//! Decodes only `spec.containers[*].name` and
//! `spec.containers[*].resources.requests.cpu`. Every level is optional at
//! decode time so that a missing field is reported as a [`ShapeError`] naming
//! the container, rather than as an opaque decode failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pod fields read by the CPU synthesizer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    /// Pod spec
    #[serde(default)]
    pub spec: Option<PodSpec>,
}

/// Pod spec fields read by the CPU synthesizer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSpec {
    /// Containers in declaration order
    #[serde(default)]
    pub containers: Option<Vec<Container>>,
}

/// Container fields read by the CPU synthesizer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container name; tolerated as absent or `null`
    #[serde(default)]
    pub name: Option<String>,

    /// Resource requirements
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

/// Container resource requirements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// Requested resources
    #[serde(default)]
    pub requests: Option<ResourceRequests>,
}

/// Requested resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequests {
    /// CPU quantity, e.g. `250m`
    #[serde(default)]
    pub cpu: Option<String>,
}

/// A field the synthesizer needs is absent from the pod
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// The pod has no `spec`
    #[error("pod has no spec")]
    MissingSpec,

    /// The pod spec has no `containers`
    #[error("pod spec has no containers")]
    MissingContainers,

    /// A container lacks part of `resources.requests.cpu`
    #[error("container {index} ({name}) is missing {field}")]
    MissingField {
        /// Index of the container in `spec.containers`
        index: usize,
        /// Container name
        name: String,
        /// Dotted path of the missing field, relative to the container
        field: &'static str,
    },
}

impl Pod {
    /// Containers in declaration order
    pub fn containers(&self) -> Result<&[Container], ShapeError> {
        self.spec
            .as_ref()
            .ok_or(ShapeError::MissingSpec)?
            .containers
            .as_deref()
            .ok_or(ShapeError::MissingContainers)
    }
}

impl Container {
    /// Container name, empty when the pod omits it
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// The requested CPU quantity, exactly as written in the pod
    ///
    /// `index` is only used to attribute a [`ShapeError`].
    pub fn cpu_request(&self, index: usize) -> Result<&str, ShapeError> {
        let missing = |field| ShapeError::MissingField {
            index,
            name: self.name().to_string(),
            field,
        };

        self.resources
            .as_ref()
            .ok_or_else(|| missing("resources"))?
            .requests
            .as_ref()
            .ok_or_else(|| missing("resources.requests"))?
            .cpu
            .as_deref()
            .ok_or_else(|| missing("resources.requests.cpu"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_and_ignores_unrelated_fields() {
        let pod: Pod = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "containers": [{
                    "name": "nginx",
                    "image": "nginx:1.27",
                    "resources": {
                        "requests": {"cpu": "200m", "memory": "64Mi"},
                        "limits": {"cpu": "1"}
                    }
                }]
            }
        }))
        .unwrap();

        let containers = pod.containers().unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name(), "nginx");
        assert_eq!(containers[0].cpu_request(0).unwrap(), "200m");
    }

    #[test]
    fn test_missing_spec_and_containers() {
        let pod: Pod = serde_json::from_value(json!({"metadata": {}})).unwrap();
        assert_eq!(pod.containers().unwrap_err(), ShapeError::MissingSpec);

        let pod: Pod = serde_json::from_value(json!({"spec": {}})).unwrap();
        assert_eq!(pod.containers().unwrap_err(), ShapeError::MissingContainers);
    }

    #[test]
    fn test_missing_cpu_names_the_container_and_field() {
        let pod: Pod = serde_json::from_value(json!({
            "spec": {"containers": [
                {"name": "a", "resources": {"requests": {"cpu": "10m"}}},
                {"name": "b", "resources": {"requests": {"memory": "1Gi"}}},
                {"name": "c", "resources": {}},
                {"name": "d"}
            ]}
        }))
        .unwrap();
        let containers = pod.containers().unwrap();

        let err = containers[1].cpu_request(1).unwrap_err();
        assert_eq!(
            err,
            ShapeError::MissingField {
                index: 1,
                name: "b".to_string(),
                field: "resources.requests.cpu",
            }
        );
        assert_eq!(err.to_string(), "container 1 (b) is missing resources.requests.cpu");

        assert!(matches!(
            containers[2].cpu_request(2),
            Err(ShapeError::MissingField { field: "resources.requests", .. })
        ));
        assert!(matches!(
            containers[3].cpu_request(3),
            Err(ShapeError::MissingField { field: "resources", .. })
        ));
    }

    #[test]
    fn test_null_or_absent_name_reads_as_empty() {
        let pod: Pod = serde_json::from_value(json!({
            "spec": {"containers": [
                {"name": null, "resources": {"requests": {"cpu": "10m"}}},
                {"resources": {}}
            ]}
        }))
        .unwrap();
        let containers = pod.containers().unwrap();

        assert_eq!(containers[0].name, None);
        assert_eq!(containers[0].name(), "");
        assert_eq!(containers[0].cpu_request(0).unwrap(), "10m");
        assert_eq!(
            containers[1].cpu_request(1).unwrap_err().to_string(),
            "container 1 () is missing resources.requests"
        );
    }

    #[test]
    fn test_wrong_types_fail_to_decode() {
        assert!(serde_json::from_value::<Pod>(json!("not a pod")).is_err());
        assert!(serde_json::from_value::<Pod>(json!({"spec": 42})).is_err());
        assert!(serde_json::from_value::<Pod>(json!({
            "spec": {"containers": [{"name": "a", "resources": {"requests": {"cpu": 2}}}]}
        }))
        .is_err());
    }
}
