//! Deployment mutation policies
//!
//! Each policy is a pure function from the decoded Deployment's fields to a
//! JSON Patch. Policies never touch the decoded object; the patch is the only
//! description of the intended change.

use std::collections::BTreeMap;

use json_patch::{AddOperation, Patch, PatchOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use serde_json::Value;

/// Default annotation key stamped on every admitted Deployment
pub const DEFAULT_ANNOTATION_KEY: &str = "env-type";

/// Default annotation value stamped on every admitted Deployment
pub const DEFAULT_ANNOTATION_VALUE: &str = "test";

/// Default inclusive upper bound on `spec.replicas`
pub const DEFAULT_MAX_REPLICAS: i32 = 3;

/// Values the mutation policies enforce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Annotation key that must be present on every Deployment
    pub annotation_key: String,
    /// Value the annotation is forced to
    pub annotation_value: String,
    /// Inclusive upper bound on the replica count
    pub max_replicas: i32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            annotation_key: DEFAULT_ANNOTATION_KEY.to_string(),
            annotation_value: DEFAULT_ANNOTATION_VALUE.to_string(),
            max_replicas: DEFAULT_MAX_REPLICAS,
        }
    }
}

/// Build the patch that forces the configured annotation
///
/// Always yields exactly one operation:
/// - key present (any value): `replace` at `/metadata/annotations/<key>`
/// - no annotations at all: `add` of the whole `/metadata/annotations` map
/// - annotations present without the key: `add` at `/metadata/annotations/<key>`,
///   leaving the other annotations in place
pub fn annotation_patch(
    annotations: Option<&BTreeMap<String, String>>,
    config: &PolicyConfig,
) -> Patch {
    let key = config.annotation_key.as_str();
    let value = Value::String(config.annotation_value.clone());

    let op = match annotations {
        Some(existing) if existing.contains_key(key) => PatchOperation::Replace(ReplaceOperation {
            path: PointerBuf::from_tokens(["metadata", "annotations", key]),
            value,
        }),
        Some(_) => PatchOperation::Add(AddOperation {
            path: PointerBuf::from_tokens(["metadata", "annotations", key]),
            value,
        }),
        None => PatchOperation::Add(AddOperation {
            path: PointerBuf::from_tokens(["metadata", "annotations"]),
            value: serde_json::json!({ key: value }),
        }),
    };

    Patch(vec![op])
}

/// Build the patch that caps `spec.replicas` at the configured bound
///
/// Empty when `replicas` is already within the bound.
pub fn replica_cap_patch(replicas: i32, config: &PolicyConfig) -> Patch {
    if replicas <= config.max_replicas {
        return Patch(Vec::new());
    }

    Patch(vec![PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens(["spec", "replicas"]),
        value: Value::from(config.max_replicas),
    })])
}
