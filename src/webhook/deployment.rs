//! Deployment Mutation Webhook
//!
//! Handles AdmissionReview requests for Deployment resources, forcing the
//! configured annotation and capping the replica count.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::header,
    response::{IntoResponse, Response},
};
use json_patch::Patch;
use k8s_openapi::api::apps::v1::Deployment;
use kube::core::admission::AdmissionResponse;
use tracing::{debug, error, info, instrument, Span};

use crate::codec::Codec;
use crate::patch::merge_patches;
use crate::policy::{annotation_patch, replica_cap_patch, PolicyConfig};
use crate::{Error, Result};

use super::WebhookState;

/// Turns a raw AdmissionReview body into a raw AdmissionReview response
///
/// Holds only immutable values, so one instance is shared by every request.
#[derive(Debug, Clone)]
pub struct MutationHandler {
    codec: Codec,
    policy: PolicyConfig,
}

impl MutationHandler {
    /// Create a handler that applies `policy` to reviews decoded with `codec`
    pub fn new(codec: Codec, policy: PolicyConfig) -> Self {
        Self { codec, policy }
    }

    /// Policy values this handler enforces
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Process a single review body
    ///
    /// Any failure aborts the whole review; no partial patch is ever returned.
    pub fn review(&self, body: &[u8]) -> Result<Vec<u8>> {
        let request = self.codec.decode_review(body)?;
        let deployment = self.codec.decode_deployment(&request)?;
        let name = deployment_ref(&deployment);

        let patch = self.build_patch(&name, &deployment)?;

        info!(
            uid = %request.uid,
            deployment = %name,
            operation = ?request.operation,
            patch_ops = patch.0.len(),
            "Applying patch to deployment"
        );

        let response = AdmissionResponse::from(&request)
            .with_patch(patch)
            .map_err(|e| Error::encode(format!("patch serialization error: {e}")))?;

        self.codec.encode_review(&response.into_review())
    }

    /// Evaluate every policy against the Deployment
    ///
    /// The replica patch, when present, comes before the annotation patch.
    fn build_patch(&self, name: &str, deployment: &Deployment) -> Result<Patch> {
        let annotation = annotation_patch(deployment.metadata.annotations.as_ref(), &self.policy);

        let replicas = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .ok_or_else(|| Error::MissingReplicas(name.to_string()))?;

        if replicas > self.policy.max_replicas {
            debug!(
                deployment = %name,
                replicas,
                max_replicas = self.policy.max_replicas,
                "Capping replica count"
            );
            let capped = replica_cap_patch(replicas, &self.policy);
            merge_patches([capped, annotation])
        } else {
            Ok(annotation)
        }
    }
}

/// Handle mutating admission review for Deployments
///
/// Responds 200 with an AdmissionReview on success, otherwise the status
/// mapped from [`Error`] and a JSON error body. Every call runs inside an
/// `admission_review` span that records the body size, final status and
/// latency.
#[instrument(
    name = "admission_review",
    skip_all,
    fields(body_bytes = tracing::field::Empty, status = tracing::field::Empty)
)]
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();

    let response = match body {
        Ok(body) => {
            Span::current().record("body_bytes", body.len());
            match state.handler.review(&body) {
                Ok(review) => {
                    ([(header::CONTENT_TYPE, "application/json")], review).into_response()
                }
                Err(e) => {
                    error!(error = %e, status = %e.status(), "Admission review failed");
                    e.into_response()
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to read request body");
            Error::read(e.body_text()).into_response()
        }
    };

    Span::current().record("status", response.status().as_u16());
    info!(
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Admission review served"
    );
    response
}

/// `namespace/name` of a Deployment for logs and errors
fn deployment_ref(deployment: &Deployment) -> String {
    let meta = &deployment.metadata;
    let name = meta
        .name
        .as_deref()
        .or(meta.generate_name.as_deref())
        .unwrap_or("<unnamed>");
    match meta.namespace.as_deref() {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    }
}
