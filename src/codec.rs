//! AdmissionReview and Deployment wire codec
//!
//! The API server sends an `AdmissionReview` whose `request.object` holds the
//! Deployment under review. Decoding happens in two stages so that a broken
//! envelope and a broken embedded object are reported separately.
//!
//! Any version of the `admission.k8s.io` group is accepted. The response
//! envelope echoes the request's `apiVersion`, so a `v1beta1` caller gets a
//! `v1beta1` answer.

use k8s_openapi::api::apps::v1::Deployment;
use kube::core::admission::{AdmissionRequest, AdmissionReview};
use kube::core::{DynamicObject, TypeMeta};
use tracing::debug;

use crate::{Error, Result};

/// API group of the AdmissionReview envelope
pub const ADMISSION_GROUP: &str = "admission.k8s.io";

/// Kind of the AdmissionReview envelope
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// Kind of the only workload this webhook mutates
pub const DEPLOYMENT_KIND: &str = "Deployment";

/// Decoder/encoder for admission envelopes
///
/// Built once at startup and handed to the review handler. It holds no
/// mutable state, so one instance serves every concurrent request.
#[derive(Debug, Clone)]
pub struct Codec {
    review_group: &'static str,
    object_kind: &'static str,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    /// Create a codec for `admission.k8s.io` reviews of Deployments
    pub fn new() -> Self {
        Self {
            review_group: ADMISSION_GROUP,
            object_kind: DEPLOYMENT_KIND,
        }
    }

    /// Decode the raw request body into an admission request
    pub fn decode_review(&self, body: &[u8]) -> Result<AdmissionRequest<DynamicObject>> {
        let review: AdmissionReview<DynamicObject> = serde_json::from_slice(body)
            .map_err(|e| Error::decode(format!("failed to parse AdmissionReview: {e}")))?;

        self.check_envelope(&review.types)?;

        let request: AdmissionRequest<DynamicObject> = review
            .try_into()
            .map_err(|e| Error::decode(format!("failed to parse AdmissionReview: {e}")))?;

        debug!(
            uid = %request.uid,
            api_version = %request.types.api_version,
            operation = ?request.operation,
            "Decoded admission request"
        );
        Ok(request)
    }

    /// Decode the object embedded in the request as a Deployment
    pub fn decode_deployment(&self, request: &AdmissionRequest<DynamicObject>) -> Result<Deployment> {
        let object = request.object.as_ref().ok_or_else(|| {
            Error::decode(format!(
                "admission request {} carries no object",
                request.uid
            ))
        })?;

        if let Some(types) = &object.types {
            if types.kind != self.object_kind {
                return Err(Error::decode(format!(
                    "failed to parse Deployment: unsupported kind {}",
                    types.kind
                )));
            }
        }

        let value = serde_json::to_value(object)
            .map_err(|e| Error::decode(format!("failed to parse Deployment: {e}")))?;
        serde_json::from_value(value)
            .map_err(|e| Error::decode(format!("failed to parse Deployment: {e}")))
    }

    /// Serialize a response envelope
    pub fn encode_review(&self, review: &AdmissionReview<DynamicObject>) -> Result<Vec<u8>> {
        serde_json::to_vec(review)
            .map_err(|e| Error::encode(format!("failed to marshal AdmissionReview response: {e}")))
    }

    fn check_envelope(&self, types: &TypeMeta) -> Result<()> {
        let group = types
            .api_version
            .split_once('/')
            .map(|(group, _version)| group)
            .unwrap_or_default();

        if group != self.review_group || types.kind != ADMISSION_REVIEW_KIND {
            return Err(Error::decode(format!(
                "unsupported envelope {}/{}",
                types.api_version, types.kind
            )));
        }
        Ok(())
    }
}
