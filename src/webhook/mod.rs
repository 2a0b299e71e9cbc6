//! Mutating Admission Webhook
//!
//! This module provides a mutating admission webhook that intercepts Deployment
//! create/update operations and patches them before persistence:
//! - the configured annotation (`env-type=test` by default) is forced on
//! - `spec.replicas` is capped at the configured bound (3 by default)

pub mod deployment;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::codec::Codec;
use crate::policy::PolicyConfig;

pub use deployment::MutationHandler;

/// Path the MutatingWebhookConfiguration points at
pub const MUTATE_PATH: &str = "/mutating-demo";

/// Shared state for webhook handlers
#[derive(Debug, Clone)]
pub struct WebhookState {
    /// Review handler, immutable for the life of the process
    pub handler: MutationHandler,
}

impl WebhookState {
    /// Create a new webhook state from a codec and a policy configuration
    pub fn new(codec: Codec, policy: PolicyConfig) -> Self {
        Self {
            handler: MutationHandler::new(codec, policy),
        }
    }
}

impl Default for WebhookState {
    fn default() -> Self {
        Self::new(Codec::new(), PolicyConfig::default())
    }
}

/// Create the webhook router with all mutation endpoints
///
/// Currently supports:
/// - POST /mutating-demo - Mutate Deployments
/// - GET /healthz - Liveness/readiness probe
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_PATH, post(deployment::mutate_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}
