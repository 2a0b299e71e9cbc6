//! deploy-mutator - mutating admission webhook for Kubernetes Deployments
//!
//! The API server calls this webhook synchronously on every Deployment
//! create/update. Each review is decoded, run through the mutation policies
//! and answered with a JSON Patch; the webhook never denies a request.
//!
//! # Modules
//!
//! - [`codec`] - AdmissionReview and Deployment decoding/encoding
//! - [`policy`] - Annotation and replica-cap policies
//! - [`patch`] - Ordered patch merging
//! - [`webhook`] - Review handler and HTTP routes
//! - [`server`] - HTTPS listener
//! - [`error`] - Error types and HTTP status mapping

#![deny(missing_docs)]

pub mod codec;
pub mod error;
pub mod patch;
pub mod policy;
pub mod server;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default listen address for the HTTPS server
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8003";

/// Default time in-flight reviews get to finish after a shutdown signal
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;
