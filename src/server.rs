//! HTTPS server for the webhook

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::info;

use crate::webhook::{webhook_router, WebhookState};
use crate::{Error, Result};

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// TLS certificate PEM
    pub cert_pem: String,
    /// TLS private key PEM
    pub key_pem: String,
    /// How long in-flight reviews may run after shutdown starts
    pub shutdown_grace: Duration,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("shutdown_grace", &self.shutdown_grace)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Build a configuration from PEM files on disk
    pub async fn from_pem_files(
        addr: SocketAddr,
        cert_file: &Path,
        key_file: &Path,
        shutdown_grace: Duration,
    ) -> Result<Self> {
        let cert_pem = tokio::fs::read_to_string(cert_file).await.map_err(|e| {
            Error::config(format!("failed to read cert file {}: {e}", cert_file.display()))
        })?;
        let key_pem = tokio::fs::read_to_string(key_file).await.map_err(|e| {
            Error::config(format!("failed to read key file {}: {e}", key_file.display()))
        })?;

        Ok(Self {
            addr,
            cert_pem,
            key_pem,
            shutdown_grace,
        })
    }
}

/// Start the webhook HTTPS server
///
/// Runs until the process receives SIGTERM or SIGINT, then drains in-flight
/// reviews for up to `shutdown_grace`.
pub async fn start_server(config: ServerConfig, state: Arc<WebhookState>) -> Result<()> {
    let app = webhook_router(state);

    let tls_config =
        RustlsConfig::from_pem(config.cert_pem.into_bytes(), config.key_pem.into_bytes())
            .await
            .map_err(|e| Error::config(format!("TLS config error: {e}")))?;

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    let grace = config.shutdown_grace;
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!(grace_secs = grace.as_secs(), "Shutdown signal received, draining");
        shutdown_handle.graceful_shutdown(Some(grace));
    });

    info!(addr = %config.addr, "Starting webhook server");

    axum_server::bind_rustls(config.addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::server(e.to_string()))?;

    info!("Webhook server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                tracing::warn!("Failed to register signal handlers, falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_pem_files_reports_missing_cert() {
        let err = ServerConfig::from_pem_files(
            "127.0.0.1:0".parse().expect("valid addr"),
            Path::new("/nonexistent/tls.crt"),
            Path::new("/nonexistent/tls.key"),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("/nonexistent/tls.crt"));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let config = ServerConfig {
            addr: "127.0.0.1:8003".parse().expect("valid addr"),
            cert_pem: "CERT".to_string(),
            key_pem: "SECRET-KEY".to_string(),
            shutdown_grace: Duration::from_secs(10),
        };
        let rendered = format!("{config:?}");
        assert!(rendered.contains("127.0.0.1:8003"));
        assert!(!rendered.contains("SECRET-KEY"));
    }
}
