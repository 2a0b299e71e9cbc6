//! deploy-mutator - mutating admission webhook for Kubernetes Deployments

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deploy_mutator::codec::Codec;
use deploy_mutator::policy::PolicyConfig;
use deploy_mutator::server::{start_server, ServerConfig};
use deploy_mutator::webhook::WebhookState;
use deploy_mutator::{DEFAULT_LISTEN_ADDR, DEFAULT_SHUTDOWN_GRACE_SECS};

/// Mutating admission webhook that stamps and caps Deployments
#[derive(Parser, Debug)]
#[command(name = "deploy-mutator", version, about, long_about = None)]
struct Cli {
    /// Path to the webhook server certificate (PEM)
    #[arg(long = "cert-file", env = "WEBHOOK_CERT_FILE")]
    cert_file: PathBuf,

    /// Path to the webhook server private key (PEM)
    #[arg(long = "key-file", env = "WEBHOOK_KEY_FILE")]
    key_file: PathBuf,

    /// Address to listen on
    #[arg(long, env = "WEBHOOK_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    addr: SocketAddr,

    /// Emit logs as JSON lines
    #[arg(long, env = "WEBHOOK_LOG_JSON")]
    log_json: bool,

    /// Seconds in-flight reviews get to finish after SIGTERM
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_GRACE_SECS)]
    shutdown_grace_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider - aws-lc-rs backs every TLS handshake
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ServerConfig::from_pem_files(
        cli.addr,
        &cli.cert_file,
        &cli.key_file,
        Duration::from_secs(cli.shutdown_grace_secs),
    )
    .await?;

    let policy = PolicyConfig::default();
    tracing::info!(
        annotation_key = %policy.annotation_key,
        annotation_value = %policy.annotation_value,
        max_replicas = policy.max_replicas,
        "Loaded mutation policy"
    );

    let state = Arc::new(WebhookState::new(Codec::new(), policy));
    start_server(config, state).await?;
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,deploy_mutator=debug,hyper=warn"));

    let (plain, structured) = if json {
        (None, Some(fmt::layer().json().with_current_span(true)))
    } else {
        (Some(fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain)
        .with(structured)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from([
            "deploy-mutator",
            "--cert-file",
            "/etc/webhook/tls.crt",
            "--key-file",
            "/etc/webhook/tls.key",
        ])
        .expect("cli should parse");

        assert_eq!(cli.addr, DEFAULT_LISTEN_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(cli.shutdown_grace_secs, DEFAULT_SHUTDOWN_GRACE_SECS);
        assert_eq!(cli.cert_file, PathBuf::from("/etc/webhook/tls.crt"));
    }

    #[test]
    fn test_cli_requires_key_file() {
        let result = Cli::try_parse_from(["deploy-mutator", "--cert-file", "/tmp/tls.crt"]);
        assert!(result.is_err());
    }
}
