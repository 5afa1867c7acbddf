//! CPU quota webhook - clamps Pod CPU requests at admission

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use cpu_quota_webhook::config::WebhookConfig;
use cpu_quota_webhook::server::start_server;
use cpu_quota_webhook::telemetry::init_telemetry;
use cpu_quota_webhook::webhook::WebhookState;

/// Mutating admission webhook that clamps Pod CPU requests
#[derive(Parser, Debug)]
#[command(name = "cpu-quota-webhook", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: WebhookConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider before any TLS config is built.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    let config = cli.config;

    init_telemetry(config.telemetry_config())?;
    config.validate()?;

    let instance_name = config.instance_name();
    let policy = config.cpu_policy();
    info!(
        instance = %instance_name,
        ceiling = %policy.clamp_value(),
        "Initializing pod CPU webhook"
    );

    let state = Arc::new(WebhookState::new(instance_name, policy));
    start_server(config.server_config(), state).await?;

    Ok(())
}
