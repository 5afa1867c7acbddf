//! TLS listener for the webhook endpoints

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

use crate::error::Error;
use crate::webhook::{webhook_router, WebhookState};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server
    pub addr: SocketAddr,
    /// TLS certificate PEM file
    pub cert_path: PathBuf,
    /// TLS private key PEM file
    pub key_path: PathBuf,
}

/// Load the certificate and key once
pub async fn load_tls(config: &ServerConfig) -> Result<RustlsConfig, Error> {
    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(|e| {
            Error::tls(format!(
                "failed to load {} / {}: {}",
                config.cert_path.display(),
                config.key_path.display(),
                e
            ))
        })
}

/// Serve `/mutate` and `/metrics` over TLS until the listener fails
pub async fn start_server(config: ServerConfig, state: Arc<WebhookState>) -> Result<(), Error> {
    let app = webhook_router(state);
    let tls_config = load_tls(&config).await?;

    info!(
        addr = %config.addr,
        cert = %config.cert_path.display(),
        "Starting webhook server"
    );

    axum_server::bind_rustls(config.addr, tls_config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::server(e.to_string()))?;

    Ok(())
}
