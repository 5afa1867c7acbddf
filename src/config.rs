//! Runtime configuration
//!
//! Every setting has a flag and an environment fallback; the defaults are the
//! in-cluster deployment values.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::server::ServerConfig;
use crate::telemetry::{LogFormat, TelemetryConfig};
use crate::webhook::patch::{CpuPolicy, DEFAULT_CPU_CEILING_MILLIS, SIDECAR_CONTAINER};
use crate::{
    Error, DEFAULT_LISTEN_ADDR, DEFAULT_TLS_CERT_PATH, DEFAULT_TLS_KEY_PATH, UNKNOWN_INSTANCE_NAME,
};

/// Webhook settings
#[derive(Args, Debug, Clone)]
pub struct WebhookConfig {
    /// Address the TLS listener binds to
    #[arg(long, env = "WEBHOOK_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// PEM certificate served on the listener
    #[arg(long, env = "WEBHOOK_TLS_CERT", default_value = DEFAULT_TLS_CERT_PATH)]
    pub tls_cert: PathBuf,

    /// PEM private key for the certificate
    #[arg(long, env = "WEBHOOK_TLS_KEY", default_value = DEFAULT_TLS_KEY_PATH)]
    pub tls_key: PathBuf,

    /// Name of this webhook instance in metric labels
    ///
    /// Set from the pod name through the downward API.
    #[arg(long, env = "POD_NAME")]
    pub instance_name: Option<String>,

    /// CPU requests above this many milli-CPU are clamped to it
    #[arg(long, env = "WEBHOOK_CPU_CEILING_MILLIS", default_value_t = DEFAULT_CPU_CEILING_MILLIS)]
    pub cpu_ceiling_millis: u64,

    /// Container names that are never clamped (repeatable)
    #[arg(long = "exempt-container", default_values_t = [SIDECAR_CONTAINER.to_string()])]
    pub exempt_containers: Vec<String>,

    /// Log line format
    #[arg(long, env = "WEBHOOK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl WebhookConfig {
    /// Reject settings that cannot work
    pub fn validate(&self) -> Result<(), Error> {
        if self.exempt_containers.iter().any(|n| n.is_empty()) {
            return Err(Error::config("exempt container name must not be empty"));
        }
        Ok(())
    }

    /// Instance name for metric labels, `unknown` when unset or empty
    pub fn instance_name(&self) -> String {
        resolve_instance_name(self.instance_name.as_deref())
    }

    /// Clamp policy derived from the ceiling and exemptions
    pub fn cpu_policy(&self) -> CpuPolicy {
        CpuPolicy::new(self.cpu_ceiling_millis, self.exempt_containers.clone())
    }

    /// Listener settings
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            addr: self.listen_addr,
            cert_path: self.tls_cert.clone(),
            key_path: self.tls_key.clone(),
        }
    }

    /// Logging settings
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            format: self.log_format,
        }
    }
}

/// Fall back to `unknown` for a missing or empty instance name
pub fn resolve_instance_name(name: Option<&str>) -> String {
    match name {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => UNKNOWN_INSTANCE_NAME.to_string(),
    }
}
