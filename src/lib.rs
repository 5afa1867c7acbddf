//! CPU quota webhook - mutating admission webhook for Pod CPU requests
//!
//! On every Pod creation the webhook inspects each container's
//! `resources.requests.cpu` and, when a non-sidecar container asks for more
//! than the ceiling, answers with a JSON patch replacing the request with the
//! ceiling. Decisions are counted per instance, namespace and pod and exposed
//! for scraping.
//!
//! # Modules
//!
//! - [`webhook`] - admission envelope, pod view, patch synthesis, handlers
//! - [`metrics`] - mutation counters
//! - [`server`] - TLS listener
//! - [`config`] - command line and environment settings
//! - [`telemetry`] - logging setup
//! - [`error`] - process-level error type

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod telemetry;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Default listener address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:443";

/// Default path of the serving certificate
pub const DEFAULT_TLS_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";

/// Default path of the serving key
pub const DEFAULT_TLS_KEY_PATH: &str = "/etc/webhook/certs/tls.key";

/// Instance label used when `POD_NAME` is unset or empty
pub const UNKNOWN_INSTANCE_NAME: &str = "unknown";
