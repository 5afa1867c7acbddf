//! Mutating Admission Webhook for pod CPU requests
//!
//! Intercepts Pod creation and rewrites container CPU requests above a
//! ceiling down to the ceiling, leaving the service-mesh sidecar untouched.
//!
//! - [`review`] - admission envelope types
//! - [`pod`] - narrow pod view and shape errors
//! - [`patch`] - CPU policy and patch synthesis
//! - [`mutate`] - the `/mutate` handler

pub mod mutate;
pub mod patch;
pub mod pod;
pub mod review;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::error;

use crate::metrics::{MutationLabels, MutationMetrics, OPENMETRICS_CONTENT_TYPE};
use patch::CpuPolicy;
use review::AdmissionRequest;

/// Shared state for webhook handlers
#[derive(Debug)]
pub struct WebhookState {
    /// Mutation counters and their registry
    pub metrics: MutationMetrics,
    /// Identifies this webhook instance in metric labels
    pub instance_name: String,
    /// Which containers are clamped and to what
    pub policy: CpuPolicy,
}

impl WebhookState {
    /// Create a webhook state with an empty metric registry
    pub fn new(instance_name: impl Into<String>, policy: CpuPolicy) -> Self {
        Self {
            metrics: MutationMetrics::new(),
            instance_name: instance_name.into(),
            policy,
        }
    }

    /// Metric labels for a request
    ///
    /// Taken from the request envelope rather than the pod so that a pod that
    /// fails to decode is still attributed.
    pub fn labels_for(&self, request: &AdmissionRequest) -> MutationLabels {
        MutationLabels::new(
            self.instance_name.clone(),
            request.namespace.clone(),
            request.name.clone(),
        )
    }
}

/// Create the webhook router
///
/// - POST /mutate - mutate Pods
/// - GET /metrics - mutation counters
/// - GET /healthz - liveness
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate", post(mutate::mutate_handler))
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve the mutation counters
async fn metrics_handler(State(state): State<Arc<WebhookState>>) -> Response {
    match state.metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "could not encode metrics").into_response()
        }
    }
}
