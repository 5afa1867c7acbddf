//! Pod Mutation Webhook
//!
//! Handles AdmissionReview requests for Pods, clamping container CPU requests
//! that exceed the configured ceiling.
//!
//! Failures are split in two:
//! - Transport failures ([`WebhookError`]) mean no review could be read or
//!   written; they map to HTTP errors and are not counted.
//! - Mutation failures ([`MutationError`]) happen after the request is known;
//!   they are answered in-band with `allowed=false` and counted as failures.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::metrics::MutationOutcome;

use super::patch::synthesize;
use super::pod::{Pod, ShapeError};
use super::review::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use super::WebhookState;

/// Error type for transport-level webhook failures
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The admission review request was invalid or malformed
    #[error("invalid admission review: {0}")]
    InvalidReview(String),

    /// The admission review response could not be serialized
    #[error("response encoding error: {0}")]
    ResponseEncoding(#[source] serde_json::Error),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookError::InvalidReview(_) => (StatusCode::BAD_REQUEST, "could not decode request"),
            WebhookError::ResponseEncoding(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "could not encode response")
            }
        };

        (status, message).into_response()
    }
}

/// Error type for failures answered with a denial
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// The request carried no object
    #[error("admission request has no object")]
    MissingObject,

    /// The object is not a pod
    #[error("could not decode pod: {0}")]
    PodDecode(#[source] serde_json::Error),

    /// The pod lacks a field the synthesizer reads
    #[error("unexpected pod shape: {0}")]
    Shape(#[from] ShapeError),

    /// The patch could not be serialized
    #[error("could not encode patch: {0}")]
    PatchEncoding(#[source] serde_json::Error),
}

/// Handle mutating admission review for Pods
///
/// The body is decoded by hand rather than through `Json` so that every
/// malformed envelope gets the same 400 regardless of content type.
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> Result<Response, WebhookError> {
    let review: AdmissionReview = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Failed to decode admission review");
        WebhookError::InvalidReview(e.to_string())
    })?;

    let AdmissionReview {
        api_version,
        kind,
        request,
        ..
    } = review;
    let request = request.ok_or_else(|| {
        warn!("Admission review has no request");
        WebhookError::InvalidReview("missing request".to_string())
    })?;

    let response = admit(&state, &request);
    let reply = response.into_review(api_version, kind);

    let bytes = serde_json::to_vec(&reply).map_err(|e| {
        error!(uid = %request.uid, error = %e, "Failed to encode admission review");
        WebhookError::ResponseEncoding(e)
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

/// Decide on a single admission request and count the outcome
///
/// Exactly one of the success or failure counters moves per call, labelled
/// with the request's namespace and name.
pub fn admit(state: &WebhookState, request: &AdmissionRequest) -> AdmissionResponse {
    let labels = state.labels_for(request);

    let (outcome, response) = match mutate_pod(state, request) {
        Ok(response) => (MutationOutcome::Success, response),
        Err(e) => {
            warn!(
                uid = %request.uid,
                namespace = %request.namespace,
                name = %request.name,
                error = %e,
                "Pod mutation failed, denying"
            );
            let response = AdmissionResponse::deny(request.uid.clone(), e.to_string());
            (MutationOutcome::Failure, response)
        }
    };

    state.metrics.record(outcome, &labels);
    debug!(
        uid = %request.uid,
        outcome = outcome.as_str(),
        allowed = response.allowed,
        "Admission decided"
    );
    response
}

/// Build the response for a pod, without touching metrics
fn mutate_pod(
    state: &WebhookState,
    request: &AdmissionRequest,
) -> Result<AdmissionResponse, MutationError> {
    let object = request.object.as_ref().ok_or(MutationError::MissingObject)?;
    let pod = Pod::deserialize(&object.0).map_err(MutationError::PodDecode)?;

    let plan = synthesize(&pod, &state.policy)?;

    for skipped in &plan.skipped {
        warn!(
            cpu = %skipped.quantity,
            container = %skipped.name,
            index = skipped.index,
            name = %request.name,
            namespace = %request.namespace,
            reason = %skipped.reason,
            "Invalid CPU format, skipping container"
        );
    }

    if plan.operations.is_empty() {
        debug!(uid = %request.uid, name = %request.name, "No CPU requests above ceiling");
        return Ok(AdmissionResponse::allow(request.uid.clone()));
    }

    info!(
        uid = %request.uid,
        namespace = %request.namespace,
        name = %request.name,
        patch_ops = plan.operations.len(),
        ceiling = %state.policy.clamp_value(),
        "Clamping pod CPU requests"
    );

    AdmissionResponse::allow(request.uid.clone())
        .with_patch(&json_patch::Patch(plan.operations))
        .map_err(MutationError::PatchEncoding)
}
