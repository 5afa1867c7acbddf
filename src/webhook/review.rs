//! Admission review envelope
//!
//! Only the fields the webhook reads or writes are modelled. The embedded
//! object stays a raw JSON value so that a pod which fails to decode can still
//! be attributed to the request's namespace and name.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::{Deserialize, Serialize};

/// API version written on replies when the request did not carry one
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";

/// Kind written on replies when the request did not carry one
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// Admission review wrapper, used for both directions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    /// API version of the review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Kind of the review (always `AdmissionReview`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Request sent by the API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,

    /// Response produced by the webhook
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

/// The subset of an admission request consumed by the webhook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Opaque identifier echoed back in the response
    pub uid: String,

    /// Namespace of the object under admission
    #[serde(default)]
    pub namespace: String,

    /// Name of the object under admission
    #[serde(default)]
    pub name: String,

    /// The object under admission, still undecoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<RawExtension>,
}

/// Patch encoding designation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchType {
    /// RFC 6902 JSON Patch
    #[serde(rename = "JSONPatch")]
    JsonPatch,
}

/// Admission decision returned to the API server
///
/// `patch` and `patch_type` are either both set or both absent, and are only
/// ever set on an allowed response with at least one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Copied from the request
    pub uid: String,

    /// Whether the object is admitted
    pub allowed: bool,

    /// Serialized JSON patch, base64 on the wire
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub patch: Option<Vec<u8>>,

    /// Present iff `patch` is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<PatchType>,

    /// Explanation attached to a denial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl AdmissionResponse {
    /// Allow the request unchanged
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            patch: None,
            patch_type: None,
            status: None,
        }
    }

    /// Reject the request with a message
    pub fn deny(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            patch: None,
            patch_type: None,
            status: Some(Status {
                message: Some(message.into()),
                ..Default::default()
            }),
        }
    }

    /// Attach a JSON patch to an allowed response
    ///
    /// An empty patch leaves the response untouched.
    pub fn with_patch(mut self, patch: &json_patch::Patch) -> Result<Self, serde_json::Error> {
        if patch.0.is_empty() {
            return Ok(self);
        }
        self.patch = Some(serde_json::to_vec(patch)?);
        self.patch_type = Some(PatchType::JsonPatch);
        Ok(self)
    }

    /// Message carried on the status, if any
    pub fn status_message(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.message.as_deref())
    }

    /// Wrap in a review envelope
    ///
    /// The API version and kind of the incoming review are echoed back so the
    /// API server sees the same version it sent.
    pub fn into_review(self, api_version: Option<String>, kind: Option<String>) -> AdmissionReview {
        AdmissionReview {
            api_version: Some(api_version.unwrap_or_else(|| ADMISSION_API_VERSION.to_string())),
            kind: Some(kind.unwrap_or_else(|| ADMISSION_REVIEW_KIND.to_string())),
            request: None,
            response: Some(self),
        }
    }
}

/// Byte fields travel as base64 strings in admission JSON
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_str(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
