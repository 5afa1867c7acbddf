//! CPU request patch synthesis
//!
//! Walks the pod's containers in order and proposes a `replace` operation for
//! every non-exempt container whose CPU request exceeds the ceiling. The
//! synthesizer is pure: containers it cannot judge are returned as
//! [`SkippedContainer`]s for the caller to log with request context.

use json_patch::{PatchOperation, ReplaceOperation};
use jsonptr::PointerBuf;
use thiserror::Error;

use super::pod::{Pod, ShapeError};

/// Sidecar container that is never clamped
pub const SIDECAR_CONTAINER: &str = "istio-proxy";

/// Default CPU ceiling in milli-CPU
pub const DEFAULT_CPU_CEILING_MILLIS: u64 = 100;

/// Unit suffix accepted on CPU quantities
const MILLI_SUFFIX: char = 'm';

/// Which containers are clamped and to what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuPolicy {
    ceiling_millis: u64,
    exempt_containers: Vec<String>,
}

impl Default for CpuPolicy {
    fn default() -> Self {
        Self {
            ceiling_millis: DEFAULT_CPU_CEILING_MILLIS,
            exempt_containers: vec![SIDECAR_CONTAINER.to_string()],
        }
    }
}

impl CpuPolicy {
    /// Create a policy clamping requests above `ceiling_millis`
    pub fn new(ceiling_millis: u64, exempt_containers: Vec<String>) -> Self {
        Self {
            ceiling_millis,
            exempt_containers,
        }
    }

    /// Requests strictly above this many milli-CPU are clamped
    pub fn ceiling_millis(&self) -> u64 {
        self.ceiling_millis
    }

    /// Quantity written in place of an over-ceiling request
    pub fn clamp_value(&self) -> String {
        format!("{}{}", self.ceiling_millis, MILLI_SUFFIX)
    }

    /// Whether the named container is left alone
    pub fn is_exempt(&self, container_name: &str) -> bool {
        self.exempt_containers.iter().any(|n| n == container_name)
    }
}

/// A CPU quantity outside the `<digits>m` form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// The quantity is an empty string
    #[error("empty CPU quantity")]
    Empty,

    /// The quantity does not end in `m`
    #[error("CPU quantity {0:?} is not expressed in milli-CPU")]
    MissingMilliSuffix(String),

    /// The part before `m` is not a non-negative integer
    #[error("CPU quantity {0:?} has an invalid numeric part")]
    InvalidNumber(String),
}

/// Parse a milli-CPU quantity such as `250m` into `250`
///
/// Only ASCII digits followed by a single trailing `m` are accepted. Whole-CPU
/// quantities (`1`) and other suffixes are rejected rather than guessed at.
pub fn parse_milli_cpu(quantity: &str) -> Result<u64, QuantityError> {
    if quantity.is_empty() {
        return Err(QuantityError::Empty);
    }
    let digits = quantity
        .strip_suffix(MILLI_SUFFIX)
        .ok_or_else(|| QuantityError::MissingMilliSuffix(quantity.to_string()))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuantityError::InvalidNumber(quantity.to_string()));
    }
    digits
        .parse()
        .map_err(|_| QuantityError::InvalidNumber(quantity.to_string()))
}

/// A container left unpatched because its quantity could not be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedContainer {
    /// Index in `spec.containers`
    pub index: usize,
    /// Container name
    pub name: String,
    /// The quantity as written
    pub quantity: String,
    /// Why it was not understood
    pub reason: QuantityError,
}

/// Output of [`synthesize`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchPlan {
    /// Operations in container-index order
    pub operations: Vec<PatchOperation>,
    /// Containers whose quantity could not be parsed
    pub skipped: Vec<SkippedContainer>,
}

/// Compute the CPU clamp operations for a pod
///
/// Paths index the original `spec.containers` array, so exempt containers
/// still occupy their slot.
pub fn synthesize(pod: &Pod, policy: &CpuPolicy) -> Result<PatchPlan, ShapeError> {
    let mut plan = PatchPlan::default();

    for (index, container) in pod.containers()?.iter().enumerate() {
        if policy.is_exempt(container.name()) {
            continue;
        }

        let quantity = container.cpu_request(index)?;
        let millis = match parse_milli_cpu(quantity) {
            Ok(m) => m,
            Err(reason) => {
                plan.skipped.push(SkippedContainer {
                    index,
                    name: container.name().to_string(),
                    quantity: quantity.to_string(),
                    reason,
                });
                continue;
            }
        };

        if millis > policy.ceiling_millis() {
            plan.operations.push(clamp_operation(index, &policy.clamp_value()));
        }
    }

    Ok(plan)
}

/// Replace the CPU request of the container at `index`
fn clamp_operation(index: usize, value: &str) -> PatchOperation {
    let index = index.to_string();
    PatchOperation::Replace(ReplaceOperation {
        path: PointerBuf::from_tokens([
            "spec",
            "containers",
            index.as_str(),
            "resources",
            "requests",
            "cpu",
        ]),
        value: serde_json::Value::String(value.to_string()),
    })
}
