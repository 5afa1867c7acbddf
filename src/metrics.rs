//! Pod mutation counters
//!
//! Two counter families, `pod_mutation_success_total` and
//! `pod_mutation_failure_total`, labelled by webhook instance, namespace and
//! pod. Each [`MutationMetrics`] owns its own registry so tests never share
//! counters.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// Content type of the scrape endpoint
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Labels attached to every mutation counter
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MutationLabels {
    /// Name of the webhook instance that made the decision
    pub pod_mutation_name: String,
    /// Namespace from the admission request
    pub namespace: String,
    /// Object name from the admission request
    pub pod: String,
}

impl MutationLabels {
    /// Build labels for one admission request
    pub fn new(
        instance_name: impl Into<String>,
        namespace: impl Into<String>,
        pod: impl Into<String>,
    ) -> Self {
        Self {
            pod_mutation_name: instance_name.into(),
            namespace: namespace.into(),
            pod: pod.into(),
        }
    }
}

/// Outcome of a processed admission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The request was answered with `allowed=true`
    Success,
    /// Processing failed and the request was denied
    Failure,
}

impl MutationOutcome {
    /// Convert to label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Registry and counters for pod mutations
#[derive(Debug)]
pub struct MutationMetrics {
    registry: Registry,
    success: Family<MutationLabels, Counter>,
    failure: Family<MutationLabels, Counter>,
}

impl Default for MutationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationMetrics {
    /// Create a fresh registry with both counter families registered
    pub fn new() -> Self {
        let mut registry = Registry::default();

        // The text encoder appends `_total` to counter names.
        let success = Family::<MutationLabels, Counter>::default();
        registry.register(
            "pod_mutation_success",
            "Total number of successful pod mutations",
            success.clone(),
        );

        let failure = Family::<MutationLabels, Counter>::default();
        registry.register(
            "pod_mutation_failure",
            "Total number of failed pod mutations",
            failure.clone(),
        );

        Self {
            registry,
            success,
            failure,
        }
    }

    /// Count one processed request
    pub fn record(&self, outcome: MutationOutcome, labels: &MutationLabels) {
        self.family(outcome).get_or_create(labels).inc();
    }

    /// Current value of a counter, for tests and diagnostics
    ///
    /// `Family` has no read-only lookup, so reading an unseen label set creates
    /// a zero-valued series that later appears in [`encode`](Self::encode)
    /// output. The request path only calls [`record`](Self::record).
    #[doc(hidden)]
    pub fn count(&self, outcome: MutationOutcome, labels: &MutationLabels) -> u64 {
        self.family(outcome).get_or_create(labels).get()
    }

    /// Render all counters in the OpenMetrics text format
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }

    fn family(&self, outcome: MutationOutcome) -> &Family<MutationLabels, Counter> {
        match outcome {
            MutationOutcome::Success => &self.success,
            MutationOutcome::Failure => &self.failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn labels(pod: &str) -> MutationLabels {
        MutationLabels::new("webhook-0", "default", pod)
    }

    #[test]
    fn test_outcome_label_values() {
        assert_eq!(MutationOutcome::Success.as_str(), "success");
        assert_eq!(MutationOutcome::Failure.as_str(), "failure");
    }

    #[test]
    fn test_record_increments_only_matching_bucket() {
        let metrics = MutationMetrics::new();
        metrics.record(MutationOutcome::Success, &labels("web"));
        metrics.record(MutationOutcome::Success, &labels("web"));
        metrics.record(MutationOutcome::Failure, &labels("db"));

        assert_eq!(metrics.count(MutationOutcome::Success, &labels("web")), 2);
        assert_eq!(metrics.count(MutationOutcome::Failure, &labels("web")), 0);
        assert_eq!(metrics.count(MutationOutcome::Failure, &labels("db")), 1);
        assert_eq!(metrics.count(MutationOutcome::Success, &labels("db")), 0);
    }

    #[test]
    fn test_separate_instances_are_isolated() {
        let a = MutationMetrics::new();
        let b = MutationMetrics::new();
        a.record(MutationOutcome::Success, &labels("web"));

        assert_eq!(a.count(MutationOutcome::Success, &labels("web")), 1);
        assert_eq!(b.count(MutationOutcome::Success, &labels("web")), 0);
    }

    #[test]
    fn test_encode_renders_counters_with_labels() {
        let metrics = MutationMetrics::new();
        metrics.record(MutationOutcome::Success, &labels("web"));
        metrics.record(MutationOutcome::Failure, &labels("db"));

        let text = metrics.encode().expect("encoding should succeed");

        assert!(text.contains("# TYPE pod_mutation_success counter"));
        assert!(text.contains("# HELP pod_mutation_failure Total number of failed pod mutations"));
        assert!(text.contains(
            r#"pod_mutation_success_total{pod_mutation_name="webhook-0",namespace="default",pod="web"} 1"#
        ));
        assert!(text.contains(
            r#"pod_mutation_failure_total{pod_mutation_name="webhook-0",namespace="default",pod="db"} 1"#
        ));
        assert!(text.ends_with("# EOF\n"));
    }

    #[test]
    fn test_scrape_lists_only_recorded_series() {
        let metrics = MutationMetrics::new();
        metrics.record(MutationOutcome::Success, &labels("web"));

        let text = metrics.encode().unwrap();
        let series: Vec<_> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(
            series,
            vec![r#"pod_mutation_success_total{pod_mutation_name="webhook-0",namespace="default",pod="web"} 1"#]
        );
        assert!(!text.contains("pod_mutation_failure_total{"));
    }

    #[test]
    fn test_concurrent_increments_are_all_counted() {
        let metrics = Arc::new(MutationMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        metrics.record(MutationOutcome::Success, &labels("web"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.count(MutationOutcome::Success, &labels("web")), 2000);
    }
}
