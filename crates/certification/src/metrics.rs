//! Prometheus counters for the certification request buffer.

use crate::CertificationOutcome;
use keystone_types::PartitionId;
use prometheus::{IntCounterVec, Opts, Registry};

/// Per-partition counters: requests received, duplicates rejected, and the
/// quorum outcomes reported back to submitters.
#[derive(Clone)]
pub struct CertificationMetrics {
    requests_received: IntCounterVec,
    duplicate_requests: IntCounterVec,
    quorum_outcomes: IntCounterVec,
}

impl CertificationMetrics {
    /// Create the counters and register them with `registry`.
    pub fn new(registry: &Registry) -> Self {
        let requests_received = IntCounterVec::new(
            Opts::new(
                "certification_requests_received",
                "Block certification requests accepted into the buffer",
            ),
            &["partition"],
        )
        .expect("metric creation should never fail");
        let duplicate_requests = IntCounterVec::new(
            Opts::new(
                "certification_requests_duplicate",
                "Block certification requests rejected as duplicates",
            ),
            &["partition"],
        )
        .expect("metric creation should never fail");
        let quorum_outcomes = IntCounterVec::new(
            Opts::new(
                "certification_quorum_outcomes",
                "Quorum classifications reported after each accepted request",
            ),
            &["partition", "outcome"],
        )
        .expect("metric creation should never fail");

        for metric in [&requests_received, &duplicate_requests, &quorum_outcomes] {
            registry
                .register(Box::new(metric.clone()))
                .expect("metric registration should never fail");
        }

        Self {
            requests_received,
            duplicate_requests,
            quorum_outcomes,
        }
    }

    pub(crate) fn record_received(&self, partition_id: PartitionId) {
        self.requests_received
            .with_label_values(&[&partition_id.to_string()])
            .inc();
    }

    pub(crate) fn record_duplicate(&self, partition_id: PartitionId) {
        self.duplicate_requests
            .with_label_values(&[&partition_id.to_string()])
            .inc();
    }

    pub(crate) fn record_outcome(
        &self,
        partition_id: PartitionId,
        outcome: CertificationOutcome,
    ) {
        self.quorum_outcomes
            .with_label_values(&[&partition_id.to_string(), outcome.label()])
            .inc();
    }
}
