//! Prometheus-backed protocol metrics.
//!
//! [`MetricsRegistry`] owns a Prometheus registry and the strongly-typed
//! [`ProtocolMetrics`] recorded by the verification contract. Exporting
//! the text format over a transport is left to the embedding service.

use prometheus::{
    self, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};

use crate::config::MetricsConfig;

/// Verification outcome metrics.
#[derive(Clone)]
pub struct ProtocolMetrics {
    /// Single proof packages that passed verification.
    pub proofs_accepted: IntCounter,
    /// Single proof packages that failed verification.
    pub proofs_rejected: IntCounter,
    /// Segment credentials appended to a node's ledger.
    pub segments_accepted: IntCounter,
    /// Segment credentials rejected by continuity or spot-check.
    pub segments_rejected: IntCounter,
    /// Latency of single proof verification, including the reputation
    /// update, in seconds.
    pub verification_seconds: Histogram,
    /// Reputation of the most recently evaluated node.
    pub last_reputation: Gauge,
}

impl ProtocolMetrics {
    /// Registers protocol metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let proofs_accepted = IntCounter::with_opts(Opts::new(
            "proofs_accepted_total",
            "Proof packages that passed single verification",
        ))?;
        registry.register(Box::new(proofs_accepted.clone()))?;

        let proofs_rejected = IntCounter::with_opts(Opts::new(
            "proofs_rejected_total",
            "Proof packages that failed single verification",
        ))?;
        registry.register(Box::new(proofs_rejected.clone()))?;

        let segments_accepted = IntCounter::with_opts(Opts::new(
            "segments_accepted_total",
            "Segment credentials appended to a node ledger",
        ))?;
        registry.register(Box::new(segments_accepted.clone()))?;

        let segments_rejected = IntCounter::with_opts(Opts::new(
            "segments_rejected_total",
            "Segment credentials rejected by continuity or spot-check",
        ))?;
        registry.register(Box::new(segments_rejected.clone()))?;

        // Signature checks dominate; buckets span sub-millisecond to 1s.
        let verification_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "proof_verification_seconds",
                "Time to verify a single proof package and update reputation, in seconds",
            )
            .buckets(vec![
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.1, 1.0,
            ]),
        )?;
        registry.register(Box::new(verification_seconds.clone()))?;

        let last_reputation = Gauge::with_opts(Opts::new(
            "last_reputation",
            "Reputation of the most recently evaluated node (0..1)",
        ))?;
        registry.register(Box::new(last_reputation.clone()))?;

        Ok(Self {
            proofs_accepted,
            proofs_rejected,
            segments_accepted,
            segments_rejected,
            verification_seconds,
            last_reputation,
        })
    }
}

/// Wrapper around a Prometheus registry and the protocol metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub protocol: ProtocolMetrics,
}

impl MetricsRegistry {
    /// Creates a registry with the default `storage_time` prefix.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_prefix("storage_time")
    }

    /// Creates a registry whose metric names start with `prefix`.
    pub fn with_prefix(prefix: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some(prefix.to_string()), None)?;
        let protocol = ProtocolMetrics::register(&registry)?;
        Ok(Self { registry, protocol })
    }

    /// Creates a registry per `cfg`, or `None` when metrics are disabled.
    pub fn from_config(cfg: &MetricsConfig) -> Result<Option<Self>, prometheus::Error> {
        if !cfg.enabled {
            return Ok(None);
        }
        Self::with_prefix(&cfg.prefix).map(Some)
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = ProtocolMetrics::register(&registry).expect("register metrics");

        metrics.proofs_accepted.inc();
        metrics.proofs_rejected.inc();
        metrics.segments_accepted.inc();
        metrics.segments_rejected.inc();
        metrics.verification_seconds.observe(0.002);
        metrics.last_reputation.set(0.55);

        assert_eq!(registry.gather().len(), 6);
    }

    #[test]
    fn gather_text_uses_the_prefix() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.protocol.proofs_accepted.inc();

        let text = registry.gather_text();
        assert!(text.contains("storage_time_proofs_accepted_total 1"));
        assert!(text.contains("storage_time_proof_verification_seconds"));
    }

    #[test]
    fn disabled_config_yields_no_registry() {
        let cfg = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(MetricsRegistry::from_config(&cfg).unwrap().is_none());

        let custom = MetricsConfig {
            enabled: true,
            prefix: "node_a".to_string(),
        };
        let registry = MetricsRegistry::from_config(&custom).unwrap().unwrap();
        registry.protocol.segments_rejected.inc();
        assert!(registry.gather_text().contains("node_a_segments_rejected_total 1"));
    }
}
