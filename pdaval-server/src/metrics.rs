//! Prometheus metrics for the pdaval server.
//!
//! The registry is exposed through the HTTP gateway at `/metrics` when
//! metrics are enabled.

use pdaval_core::{Outcome, RejectKind};
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

/// Request duration histogram buckets (in seconds).
const DURATION_BUCKETS: &[f64] = &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5];

/// Content type of the text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metrics for the pdaval server.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Total connections accepted.
    pub connections_total: Counter,
    /// Currently active connections.
    pub connections_active: Gauge,
    /// Total requests by operation type.
    pub requests_total: CounterVec,
    /// Total errors by error code.
    pub errors_total: CounterVec,
    /// Request duration histogram by operation.
    pub request_duration: HistogramVec,
    /// Validations by automaton and outcome.
    pub validations_total: CounterVec,
    /// Runs stopped on a transition-table defect, by automaton.
    pub engine_faults_total: CounterVec,
}

impl Metrics {
    /// Creates a new Metrics instance with all metrics registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Connections
        let connections_total = Counter::with_opts(Opts::new(
            "pdaval_connections_total",
            "Total number of connections accepted",
        ))?;
        registry.register(Box::new(connections_total.clone()))?;

        let connections_active = Gauge::with_opts(Opts::new(
            "pdaval_connections_active",
            "Number of currently active connections",
        ))?;
        registry.register(Box::new(connections_active.clone()))?;

        // Requests
        let requests_total = CounterVec::new(
            Opts::new("pdaval_requests_total", "Total requests by operation"),
            &["operation"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let errors_total = CounterVec::new(
            Opts::new("pdaval_errors_total", "Total errors by error code"),
            &["code"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "pdaval_request_duration_seconds",
                "Request duration in seconds by operation",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["operation"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        // Validations
        let validations_total = CounterVec::new(
            Opts::new(
                "pdaval_validations_total",
                "Validations by automaton and outcome",
            ),
            &["automaton", "outcome"],
        )?;
        registry.register(Box::new(validations_total.clone()))?;

        let engine_faults_total = CounterVec::new(
            Opts::new(
                "pdaval_engine_faults_total",
                "Runs stopped on a transition-table defect",
            ),
            &["automaton"],
        )?;
        registry.register(Box::new(engine_faults_total.clone()))?;

        Ok(Self {
            registry,
            connections_total,
            connections_active,
            requests_total,
            errors_total,
            request_duration,
            validations_total,
            engine_faults_total,
        })
    }

    /// Counts one validation. The outcome label is `ACCEPTED` or the reject kind.
    pub fn record_validation(&self, automaton: &str, outcome: &impl Outcome) {
        let label = match outcome.reason() {
            None => "ACCEPTED",
            Some(kind) => kind.as_str(),
        };
        self.validations_total
            .with_label_values(&[automaton, label])
            .inc();
        if outcome.reason() == Some(RejectKind::EngineFault) {
            self.engine_faults_total.with_label_values(&[automaton]).inc();
        }
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();

        metrics.connections_total.inc();
        metrics.connections_active.inc();
        metrics.requests_total.with_label_values(&["PING"]).inc();
        metrics.errors_total.with_label_values(&["BAD_REQUEST"]).inc();
        metrics
            .request_duration
            .with_label_values(&["PING"])
            .observe(0.001);

        let encoded = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(encoded.contains("pdaval_connections_total"));
        assert!(encoded.contains("pdaval_connections_active"));
        assert!(encoded.contains("pdaval_requests_total"));
        assert!(encoded.contains("pdaval_errors_total"));
        assert!(encoded.contains("pdaval_request_duration_seconds"));
    }

    #[test]
    fn test_record_validation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_validation("nic", &pdaval_core::validate_nic("951234567V"));
        metrics.record_validation("postal", &pdaval_core::validate_postal_code("99999"));

        let encoded = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(encoded
            .contains(r#"pdaval_validations_total{automaton="nic",outcome="ACCEPTED"} 1"#));
        assert!(encoded
            .contains(r#"pdaval_validations_total{automaton="postal",outcome="RANGE_MISS"} 1"#));
        assert_eq!(
            metrics
                .engine_faults_total
                .with_label_values(&["nic"])
                .get(),
            0.0
        );
    }

    #[test]
    fn test_engine_fault_counted() {
        let metrics = Metrics::new().unwrap();
        let validator = pdaval_core::Validator::default()
            .with_engine(pdaval_core::PdaEngine::new().with_step_slack(0));

        let result = validator.validate_postal_code("10100");
        assert_eq!(result.reason, Some(RejectKind::EngineFault));
        metrics.record_validation("postal", &result);

        assert_eq!(
            metrics
                .engine_faults_total
                .with_label_values(&["postal"])
                .get(),
            1.0
        );
        assert_eq!(
            metrics
                .validations_total
                .with_label_values(&["postal", "ENGINE_FAULT"])
                .get(),
            1.0
        );
    }
}
