// Prometheus metrics for the ingest server

use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::ServerError;

/// Metrics collector
pub struct Metrics {
    pub request_count: IntCounterVec,
    pub request_duration: HistogramVec,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Self, ServerError> {
        let registry = Registry::new();

        let request_count = IntCounterVec::new(
            Opts::new("streamwarden_requests_total", "Total requests by route and outcome"),
            &["route", "outcome"],
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(request_count.clone()))
            .map_err(metrics_error)?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new("streamwarden_request_duration_seconds", "Request duration"),
            &["route"],
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(request_duration.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            request_count,
            request_duration,
            registry,
        })
    }

    /// Record one handled request
    pub fn observe(&self, path: &str, outcome: &str, elapsed: Duration) {
        let route = route_label(path);
        self.request_count.with_label_values(&[route, outcome]).inc();
        self.request_duration
            .with_label_values(&[route])
            .observe(elapsed.as_secs_f64());
    }

    pub fn export(&self) -> Result<String, ServerError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer).map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| ServerError::Internal(e.to_string()))
    }
}

/// Unknown paths share one label so clients cannot grow the label set
fn route_label(path: &str) -> &'static str {
    match path {
        "/" => "submit",
        "/health" => "health",
        "/stats" => "stats",
        "/metrics" => "metrics",
        _ => "other",
    }
}

fn metrics_error(err: prometheus::Error) -> ServerError {
    ServerError::Internal(format!("Metrics error: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_counts_outcomes() {
        let metrics = Metrics::new().unwrap();
        metrics.observe("/", "ok", Duration::from_millis(2));
        metrics.observe("/", "limit_reached", Duration::from_millis(1));
        metrics.observe("/random/path", "not_found", Duration::from_millis(1));

        let text = metrics.export().unwrap();
        assert!(text.contains("streamwarden_requests_total"));
        assert!(text.contains(r#"outcome="limit_reached""#));
        assert!(text.contains(r#"route="submit""#));
        assert!(text.contains(r#"route="other""#));
        assert!(!text.contains("/random/path"));
    }
}
