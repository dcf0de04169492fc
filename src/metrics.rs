//! Metrics and tracing helpers.
//!
//! With the `metrics` feature the crate records query counts, failures, durations and
//! page/count activity on an OpenTelemetry meter exported through Prometheus.
//! With the `tracing` feature executor calls and page lookups open spans.

#[cfg(feature = "metrics")]
pub use self::prometheus_metrics::{LifeguardMetrics, METRICS};

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry_prometheus::PrometheusExporter;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<LifeguardMetrics> = Lazy::new(LifeguardMetrics::init);

    pub struct LifeguardMetrics {
        registry: Registry,
        _provider: SdkMeterProvider,
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub count_queries_total: Counter<u64>,
        pub pages_total: Counter<u64>,
    }

    impl LifeguardMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let exporter: PrometheusExporter = opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
                .expect("failed to build prometheus exporter");
            let provider = SdkMeterProvider::builder().with_reader(exporter).build();
            let meter = provider.meter("lifeguard_dao");

            let queries_total = meter
                .u64_counter("lifeguard_queries_total")
                .with_description("Total queries executed")
                .build();

            let query_errors_total = meter
                .u64_counter("lifeguard_query_errors_total")
                .with_description("Queries that failed in the driver")
                .build();

            let query_duration = meter
                .f64_histogram("lifeguard_query_duration_seconds")
                .with_description("Duration of queries")
                .build();

            let count_queries_total = meter
                .u64_counter("lifeguard_count_queries_total")
                .with_description("Count queries issued for auto-counted pages")
                .build();

            let pages_total = meter
                .u64_counter("lifeguard_pages_total")
                .with_description("Pages served by the paging engine")
                .build();

            Self {
                registry,
                _provider: provider,
                queries_total,
                query_errors_total,
                query_duration,
                count_queries_total,
                pages_total,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_count_query(&self) {
            self.count_queries_total.add(1, &[]);
        }

        pub fn record_page(&self) {
            self.pages_total.add(1, &[]);
        }

        /// Render the collected metrics in the Prometheus text exposition format.
        pub fn gather(&self) -> String {
            let mut buffer = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
                log::error!("failed to encode metrics: {e}");
            }
            String::from_utf8_lossy(&buffer).into_owned()
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::info_span!("lifeguard.execute_query", db.statement = %sql)
    }

    pub fn acquire_connection_span() -> Span {
        tracing::info_span!("lifeguard.acquire_connection")
    }

    /// Span covering one paging call; `path` names the entry point (`text`, `criteria`, `filters`).
    pub fn find_page_span(entity: &str, path: &'static str) -> Span {
        tracing::debug_span!("lifeguard.find_page", entity = %entity, path = path)
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording_does_not_panic() {
        METRICS.record_page();
        METRICS.record_count_query();
        METRICS.record_query_error();
        METRICS.record_query_duration(std::time::Duration::from_millis(3));
        let _ = METRICS.gather();
    }
}
