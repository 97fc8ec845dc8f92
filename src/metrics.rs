//! Observability hooks: Prometheus metrics (feature `metrics`) and tracing
//! spans (feature `tracing`).

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};
#[cfg(feature = "metrics")]
use opentelemetry_prometheus::PrometheusExporter;
#[cfg(feature = "metrics")]
use std::time::Duration;

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<ScaffolderMetrics> = Lazy::new(ScaffolderMetrics::init);

#[cfg(feature = "metrics")]
pub struct ScaffolderMetrics {
    pub exporter: PrometheusExporter,
    pub operations_total: Counter<u64>,
    pub operation_errors_total: Counter<u64>,
    pub operation_duration: Histogram<f64>,
    pub queries_total: Counter<u64>,
    pub query_errors_total: Counter<u64>,
    pub query_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl ScaffolderMetrics {
    pub fn init() -> Self {
        let exporter = opentelemetry_prometheus::exporter()
            .build()
            .expect("failed to build prometheus exporter");
        let meter = global::meter("scaffolder");

        let operations_total = meter
            .u64_counter("scaffolder_operations_total")
            .with_description("Repository operations started")
            .build();

        let operation_errors_total = meter
            .u64_counter("scaffolder_operation_errors_total")
            .with_description("Repository operations that returned an error")
            .build();

        let operation_duration = meter
            .f64_histogram("scaffolder_operation_duration_seconds")
            .with_description("Duration of repository operations, write and re-fetch included")
            .build();

        let queries_total = meter
            .u64_counter("scaffolder_queries_total")
            .with_description("Statements executed by database adapters")
            .build();

        let query_errors_total = meter
            .u64_counter("scaffolder_query_errors_total")
            .with_description("Statements that failed in database adapters")
            .build();

        let query_duration = meter
            .f64_histogram("scaffolder_query_duration_seconds")
            .with_description("Duration of statements executed by database adapters")
            .build();

        Self {
            exporter,
            operations_total,
            operation_errors_total,
            operation_duration,
            queries_total,
            query_errors_total,
            query_duration,
        }
    }

    /// Record one finished repository operation
    pub fn record_operation(&self, operation: &'static str, table: &str, elapsed: Duration, failed: bool) {
        let labels = [
            KeyValue::new("operation", operation),
            KeyValue::new("table", table.to_string()),
        ];
        self.operations_total.add(1, &labels);
        self.operation_duration.record(elapsed.as_secs_f64(), &labels);
        if failed {
            self.operation_errors_total.add(1, &labels);
        }
    }

    pub fn record_query_duration(&self, elapsed: Duration) {
        self.queries_total.add(1, &[]);
        self.query_duration.record(elapsed.as_secs_f64(), &[]);
    }

    pub fn record_query_error(&self) {
        self.query_errors_total.add(1, &[]);
    }
}

/// Span constructors for repository operations and adapter statements
#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn select_span(table: &str) -> Span {
        info_span!("scaffolder.select", db.table = %table)
    }

    pub fn count_span(table: &str) -> Span {
        info_span!("scaffolder.count", db.table = %table)
    }

    pub fn insert_span(table: &str) -> Span {
        info_span!("scaffolder.insert", db.table = %table)
    }

    pub fn update_span(table: &str) -> Span {
        info_span!("scaffolder.update", db.table = %table)
    }

    pub fn delete_span(table: &str) -> Span {
        info_span!("scaffolder.delete", db.table = %table)
    }

    pub fn execute_query_span(query: &str) -> Span {
        info_span!("scaffolder.execute_query", db.statement = %query)
    }
}
