//! Prometheus metrics for the adapter.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

use crate::read::MergeStats;

/// Labels for HTTP request metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub code: String,
    pub method: String,
    pub handler: String,
}

/// Labels for dedup metrics: which merge path did the work.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DedupLabels {
    pub response_state: String,
}

impl DedupLabels {
    fn sorted() -> Self {
        Self {
            response_state: "sorted".to_string(),
        }
    }

    fn unsorted() -> Self {
        Self {
            response_state: "unsorted".to_string(),
        }
    }
}

/// Labels identifying one gRPC client method.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct GrpcLabels {
    pub grpc_type: String,
    pub grpc_service: String,
    pub grpc_method: String,
}

impl GrpcLabels {
    /// Labels for a server streaming call to `path` (`/package.Service/Method`)
    pub fn server_stream(path: &str) -> Self {
        let path = path.trim_start_matches('/');
        let (service, method) = path.split_once('/').unwrap_or((path, ""));
        Self {
            grpc_type: "server_stream".to_string(),
            grpc_service: service.to_string(),
            grpc_method: method.to_string(),
        }
    }

    pub(crate) fn with_code(&self, code: tonic::Code) -> GrpcHandledLabels {
        GrpcHandledLabels {
            grpc_type: self.grpc_type.clone(),
            grpc_service: self.grpc_service.clone(),
            grpc_method: self.grpc_method.clone(),
            grpc_code: grpc_code_name(code),
        }
    }
}

/// [`GrpcLabels`] plus the status code the call finished with.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct GrpcHandledLabels {
    pub grpc_type: String,
    pub grpc_service: String,
    pub grpc_method: String,
    pub grpc_code: String,
}

/// Canonical gRPC code names (`OK`, `Canceled`, `Unavailable`, ...)
fn grpc_code_name(code: tonic::Code) -> String {
    match code {
        tonic::Code::Ok => "OK".to_string(),
        tonic::Code::Cancelled => "Canceled".to_string(),
        other => format!("{:?}", other),
    }
}

/// Container for all Prometheus metrics.
///
/// Counters are registered without the `_total` suffix; the text encoder
/// appends it.
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,

    /// HTTP requests by status code, method and handler.
    pub http_requests: Family<HttpLabels, Counter>,

    /// Output series emitted.
    pub series: Counter,

    /// Series merged into an existing accumulator.
    pub deduped_series: Family<DedupLabels, Counter>,

    /// Chunks dropped for overlapping an accepted chunk.
    pub dropped_chunks: Counter,

    /// Warnings received from the store.
    pub store_warnings: Counter,

    /// Time spent per remote read query.
    pub query_duration_seconds: Histogram,

    /// gRPC calls started against the store.
    pub grpc_client_started: Family<GrpcLabels, Counter>,

    /// gRPC calls finished, by status code.
    pub grpc_client_handled: Family<GrpcHandledLabels, Counter>,

    /// Stream messages received from the store.
    pub grpc_client_msg_received: Family<GrpcLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics registry with all metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total number of HTTP requests by status code, method and handler",
            http_requests.clone(),
        );

        let series = Counter::default();
        registry.register(
            "thanos_remote_read_series",
            "Number of series returned to remote read clients",
            series.clone(),
        );

        let deduped_series = Family::<DedupLabels, Counter>::default();
        registry.register(
            "thanos_remote_read_deduped_series",
            "Number of store series merged into another series",
            deduped_series.clone(),
        );

        let dropped_chunks = Counter::default();
        registry.register(
            "thanos_remote_read_dropped_chunks",
            "Number of chunks dropped because they overlap an earlier chunk",
            dropped_chunks.clone(),
        );

        let store_warnings = Counter::default();
        registry.register(
            "thanos_remote_read_store_warnings",
            "Number of warnings received from the store",
            store_warnings.clone(),
        );

        // 5ms to ~20s
        let query_duration_seconds = Histogram::new(exponential_buckets(0.005, 2.0, 13));
        registry.register(
            "thanos_remote_read_query_duration_seconds",
            "Time spent answering one remote read query",
            query_duration_seconds.clone(),
        );

        let grpc_client_started = Family::<GrpcLabels, Counter>::default();
        registry.register(
            "grpc_client_started",
            "Total number of RPCs started on the client",
            grpc_client_started.clone(),
        );

        let grpc_client_handled = Family::<GrpcHandledLabels, Counter>::default();
        registry.register(
            "grpc_client_handled",
            "Total number of RPCs completed by the client, regardless of success or failure",
            grpc_client_handled.clone(),
        );

        let grpc_client_msg_received = Family::<GrpcLabels, Counter>::default();
        registry.register(
            "grpc_client_msg_received",
            "Total number of RPC stream messages received by the client",
            grpc_client_msg_received.clone(),
        );

        Self {
            registry,
            http_requests,
            series,
            deduped_series,
            dropped_chunks,
            store_warnings,
            query_duration_seconds,
            grpc_client_started,
            grpc_client_handled,
            grpc_client_msg_received,
        }
    }

    /// Count one finished HTTP request.
    pub fn record_request(&self, code: u16, method: &str, handler: &str) {
        self.http_requests
            .get_or_create(&HttpLabels {
                code: code.to_string(),
                method: method.to_lowercase(),
                handler: handler.to_string(),
            })
            .inc();
    }

    /// Fold the statistics of one merge into the counters.
    pub fn record_merge(&self, stats: &MergeStats, series: usize) {
        self.series.inc_by(series as u64);
        self.deduped_series
            .get_or_create(&DedupLabels::sorted())
            .inc_by(stats.deduped_sorted as u64);
        self.deduped_series
            .get_or_create(&DedupLabels::unsorted())
            .inc_by(stats.deduped_unsorted as u64);
        self.dropped_chunks.inc_by(stats.dropped_chunks as u64);
    }

    pub fn record_grpc_started(&self, labels: &GrpcLabels) {
        self.grpc_client_started.get_or_create(labels).inc();
    }

    pub fn record_grpc_msg_received(&self, labels: &GrpcLabels) {
        self.grpc_client_msg_received.get_or_create(labels).inc();
    }

    pub fn record_grpc_handled(&self, labels: &GrpcLabels, code: tonic::Code) {
        self.grpc_client_handled
            .get_or_create(&labels.with_code(code))
            .inc();
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}
