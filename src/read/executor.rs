//! Remote read execution
//!
//! Runs every query of a `ReadRequest` against the store, one after the
//! other, and assembles one `QueryResult` per query in request order. The
//! first failing query fails the whole request.

use std::sync::Arc;
use std::time::Instant;

use super::error::ReadResult;
use super::merge::SeriesMerger;
use super::stream::{drain, WarningPolicy};
use super::translate::{series_request, IgnoredMatchers};
use crate::labels::ReplicaLabels;
use crate::metrics::Metrics;
use crate::proto::prompb::{Query, QueryResult, ReadRequest, ReadResponse};
use crate::store::SeriesStore;

/// Process-wide read settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Labels whose values identify a replica rather than a series
    pub replica_labels: ReplicaLabels,
    pub warning_policy: WarningPolicy,
}

/// Answers remote read requests from a store
#[derive(Clone)]
pub struct RemoteReader {
    store: Arc<dyn SeriesStore>,
    options: ReadOptions,
    metrics: Arc<Metrics>,
}

impl RemoteReader {
    pub fn new(store: Arc<dyn SeriesStore>, options: ReadOptions, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            options,
            metrics,
        }
    }

    /// Answer a whole remote read request
    pub async fn read(
        &self,
        request: &ReadRequest,
        ignored: &IgnoredMatchers,
    ) -> ReadResult<ReadResponse> {
        let mut results = Vec::with_capacity(request.queries.len());
        for (index, query) in request.queries.iter().enumerate() {
            results.push(self.query(index, query, ignored).await?);
        }
        Ok(ReadResponse { results })
    }

    async fn query(
        &self,
        index: usize,
        query: &Query,
        ignored: &IgnoredMatchers,
    ) -> ReadResult<QueryResult> {
        let start = Instant::now();

        let request = series_request(query, ignored)?;
        tracing::debug!(
            query = index,
            min_time = request.min_time,
            max_time = request.max_time,
            matchers = request.matchers.len(),
            "Sending store request"
        );

        let stream = self.store.series(request).await?;
        let mut merger = SeriesMerger::new(&self.options.replica_labels);
        let warnings = drain(stream, &mut merger).await?;

        self.metrics.store_warnings.inc_by(warnings.len() as u64);
        self.options.warning_policy.check(warnings)?;

        let output = merger.finish()?;
        self.metrics
            .record_merge(&output.stats, output.timeseries.len());
        self.metrics
            .query_duration_seconds
            .observe(start.elapsed().as_secs_f64());

        tracing::debug!(
            query = index,
            received = output.stats.received,
            series = output.timeseries.len(),
            samples = output.stats.samples,
            sorted = output.sorted,
            deduped_sorted = output.stats.deduped_sorted,
            deduped_unsorted = output.stats.deduped_unsorted,
            dropped_chunks = output.stats.dropped_chunks,
            duration_ms = start.elapsed().as_millis() as u64,
            "Merged store series"
        );

        Ok(QueryResult {
            timeseries: output.timeseries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::prompb::{LabelMatcher, MatcherType};
    use crate::proto::storepb::SeriesResponse;
    use crate::read::ReadError;
    use crate::store::testing::{labels, series, xor_chunk, ScriptedStore, Step};

    fn reader(store: Arc<ScriptedStore>, options: ReadOptions) -> (RemoteReader, Arc<Metrics>) {
        let metrics = Arc::new(Metrics::new());
        (RemoteReader::new(store, options, Arc::clone(&metrics)), metrics)
    }

    fn query(name: &str) -> Query {
        Query {
            start_timestamp_ms: 0,
            end_timestamp_ms: 10_000,
            matchers: vec![LabelMatcher::new(MatcherType::Eq, "__name__", name)],
        }
    }

    fn up_series() -> SeriesResponse {
        SeriesResponse::series(series(
            &[("__name__", "up"), ("job", "node")],
            vec![xor_chunk(&[(1000, 1.0), (2000, 1.0)])],
        ))
    }

    #[tokio::test]
    async fn test_empty_request_makes_no_store_calls() {
        let store = Arc::new(ScriptedStore::responding(vec![up_series()]));
        let (reader, _) = reader(Arc::clone(&store), ReadOptions::default());

        let response = reader
            .read(&ReadRequest::default(), &IgnoredMatchers::default())
            .await
            .unwrap();

        assert!(response.results.is_empty());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_one_result_per_query() {
        let store = Arc::new(ScriptedStore::responding(vec![up_series()]));
        let (reader, metrics) = reader(Arc::clone(&store), ReadOptions::default());
        let request = ReadRequest {
            queries: vec![query("up"), query("down"), query("sideways")],
        };

        let response = reader.read(&request, &IgnoredMatchers::default()).await.unwrap();

        assert_eq!(response.results.len(), 3);
        assert_eq!(store.calls(), 3);
        let requests = store.requests();
        assert_eq!(requests[1].matchers[0].value, "down");
        assert_eq!(requests[2].matchers[0].value, "sideways");
        for result in &response.results {
            assert_eq!(result.timeseries.len(), 1);
            assert_eq!(
                result.timeseries[0].labels,
                labels(&[("__name__", "up"), ("job", "node")])
            );
            assert_eq!(result.timeseries[0].samples.len(), 2);
        }
        assert_eq!(metrics.series.get(), 3);
    }

    #[tokio::test]
    async fn test_replica_dedup_applied() {
        let store = Arc::new(ScriptedStore::responding(vec![
            SeriesResponse::series(series(
                &[("__name__", "up"), ("replica", "a")],
                vec![xor_chunk(&[(1000, 1.0), (2000, 1.0)])],
            )),
            SeriesResponse::series(series(
                &[("__name__", "up"), ("replica", "b")],
                vec![xor_chunk(&[(1000, 1.0), (2000, 1.0)])],
            )),
        ]));
        let options = ReadOptions {
            replica_labels: ReplicaLabels::new(["replica"]),
            ..Default::default()
        };
        let (reader, metrics) = reader(store, options);
        let request = ReadRequest {
            queries: vec![query("up")],
        };

        let response = reader.read(&request, &IgnoredMatchers::default()).await.unwrap();

        let ts = &response.results[0].timeseries;
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].labels, labels(&[("__name__", "up")]));
        assert_eq!(ts[0].samples.len(), 2);
        assert_eq!(metrics.dropped_chunks.get(), 1);
    }

    #[tokio::test]
    async fn test_warning_fails_query_by_default() {
        let store = Arc::new(ScriptedStore::responding(vec![
            up_series(),
            SeriesResponse::warning("store gateway down"),
        ]));
        let (reader, metrics) = reader(store, ReadOptions::default());
        let request = ReadRequest {
            queries: vec![query("up")],
        };

        let err = reader.read(&request, &IgnoredMatchers::default()).await.unwrap_err();

        assert!(matches!(err, ReadError::BackendWarning(ref w) if w == &["store gateway down"]));
        assert_eq!(metrics.store_warnings.get(), 1);
    }

    #[tokio::test]
    async fn test_warning_only_stream_fails_by_default() {
        let store = Arc::new(ScriptedStore::responding(vec![SeriesResponse::warning(
            "nothing here",
        )]));
        let (reader, metrics) = reader(store, ReadOptions::default());
        let request = ReadRequest {
            queries: vec![query("up")],
        };

        let err = reader.read(&request, &IgnoredMatchers::default()).await.unwrap_err();

        assert!(matches!(err, ReadError::BackendWarning(ref w) if w == &["nothing here"]));
        assert_eq!(metrics.store_warnings.get(), 1);
        assert_eq!(metrics.series.get(), 0);
    }

    #[tokio::test]
    async fn test_warning_only_stream_ignored() {
        let store = Arc::new(ScriptedStore::responding(vec![SeriesResponse::warning(
            "nothing here",
        )]));
        let options = ReadOptions {
            warning_policy: WarningPolicy::Ignore,
            ..Default::default()
        };
        let (reader, metrics) = reader(store, options);
        let request = ReadRequest {
            queries: vec![query("up")],
        };

        let response = reader.read(&request, &IgnoredMatchers::default()).await.unwrap();

        assert_eq!(response.results.len(), 1);
        assert!(response.results[0].timeseries.is_empty());
        assert_eq!(metrics.store_warnings.get(), 1);
    }

    #[tokio::test]
    async fn test_first_failing_query_stops_request() {
        let store = Arc::new(ScriptedStore::new(vec![
            Step::Respond(up_series()),
            Step::Fail(tonic::Code::Unavailable, "connection reset".to_string()),
        ]));
        let (reader, _) = reader(Arc::clone(&store), ReadOptions::default());
        let request = ReadRequest {
            queries: vec![query("up"), query("up")],
        };

        let err = reader.read(&request, &IgnoredMatchers::default()).await.unwrap_err();

        assert!(matches!(err, ReadError::Transport(ref s) if s.code() == tonic::Code::Unavailable));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_open_error() {
        let store = Arc::new(ScriptedStore::failing(tonic::Code::Internal, "rpc error"));
        let (reader, _) = reader(store, ReadOptions::default());
        let request = ReadRequest {
            queries: vec![query("up")],
        };

        let err = reader.read(&request, &IgnoredMatchers::default()).await.unwrap_err();
        assert!(matches!(err, ReadError::Transport(_)));
    }

    #[tokio::test]
    async fn test_translation_error_before_store_call() {
        let store = Arc::new(ScriptedStore::responding(vec![]));
        let (reader, _) = reader(Arc::clone(&store), ReadOptions::default());
        let request = ReadRequest {
            queries: vec![Query {
                matchers: vec![LabelMatcher {
                    r#type: 7,
                    name: "job".to_string(),
                    value: "x".to_string(),
                }],
                ..Default::default()
            }],
        };

        let err = reader.read(&request, &IgnoredMatchers::default()).await.unwrap_err();

        assert!(matches!(err, ReadError::Translation(_)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_ignored_matchers_not_sent() {
        let store = Arc::new(ScriptedStore::responding(vec![]));
        let (reader, _) = reader(Arc::clone(&store), ReadOptions::default());
        let mut q = query("up");
        q.matchers.push(LabelMatcher::new(MatcherType::Eq, "ignorethis", "x"));
        let request = ReadRequest { queries: vec![q] };

        reader
            .read(&request, &IgnoredMatchers::new(["ignorethis"]))
            .await
            .unwrap();

        let sent = store.requests();
        assert_eq!(sent[0].matchers.len(), 1);
        assert_eq!(sent[0].matchers[0].name, "__name__");
    }
}
