//! gRPC StoreAPI client

use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

use super::{SeriesStore, SeriesStream};
use crate::metrics::{GrpcLabels, Metrics};
use crate::proto::storepb::{SeriesRequest, SeriesResponse, SERIES_METHOD};
use crate::read::ReadResult;

/// Store reached over a shared, lazily connected gRPC channel
///
/// Cloning is cheap; every clone multiplexes over the same channel.
#[derive(Debug, Clone)]
pub struct GrpcStore {
    endpoint: String,
    channel: Channel,
    metrics: Option<Arc<Metrics>>,
}

impl GrpcStore {
    /// Create a client for `endpoint` (`host:port` or a full URL)
    ///
    /// No connection is made until the first call.
    pub fn new(endpoint: &str, connect_timeout: Duration) -> ReadResult<Self> {
        let uri = endpoint_uri(endpoint);
        let channel = Endpoint::from_shared(uri.clone())?
            .connect_timeout(connect_timeout)
            .connect_lazy();

        Ok(Self {
            endpoint: uri,
            channel,
            metrics: None,
        })
    }

    /// Record client call metrics into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open(
        &self,
        request: SeriesRequest,
    ) -> Result<tonic::Streaming<SeriesResponse>, tonic::Status> {
        let mut client = tonic::client::Grpc::new(self.channel.clone());
        client
            .ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("store not ready: {}", e)))?;

        let codec: ProstCodec<SeriesRequest, SeriesResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(SERIES_METHOD);
        let response = client
            .server_streaming(tonic::Request::new(request), path, codec)
            .await?;

        Ok(response.into_inner())
    }
}

#[async_trait]
impl SeriesStore for GrpcStore {
    async fn series(&self, request: SeriesRequest) -> ReadResult<SeriesStream> {
        let Some(metrics) = &self.metrics else {
            return Ok(self.open(request).await?.boxed());
        };

        let labels = GrpcLabels::server_stream(SERIES_METHOD);
        metrics.record_grpc_started(&labels);

        match self.open(request).await {
            Ok(stream) => {
                Ok(InstrumentedStream::new(stream.boxed(), Arc::clone(metrics), labels).boxed())
            }
            Err(status) => {
                metrics.record_grpc_handled(&labels, status.code());
                Err(status.into())
            }
        }
    }
}

/// Counts received messages and the final status of one call
struct InstrumentedStream {
    inner: SeriesStream,
    metrics: Arc<Metrics>,
    labels: GrpcLabels,
    handled: bool,
}

impl InstrumentedStream {
    fn new(inner: SeriesStream, metrics: Arc<Metrics>, labels: GrpcLabels) -> Self {
        Self {
            inner,
            metrics,
            labels,
            handled: false,
        }
    }

    fn handle(&mut self, code: tonic::Code) {
        if !self.handled {
            self.handled = true;
            self.metrics.record_grpc_handled(&self.labels, code);
        }
    }
}

impl Stream for InstrumentedStream {
    type Item = Result<SeriesResponse, tonic::Status>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = ready!(this.inner.poll_next_unpin(cx));
        match &item {
            Some(Ok(_)) => this.metrics.record_grpc_msg_received(&this.labels),
            Some(Err(status)) => this.handle(status.code()),
            None => this.handle(tonic::Code::Ok),
        }
        Poll::Ready(item)
    }
}

fn endpoint_uri(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}
