//! Store backends
//!
//! The reader only needs one thing from a store: a stream of
//! `SeriesResponse` messages for a `SeriesRequest`. [`SeriesStore`] is that
//! seam; [`GrpcStore`] speaks the Thanos StoreAPI over gRPC.

pub mod grpc;

#[cfg(test)]
pub(crate) mod testing;

pub use grpc::GrpcStore;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::proto::storepb::{SeriesRequest, SeriesResponse};
use crate::read::ReadResult;

/// Response stream of one `Series` call
///
/// The stream ends cleanly with `None`; any `Err` item is a transport
/// failure and ends the call.
pub type SeriesStream = BoxStream<'static, Result<SeriesResponse, tonic::Status>>;

/// A backend answering StoreAPI `Series` calls
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Open a response stream for `request`
    async fn series(&self, request: SeriesRequest) -> ReadResult<SeriesStream>;
}
