//! # thanos-remote-read
//!
//! Prometheus remote read adapter for the Thanos StoreAPI.
//!
//! Prometheus sends a snappy compressed `ReadRequest`; every query in it is
//! translated into a StoreAPI `Series` call, the streamed series are merged
//! across replicas and their XOR chunks decoded, and the samples are
//! returned as a `ReadResponse`.
//!
//! ## Modules
//!
//! - [`proto`]: Wire messages of both protocols
//! - [`chunk`]: XOR chunk decoding
//! - [`labels`]: Replica label handling and label ordering
//! - [`read`]: Query translation, stream consumption and series merging
//! - [`store`]: StoreAPI backends
//! - [`metrics`]: Prometheus metrics of the adapter
//! - [`api`]: HTTP server with Axum
//! - [`config`]: Configuration loading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use thanos_remote_read::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(GrpcStore::new("localhost:10901", Duration::from_secs(5))?);
//!     let options = ReadOptions {
//!         replica_labels: ReplicaLabels::from_csv("replica"),
//!         warning_policy: WarningPolicy::Fail,
//!     };
//!     let reader = RemoteReader::new(store, options, Arc::new(Metrics::new()));
//!
//!     let request = proto::prompb::ReadRequest::default();
//!     let response = reader.read(&request, &IgnoredMatchers::default()).await?;
//!     println!("{} results", response.results.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chunk;
pub mod config;
pub mod labels;
pub mod metrics;
pub mod proto;
pub mod read;
pub mod store;

// Re-export top-level types for convenience
pub use chunk::{decode_chunk, ChunkError, ChunkResult, XorChunkBuilder, XorIterator};

pub use labels::{compare_labels, PartitionedLabels, ReplicaLabels};

pub use read::{
    series_request, IgnoredMatchers, MergeOutput, MergeStats, ReadError, ReadOptions,
    ReadResult, RemoteReader, SeriesMerger, WarningPolicy,
};

pub use store::{GrpcStore, SeriesStore, SeriesStream};

pub use metrics::Metrics;

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
