//! Remote Read
//!
//! Turns Prometheus remote read requests into StoreAPI calls and the
//! resulting streams back into Prometheus time series:
//!
//! - **translate**: Query → `SeriesRequest`, minus ignored matchers
//! - **stream**: Drains a store stream, applies the warning policy
//! - **merge**: Replica dedup and chunk decoding
//! - **executor**: Runs all queries of a request
//! - **error**: Read errors

pub mod error;
pub mod executor;
pub mod merge;
pub mod stream;
pub mod translate;

pub use error::{ReadError, ReadResult};
pub use executor::{ReadOptions, RemoteReader};
pub use merge::{MergeOutput, MergeStats, ReplicaSeries, SeriesMerger};
pub use stream::{drain, WarningPolicy};
pub use translate::{series_request, IgnoredMatchers, IGNORE_PARAM};
