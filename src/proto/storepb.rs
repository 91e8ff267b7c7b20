//! Thanos StoreAPI `Series` messages
//!
//! ```protobuf
//! service Store {
//!   rpc Series(SeriesRequest) returns (stream SeriesResponse);
//! }
//!
//! message SeriesRequest {
//!   int64 min_time = 1;
//!   int64 max_time = 2;
//!   repeated LabelMatcher matchers = 3;
//!   int64 max_resolution_window = 4;
//!   repeated Aggr aggregates = 5;
//!   bool partial_response_disabled = 6;
//! }
//!
//! message SeriesResponse {
//!   oneof result {
//!     Series series = 1;
//!     string warning = 2;
//!   }
//! }
//!
//! message Series    { repeated Label labels = 1; repeated AggrChunk chunks = 2; }
//! message AggrChunk { int64 min_time = 1; int64 max_time = 2; Chunk raw = 3; }
//! message Chunk     { Encoding type = 1; bytes data = 2; }
//! ```

use super::Label;

/// Full gRPC method path of the streaming `Series` call
pub const SERIES_METHOD: &str = "/thanos.Store/Series";

#[derive(Clone, PartialEq, prost::Message)]
pub struct SeriesRequest {
    #[prost(int64, tag = "1")]
    pub min_time: i64,
    #[prost(int64, tag = "2")]
    pub max_time: i64,
    #[prost(message, repeated, tag = "3")]
    pub matchers: Vec<LabelMatcher>,
    #[prost(int64, tag = "4")]
    pub max_resolution_window: i64,
    #[prost(enumeration = "Aggr", repeated, tag = "5")]
    pub aggregates: Vec<i32>,
    #[prost(bool, tag = "6")]
    pub partial_response_disabled: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LabelMatcher {
    #[prost(enumeration = "MatcherType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MatcherType {
    Eq = 0,
    Neq = 1,
    Re = 2,
    Nre = 3,
}

/// Downsampling aggregate; the adapter only ever asks for `Raw`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Aggr {
    Raw = 0,
    Count = 1,
    Sum = 2,
    Min = 3,
    Max = 4,
    Counter = 5,
}

/// One message of the `Series` response stream
#[derive(Clone, PartialEq, prost::Message)]
pub struct SeriesResponse {
    #[prost(oneof = "series_response::Payload", tags = "1, 2")]
    pub payload: Option<series_response::Payload>,
}

pub mod series_response {
    /// Either series data or a data-quality warning
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "1")]
        Series(super::Series),
        #[prost(string, tag = "2")]
        Warning(String),
    }
}

/// A series as stored by one backend replica
#[derive(Clone, PartialEq, prost::Message)]
pub struct Series {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub chunks: Vec<AggrChunk>,
}

/// A chunk covering `[min_time, max_time]`, carrying raw data when requested
#[derive(Clone, PartialEq, prost::Message)]
pub struct AggrChunk {
    #[prost(int64, tag = "1")]
    pub min_time: i64,
    #[prost(int64, tag = "2")]
    pub max_time: i64,
    #[prost(message, optional, tag = "3")]
    pub raw: Option<Chunk>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Chunk {
    #[prost(enumeration = "Encoding", tag = "1")]
    pub r#type: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

/// Chunk payload encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Encoding {
    Xor = 0,
    Histogram = 1,
    FloatHistogram = 2,
}

impl SeriesResponse {
    /// Wrap a series payload
    pub fn series(series: Series) -> Self {
        Self {
            payload: Some(series_response::Payload::Series(series)),
        }
    }

    /// Wrap a warning payload
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            payload: Some(series_response::Payload::Warning(message.into())),
        }
    }
}

impl AggrChunk {
    /// Build a raw XOR chunk
    pub fn xor(min_time: i64, max_time: i64, data: Vec<u8>) -> Self {
        Self {
            min_time,
            max_time,
            raw: Some(Chunk {
                r#type: Encoding::Xor as i32,
                data,
            }),
        }
    }
}
