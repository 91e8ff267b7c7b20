//! Prometheus remote read messages
//!
//! ```protobuf
//! message ReadRequest  { repeated Query queries = 1; }
//! message ReadResponse { repeated QueryResult results = 1; }
//!
//! message Query {
//!   int64 start_timestamp_ms = 1;
//!   int64 end_timestamp_ms = 2;
//!   repeated LabelMatcher matchers = 3;
//! }
//!
//! message QueryResult { repeated TimeSeries timeseries = 1; }
//! message TimeSeries  { repeated Label labels = 1; repeated Sample samples = 2; }
//! message Sample      { double value = 1; int64 timestamp = 2; }
//! ```

use super::Label;

/// Remote read request, one entry per query
#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRequest {
    #[prost(message, repeated, tag = "1")]
    pub queries: Vec<Query>,
}

/// Remote read response, one result per query in request order
#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<QueryResult>,
}

/// A single selector over a closed time range
#[derive(Clone, PartialEq, prost::Message)]
pub struct Query {
    /// Inclusive start, milliseconds since epoch
    #[prost(int64, tag = "1")]
    pub start_timestamp_ms: i64,
    /// Inclusive end, milliseconds since epoch
    #[prost(int64, tag = "2")]
    pub end_timestamp_ms: i64,
    #[prost(message, repeated, tag = "3")]
    pub matchers: Vec<LabelMatcher>,
}

/// Label matcher as sent by Prometheus
#[derive(Clone, PartialEq, prost::Message)]
pub struct LabelMatcher {
    #[prost(enumeration = "MatcherType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub value: String,
}

/// Matcher operator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MatcherType {
    /// `=`
    Eq = 0,
    /// `!=`
    Neq = 1,
    /// `=~`
    Re = 2,
    /// `!~`
    Nre = 3,
}

/// Series returned for one query
#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryResult {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// One output series: identity labels plus ordered samples
#[derive(Clone, PartialEq, prost::Message)]
pub struct TimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

/// A decoded sample
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Sample {
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Milliseconds since epoch
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

impl LabelMatcher {
    /// Create a matcher with the given operator
    pub fn new(kind: MatcherType, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            r#type: kind as i32,
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { value, timestamp }
    }
}
