//! Wire Messages
//!
//! Protocol Buffer messages for the two protocols this adapter speaks:
//!
//! - **prompb**: Prometheus remote read (`ReadRequest` / `ReadResponse`)
//! - **storepb**: Thanos StoreAPI `Series` call (`SeriesRequest` / `SeriesResponse`)
//!
//! The messages are declared with `prost` derives and carry the same field
//! tags as the upstream `.proto` files, so no build script is needed. Only
//! the fields the adapter reads or writes are declared; prost skips unknown
//! fields when decoding.

pub mod prompb;
pub mod storepb;

/// A label name/value pair.
///
/// Both protocols encode labels identically (`name = 1`, `value = 2`), so a
/// single type is shared between them.
#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct Label {
    /// Label name
    #[prost(string, tag = "1")]
    pub name: String,
    /// Label value
    #[prost(string, tag = "2")]
    pub value: String,
}

impl Label {
    /// Create a new label
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
