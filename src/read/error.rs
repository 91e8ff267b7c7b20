//! Remote read error types
//!
//! Every error aborts the whole read request; no partial results are
//! returned and nothing is retried here.

use thiserror::Error;

use crate::chunk::ChunkError;

/// Errors that can occur while serving a remote read
#[derive(Error, Debug)]
pub enum ReadError {
    /// A matcher could not be mapped to the store protocol
    #[error("Translation error: {0}")]
    Translation(String),

    /// The store stream ended abnormally
    #[error("Store transport error: {0}")]
    Transport(#[from] tonic::Status),

    /// The store endpoint could not be set up
    #[error("Store connection error: {0}")]
    Connect(#[from] tonic::transport::Error),

    /// The store reported data-quality warnings and the policy is to fail
    #[error("Store returned warnings: {}", .0.join("; "))]
    BackendWarning(Vec<String>),

    /// A chunk could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] ChunkError),
}

/// Result type for read operations
pub type ReadResult<T> = Result<T, ReadError>;
