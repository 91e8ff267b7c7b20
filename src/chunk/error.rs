//! Chunk decoding error types

use thiserror::Error;

/// Errors that can occur while decoding a store chunk
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// The chunk has no raw payload although raw data was requested
    #[error("unexpectedly missing raw chunk data")]
    MissingRaw,

    /// The chunk uses an encoding other than XOR
    #[error("unexpected encoding type: {0}")]
    UnsupportedEncoding(String),

    /// Payload is shorter than the 2 byte sample count header
    #[error("chunk too short: {0} bytes")]
    TooShort(usize),

    /// Bit stream ended before all declared samples were read
    #[error("unexpected end of chunk after {read} of {total} samples")]
    UnexpectedEof { read: u16, total: u16 },

    /// The payload is structurally invalid
    #[error("corrupt chunk: {0}")]
    Corrupt(String),

    /// The sample count header cannot represent another sample
    #[error("chunk is full ({0} samples)")]
    Full(u16),
}

/// Result type for chunk operations
pub type ChunkResult<T> = Result<T, ChunkError>;
