//! Chunk Decoding
//!
//! Materializes the raw chunks returned by the store into samples:
//!
//! - **bstream**: MSB-first bit reader/writer
//! - **xor**: Prometheus XOR chunk iterator and the inverse encoder
//! - **error**: Decode errors
//!
//! Only XOR chunks are understood. A chunk without raw data or with any
//! other encoding is rejected, since the adapter always asks the store for
//! raw chunks.

pub mod bstream;
pub mod error;
pub mod xor;

pub use error::{ChunkError, ChunkResult};
pub use xor::{XorChunkBuilder, XorIterator};

use crate::proto::prompb::Sample;
use crate::proto::storepb::{AggrChunk, Encoding};

/// Decode a store chunk, appending its samples to `out`
///
/// Returns the number of samples appended. On error `out` may hold a
/// prefix of the chunk's samples; callers abort the whole query anyway.
pub fn decode_chunk(chunk: &AggrChunk, out: &mut Vec<Sample>) -> ChunkResult<usize> {
    let raw = chunk.raw.as_ref().ok_or(ChunkError::MissingRaw)?;

    match Encoding::try_from(raw.r#type) {
        Ok(Encoding::Xor) => {}
        Ok(other) => return Err(ChunkError::UnsupportedEncoding(format!("{:?}", other))),
        Err(_) => return Err(ChunkError::UnsupportedEncoding(raw.r#type.to_string())),
    }

    let samples = XorIterator::new(&raw.data)?;
    out.reserve(samples.num_samples() as usize);

    let before = out.len();
    for sample in samples {
        let (timestamp, value) = sample?;
        out.push(Sample::new(timestamp, value));
    }
    Ok(out.len() - before)
}
