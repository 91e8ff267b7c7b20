//! XOR chunk encoding
//!
//! The float chunk format used by Prometheus TSDB and shipped verbatim by
//! the Thanos StoreAPI:
//!
//! ```text
//! ┌──────────────────┬───────────────────────────────────────────────┐
//! │ num samples (u16)│ bit stream                                    │
//! │ big endian       │ t0 varint, v0 raw 64 bits                     │
//! │                  │ Δt1 uvarint, v1 xor                           │
//! │                  │ ΔΔtN prefix coded, vN xor  (N ≥ 2)            │
//! └──────────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! Delta-of-delta prefixes:
//! - `0`: unchanged delta
//! - `10` + 14 bits, `110` + 17 bits, `1110` + 20 bits (two's complement)
//! - `1111` + 64 bits
//!
//! Values are XORed against the previous value:
//! - `0`: identical value
//! - `10` + meaningful bits inside the previous leading/trailing window
//! - `11` + 5 bits leading zeros + 6 bits significant length + significant bits

use super::bstream::{BitReader, BitWriter};
use super::error::{ChunkError, ChunkResult};
use crate::proto::storepb::AggrChunk;

/// Longest encoding of a 64-bit varint
const MAX_VARINT_LEN: usize = 10;

/// Size of the sample count header
const HEADER_SIZE: usize = 2;

/// Iterator over the samples of one XOR chunk
///
/// Yields `(timestamp_ms, value)` in ascending timestamp order. Once an
/// error has been yielded the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct XorIterator<'a> {
    reader: BitReader<'a>,
    total: u16,
    read: u16,
    t: i64,
    t_delta: u64,
    value: u64,
    leading: u8,
    trailing: u8,
    failed: bool,
}

impl<'a> XorIterator<'a> {
    /// Start iterating over an encoded chunk payload
    pub fn new(data: &'a [u8]) -> ChunkResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(ChunkError::TooShort(data.len()));
        }
        Ok(Self {
            reader: BitReader::new(&data[HEADER_SIZE..]),
            total: u16::from_be_bytes([data[0], data[1]]),
            read: 0,
            t: 0,
            t_delta: 0,
            value: 0,
            leading: 0,
            trailing: 0,
            failed: false,
        })
    }

    /// Number of samples declared in the header
    pub fn num_samples(&self) -> u16 {
        self.total
    }

    fn eof(&self) -> ChunkError {
        ChunkError::UnexpectedEof {
            read: self.read,
            total: self.total,
        }
    }

    fn bit(&mut self) -> ChunkResult<bool> {
        self.reader.read_bit().ok_or_else(|| self.eof())
    }

    fn bits(&mut self, num_bits: u8) -> ChunkResult<u64> {
        self.reader.read_bits(num_bits).ok_or_else(|| self.eof())
    }

    fn read_uvarint(&mut self) -> ChunkResult<u64> {
        let mut x: u64 = 0;
        let mut shift = 0u32;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.reader.read_byte().ok_or_else(|| self.eof())?;
            if byte < 0x80 {
                if i == MAX_VARINT_LEN - 1 && byte > 1 {
                    break;
                }
                return Ok(x | (byte as u64) << shift);
            }
            x |= ((byte & 0x7f) as u64) << shift;
            shift += 7;
        }
        Err(ChunkError::Corrupt("varint overflows a 64-bit integer".to_string()))
    }

    fn read_varint(&mut self) -> ChunkResult<i64> {
        let ux = self.read_uvarint()?;
        let x = (ux >> 1) as i64;
        Ok(if ux & 1 != 0 { !x } else { x })
    }

    fn read_signed(&mut self, num_bits: u8) -> ChunkResult<i64> {
        let bits = self.bits(num_bits)?;
        if bits > 1 << (num_bits - 1) {
            Ok(bits as i64 - (1i64 << num_bits))
        } else {
            Ok(bits as i64)
        }
    }

    fn read_delta_of_delta(&mut self) -> ChunkResult<i64> {
        let mut prefix = 0u8;
        for _ in 0..4 {
            prefix <<= 1;
            if !self.bit()? {
                break;
            }
            prefix |= 1;
        }

        match prefix {
            0b0 => Ok(0),
            0b10 => self.read_signed(14),
            0b110 => self.read_signed(17),
            0b1110 => self.read_signed(20),
            0b1111 => Ok(self.bits(64)? as i64),
            other => Err(ChunkError::Corrupt(format!(
                "invalid delta-of-delta prefix {:#b}",
                other
            ))),
        }
    }

    fn read_value(&mut self) -> ChunkResult<()> {
        if !self.bit()? {
            return Ok(());
        }

        if self.bit()? {
            let leading = self.bits(5)? as u8;
            let mut significant = self.bits(6)? as u8;
            if significant == 0 {
                significant = 64;
            }
            if leading + significant > 64 {
                return Err(ChunkError::Corrupt(format!(
                    "xor window of {} leading and {} significant bits",
                    leading, significant
                )));
            }
            self.leading = leading;
            self.trailing = 64 - leading - significant;
        }

        let significant = 64 - self.leading - self.trailing;
        let bits = self.bits(significant)?;
        self.value ^= bits << self.trailing;
        Ok(())
    }

    fn read_sample(&mut self) -> ChunkResult<(i64, f64)> {
        match self.read {
            0 => {
                self.t = self.read_varint()?;
                self.value = self.bits(64)?;
            }
            1 => {
                self.t_delta = self.read_uvarint()?;
                self.t = self.t.wrapping_add(self.t_delta as i64);
                self.read_value()?;
            }
            _ => {
                let dod = self.read_delta_of_delta()?;
                self.t_delta = (self.t_delta as i64).wrapping_add(dod) as u64;
                self.t = self.t.wrapping_add(self.t_delta as i64);
                self.read_value()?;
            }
        }
        self.read += 1;
        Ok((self.t, f64::from_bits(self.value)))
    }
}

impl Iterator for XorIterator<'_> {
    type Item = ChunkResult<(i64, f64)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.read >= self.total {
            return None;
        }
        let sample = self.read_sample();
        self.failed = sample.is_err();
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        (0, Some((self.total - self.read) as usize))
    }
}

/// Encoder producing XOR chunks
///
/// Inverse of [`XorIterator`]. Timestamps must be appended in
/// non-decreasing order.
#[derive(Debug)]
pub struct XorChunkBuilder {
    writer: BitWriter,
    count: u16,
    min_time: i64,
    t: i64,
    t_delta: u64,
    value: f64,
    leading: u8,
    trailing: u8,
}

impl Default for XorChunkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl XorChunkBuilder {
    pub fn new() -> Self {
        Self {
            writer: BitWriter::new(),
            count: 0,
            min_time: 0,
            t: 0,
            t_delta: 0,
            value: 0.0,
            // 0xff marks "no window yet"
            leading: 0xff,
            trailing: 0,
        }
    }

    /// Encode a whole sample sequence in one go
    pub fn encode(samples: &[(i64, f64)]) -> ChunkResult<Vec<u8>> {
        let mut builder = Self::new();
        for &(t, v) in samples {
            builder.append(t, v)?;
        }
        Ok(builder.finish())
    }

    pub fn num_samples(&self) -> u16 {
        self.count
    }

    /// Append one sample
    pub fn append(&mut self, t: i64, v: f64) -> ChunkResult<()> {
        if self.count == u16::MAX {
            return Err(ChunkError::Full(self.count));
        }

        match self.count {
            0 => {
                self.write_varint(t);
                self.writer.write_bits(v.to_bits(), 64);
                self.min_time = t;
            }
            1 => {
                self.t_delta = t.wrapping_sub(self.t) as u64;
                self.write_uvarint(self.t_delta);
                self.write_value(v);
            }
            _ => {
                let t_delta = t.wrapping_sub(self.t) as u64;
                let dod = t_delta.wrapping_sub(self.t_delta) as i64;
                self.write_delta_of_delta(dod);
                self.t_delta = t_delta;
                self.write_value(v);
            }
        }

        self.t = t;
        self.value = v;
        self.count += 1;
        Ok(())
    }

    /// Finish the chunk and return its payload
    pub fn finish(self) -> Vec<u8> {
        let body = self.writer.finish();
        let mut data = Vec::with_capacity(HEADER_SIZE + body.len());
        data.extend_from_slice(&self.count.to_be_bytes());
        data.extend_from_slice(&body);
        data
    }

    /// Finish the chunk as a raw store chunk spanning the appended samples
    pub fn into_aggr_chunk(self) -> AggrChunk {
        let (min_time, max_time) = (self.min_time, self.t);
        AggrChunk::xor(min_time, max_time, self.finish())
    }

    fn write_uvarint(&mut self, mut x: u64) {
        while x >= 0x80 {
            self.writer.write_byte(x as u8 | 0x80);
            x >>= 7;
        }
        self.writer.write_byte(x as u8);
    }

    fn write_varint(&mut self, x: i64) {
        let mut ux = (x as u64) << 1;
        if x < 0 {
            ux = !ux;
        }
        self.write_uvarint(ux);
    }

    fn write_delta_of_delta(&mut self, dod: i64) {
        if dod == 0 {
            self.writer.write_bit(false);
        } else if bit_range(dod, 14) {
            self.writer.write_bits(0b10, 2);
            self.writer.write_bits(dod as u64, 14);
        } else if bit_range(dod, 17) {
            self.writer.write_bits(0b110, 3);
            self.writer.write_bits(dod as u64, 17);
        } else if bit_range(dod, 20) {
            self.writer.write_bits(0b1110, 4);
            self.writer.write_bits(dod as u64, 20);
        } else {
            self.writer.write_bits(0b1111, 4);
            self.writer.write_bits(dod as u64, 64);
        }
    }

    fn write_value(&mut self, v: f64) {
        let delta = v.to_bits() ^ self.value.to_bits();
        if delta == 0 {
            self.writer.write_bit(false);
            return;
        }
        self.writer.write_bit(true);

        // Only 5 bits are available for the leading zero count
        let leading = (delta.leading_zeros() as u8).min(31);
        let trailing = delta.trailing_zeros() as u8;

        if self.leading != 0xff && leading >= self.leading && trailing >= self.trailing {
            self.writer.write_bit(false);
            let significant = 64 - self.leading - self.trailing;
            self.writer.write_bits(delta >> self.trailing, significant);
            return;
        }

        self.leading = leading;
        self.trailing = trailing;
        let significant = 64 - leading - trailing;
        self.writer.write_bit(true);
        self.writer.write_bits(leading as u64, 5);
        // 64 wraps to 0 in six bits
        self.writer.write_bits(significant as u64, 6);
        self.writer.write_bits(delta >> trailing, significant);
    }
}

/// Whether `x` fits the asymmetric `nbits` two's complement range used by
/// the delta-of-delta buckets
fn bit_range(x: i64, nbits: u8) -> bool {
    -((1i64 << (nbits - 1)) - 1) <= x && x <= 1i64 << (nbits - 1)
}
