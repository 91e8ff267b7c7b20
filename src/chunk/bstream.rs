//! Bit-level stream primitives
//!
//! Bits are stored MSB-first within each byte, the layout used by
//! Prometheus chunk encodings:
//! ```text
//! Byte: [bit0 bit1 bit2 bit3 bit4 bit5 bit6 bit7]
//!        MSB                                    LSB
//! ```

/// Accumulates bits into a byte buffer
#[derive(Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    /// Number of bits used in the last byte of `buffer` (0 means byte aligned)
    bit_position: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a single bit
    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_position == 0 {
            self.buffer.push(0);
        }
        if bit {
            let last = self.buffer.len() - 1;
            self.buffer[last] |= 1 << (7 - self.bit_position);
        }
        self.bit_position = (self.bit_position + 1) % 8;
    }

    /// Write the low `num_bits` bits of `value`, most significant first
    pub fn write_bits(&mut self, value: u64, num_bits: u8) {
        debug_assert!(num_bits <= 64);
        for i in (0..num_bits).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Write a full byte at the current bit position
    pub fn write_byte(&mut self, byte: u8) {
        self.write_bits(byte as u64, 8);
    }

    /// Number of bytes written so far, counting a partial byte
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Finish writing; a trailing partial byte is zero padded
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Reads bits from a borrowed byte slice
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Absolute bit offset into `data`
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bits left to read
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// Read one bit, `None` at end of stream
    pub fn read_bit(&mut self) -> Option<bool> {
        if self.remaining() == 0 {
            return None;
        }
        let byte = self.data[self.pos / 8];
        let bit = (byte >> (7 - self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    /// Read `num_bits` (at most 64) bits as an unsigned integer
    pub fn read_bits(&mut self, num_bits: u8) -> Option<u64> {
        debug_assert!(num_bits <= 64);
        let mut left = num_bits as usize;
        if self.remaining() < left {
            return None;
        }

        let mut value: u64 = 0;
        while left > 0 {
            let byte = self.data[self.pos / 8];
            let available = 8 - self.pos % 8;
            let take = available.min(left);
            let bits = (byte >> (available - take)) as u64 & ((1u64 << take) - 1);
            value = (value << take) | bits;
            self.pos += take;
            left -= take;
        }
        Some(value)
    }

    /// Read 8 bits at the current position, aligned or not
    pub fn read_byte(&mut self) -> Option<u8> {
        self.read_bits(8).map(|b| b as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_bits() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_bits(0b1010, 4);
        writer.write_bits(u64::MAX, 64);
        writer.write_byte(0xA5);
        let buffer = writer.finish();
        assert_eq!(buffer.len(), 10); // 77 bits

        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.read_bit(), Some(true));
        assert_eq!(reader.read_bits(4), Some(0b1010));
        assert_eq!(reader.read_bits(64), Some(u64::MAX));
        assert_eq!(reader.read_byte(), Some(0xA5));
        // Zero padding fills the final byte
        assert_eq!(reader.remaining(), 3);
        assert_eq!(reader.read_bits(3), Some(0));
        assert_eq!(reader.read_bit(), None);
    }

    #[test]
    fn test_msb_first_layout() {
        let mut writer = BitWriter::new();
        writer.write_bits(0b101, 3);
        assert_eq!(writer.finish(), vec![0b1010_0000]);
    }

    #[test]
    fn test_read_past_end() {
        let data = [0xFFu8];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(9), None);
        // A failed read does not consume anything
        assert_eq!(reader.read_bits(8), Some(0xFF));
    }

    #[test]
    fn test_writer_len() {
        let mut writer = BitWriter::new();
        assert!(writer.is_empty());
        writer.write_bit(false);
        assert_eq!(writer.len(), 1);
        writer.write_bits(0, 8);
        assert_eq!(writer.len(), 2);
    }
}
