//! Growable bit writer.

use crate::error::{BitError, BitResult};

/// A growable MSB-first bit writer.
///
/// Bits are collected in a small accumulator and flushed to the byte buffer a
/// byte at a time. Byte-aligned helpers require the writer to sit on a byte
/// boundary; call [`align_to_byte`](Self::align_to_byte) first.
#[derive(Debug, Default, Clone)]
pub struct BitVecWriter {
    bytes: Vec<u8>,
    acc: u32,
    acc_bits: u8,
}

impl BitVecWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer with pre-allocated byte capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            acc: 0,
            acc_bits: 0,
        }
    }

    /// Number of bits written so far.
    #[must_use]
    pub fn bits_written(&self) -> usize {
        self.bytes.len() * 8 + usize::from(self.acc_bits)
    }

    /// Number of bytes the output occupies once finished.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len() + usize::from(self.acc_bits > 0)
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, value: bool) {
        self.acc = (self.acc << 1) | u32::from(value);
        self.acc_bits += 1;
        if self.acc_bits == 8 {
            self.flush_acc();
        }
    }

    /// Writes the low `bits` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, bits: u8) -> BitResult<()> {
        if bits > 32 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 32 });
        }
        if bits < 32 && value >> bits != 0 {
            return Err(BitError::ValueOutOfRange { value, bits });
        }
        let mut remaining = bits;
        while remaining > 0 {
            let room = 8 - self.acc_bits;
            let take = room.min(remaining);
            let shift = remaining - take;
            let chunk = (value >> shift) & ((1u32 << take) - 1);
            self.acc = (self.acc << take) | chunk;
            self.acc_bits += take;
            remaining -= take;
            if self.acc_bits == 8 {
                self.flush_acc();
            }
        }
        Ok(())
    }

    /// Pads with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.acc_bits > 0 {
            self.acc <<= 8 - self.acc_bits;
            self.acc_bits = 8;
            self.flush_acc();
        }
    }

    /// Writes a byte-aligned `u8`.
    pub fn write_u8_aligned(&mut self, value: u8) -> BitResult<()> {
        self.ensure_aligned()?;
        self.bytes.push(value);
        Ok(())
    }

    /// Writes a byte-aligned `u16` (little-endian).
    pub fn write_u16_aligned(&mut self, value: u16) -> BitResult<()> {
        self.ensure_aligned()?;
        self.bytes.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes a byte-aligned `u32` (little-endian).
    pub fn write_u32_aligned(&mut self, value: u32) -> BitResult<()> {
        self.ensure_aligned()?;
        self.bytes.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes a byte-aligned LEB128 varint.
    pub fn write_varu32(&mut self, mut value: u32) -> BitResult<()> {
        self.ensure_aligned()?;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.bytes.push(byte);
                return Ok(());
            }
            self.bytes.push(byte | 0x80);
        }
    }

    /// Writes a byte-aligned zigzag varint.
    pub fn write_vars32(&mut self, value: i32) -> BitResult<()> {
        let zigzag = ((value << 1) ^ (value >> 31)) as u32;
        self.write_varu32(zigzag)
    }

    /// Pads the final byte and returns the buffer.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.bytes
    }

    fn flush_acc(&mut self) {
        self.bytes.push((self.acc & 0xFF) as u8);
        self.acc = 0;
        self.acc_bits = 0;
    }

    fn ensure_aligned(&self) -> BitResult<()> {
        if self.acc_bits != 0 {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bits_written(),
            });
        }
        Ok(())
    }
}

/// Encoded length of a varint in bytes.
#[must_use]
pub const fn varu32_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_writer() {
        let writer = BitVecWriter::new();
        assert_eq!(writer.bits_written(), 0);
        assert_eq!(writer.byte_len(), 0);
        assert!(writer.finish().is_empty());
    }

    #[test]
    fn single_bit_is_padded() {
        let mut writer = BitVecWriter::new();
        writer.write_bit(true);
        assert_eq!(writer.byte_len(), 1);
        assert_eq!(writer.finish(), vec![0b1000_0000]);
    }

    #[test]
    fn bits_across_byte_boundary() {
        let mut writer = BitVecWriter::new();
        writer.write_bits(0b01, 2).unwrap();
        writer.write_bits(0b1010_1010_1010, 12).unwrap();
        // 01 + 101010101010 + 00 padding
        assert_eq!(writer.finish(), vec![0b0110_1010, 0b1010_1000]);
    }

    #[test]
    fn rejects_out_of_range_value() {
        let mut writer = BitVecWriter::new();
        let err = writer.write_bits(0x80, 7).unwrap_err();
        assert_eq!(err, BitError::ValueOutOfRange { value: 0x80, bits: 7 });
    }

    #[test]
    fn rejects_wide_bit_count() {
        let mut writer = BitVecWriter::new();
        assert!(matches!(
            writer.write_bits(0, 33),
            Err(BitError::InvalidBitCount { bits: 33, .. })
        ));
    }

    #[test]
    fn aligned_write_requires_alignment() {
        let mut writer = BitVecWriter::new();
        writer.write_bit(true);
        assert!(matches!(
            writer.write_u8_aligned(1),
            Err(BitError::MisalignedAccess { bit_position: 1 })
        ));
        writer.align_to_byte();
        writer.write_u16_aligned(0xBEEF).unwrap();
        assert_eq!(writer.finish(), vec![0x80, 0xEF, 0xBE]);
    }

    #[test]
    fn varint_lengths_match_output() {
        for value in [0, 127, 128, 16_383, 16_384, u32::MAX] {
            let mut writer = BitVecWriter::new();
            writer.write_varu32(value).unwrap();
            assert_eq!(writer.byte_len(), varu32_len(value), "value {value}");
        }
    }

    #[test]
    fn zigzag_small_negative_is_one_byte() {
        let mut writer = BitVecWriter::new();
        writer.write_vars32(-1).unwrap();
        assert_eq!(writer.finish(), vec![0x01]);
    }
}
