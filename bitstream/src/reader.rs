//! Bit-level reader with bounded operations.

use crate::error::{BitError, BitResult};

/// A bit-level reader over a borrowed byte slice.
///
/// All reads are bounds-checked; malformed input produces an error, never a
/// panic.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a reader positioned at the first bit of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Returns the number of bits remaining.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.data
            .len()
            .saturating_mul(8)
            .saturating_sub(self.bit_pos)
    }

    /// Returns `true` if every bit has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Current bit position.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Reads one bit.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        let byte = self.data[self.bit_pos / 8];
        let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads `bits` bits (at most 32), most significant first.
    pub fn read_bits(&mut self, bits: u8) -> BitResult<u32> {
        if bits > 32 {
            return Err(BitError::InvalidBitCount { bits, max_bits: 32 });
        }
        self.ensure_bits(usize::from(bits))?;
        let mut value = 0u32;
        let mut remaining = bits;
        while remaining > 0 {
            let offset = (self.bit_pos % 8) as u8;
            let available = 8 - offset;
            let take = available.min(remaining);
            let byte = u32::from(self.data[self.bit_pos / 8]);
            let chunk = (byte >> (available - take)) & ((1u32 << take) - 1);
            value = (value << take) | chunk;
            self.bit_pos += usize::from(take);
            remaining -= take;
        }
        Ok(value)
    }

    /// Skips to the next byte boundary.
    pub fn align_to_byte(&mut self) -> BitResult<()> {
        let rem = self.bit_pos % 8;
        if rem != 0 {
            let skip = 8 - rem;
            self.ensure_bits(skip)?;
            self.bit_pos += skip;
        }
        Ok(())
    }

    /// Reads a byte-aligned `u8`.
    pub fn read_u8_aligned(&mut self) -> BitResult<u8> {
        let [byte] = self.read_aligned_bytes::<1>()?;
        Ok(byte)
    }

    /// Reads a byte-aligned `u16` (little-endian).
    pub fn read_u16_aligned(&mut self) -> BitResult<u16> {
        Ok(u16::from_le_bytes(self.read_aligned_bytes::<2>()?))
    }

    /// Reads a byte-aligned `u32` (little-endian).
    pub fn read_u32_aligned(&mut self) -> BitResult<u32> {
        Ok(u32::from_le_bytes(self.read_aligned_bytes::<4>()?))
    }

    /// Reads a byte-aligned LEB128 varint.
    pub fn read_varu32(&mut self) -> BitResult<u32> {
        let mut result = 0u32;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8_aligned()?;
            let bits = u32::from(byte & 0x7F);
            if shift == 28 && bits > 0x0F {
                return Err(BitError::InvalidVarint);
            }
            result |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(BitError::InvalidVarint)
    }

    /// Reads a byte-aligned zigzag varint.
    pub fn read_vars32(&mut self) -> BitResult<i32> {
        let raw = self.read_varu32()?;
        Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available,
            });
        }
        Ok(())
    }

    fn read_aligned_bytes<const N: usize>(&mut self) -> BitResult<[u8; N]> {
        if self.bit_pos % 8 != 0 {
            return Err(BitError::MisalignedAccess {
                bit_position: self.bit_pos,
            });
        }
        self.ensure_bits(N * 8)?;
        let start = self.bit_pos / 8;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[start..start + N]);
        self.bit_pos += N * 8;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reader() {
        let mut reader = BitReader::new(&[]);
        assert!(reader.is_empty());
        assert!(matches!(
            reader.read_bit(),
            Err(BitError::UnexpectedEof {
                requested: 1,
                available: 0
            })
        ));
    }

    #[test]
    fn read_bits_across_bytes() {
        let mut reader = BitReader::new(&[0b0110_1010, 0b1010_1000]);
        assert_eq!(reader.read_bits(2).unwrap(), 0b01);
        assert_eq!(reader.read_bits(12).unwrap(), 0b1010_1010_1010);
        assert_eq!(reader.bits_remaining(), 2);
    }

    #[test]
    fn read_full_word() {
        let mut reader = BitReader::new(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(reader.read_bits(32).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn misaligned_access_fails() {
        let mut reader = BitReader::new(&[0xFF, 0xFF]);
        reader.read_bit().unwrap();
        assert!(matches!(
            reader.read_u8_aligned(),
            Err(BitError::MisalignedAccess { bit_position: 1 })
        ));
    }

    #[test]
    fn varint_decodes() {
        let mut reader = BitReader::new(&[0xAC, 0x02, 0x01]);
        assert_eq!(reader.read_varu32().unwrap(), 300);
        assert_eq!(reader.read_vars32().unwrap(), -1);
    }

    #[test]
    fn overlong_varint_fails() {
        let mut reader = BitReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(reader.read_varu32().unwrap_err(), BitError::InvalidVarint);
    }

    #[test]
    fn truncated_varint_fails() {
        let mut reader = BitReader::new(&[0x80]);
        assert!(matches!(
            reader.read_varu32(),
            Err(BitError::UnexpectedEof { .. })
        ));
    }
}
