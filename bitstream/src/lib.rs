//! Bit packing primitives for the dsync delta pool.
//!
//! [`BitVecWriter`] and [`BitReader`] pack the per-delta headers (kind tag and
//! changed-field mask) at bit granularity and the field values as byte-aligned
//! integers and varints.
//!
//! # Design Principles
//!
//! - **No unsafe code**
//! - **Bounded reads** - every read is bounds-checked and returns an error on
//!   malformed input.
//! - **No domain knowledge** - this crate knows nothing about sectors or sets.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitReader, BitVecWriter};
//!
//! let mut writer = BitVecWriter::new();
//! writer.write_bits(0b10, 2).unwrap();
//! writer.write_bits(0x0FFF, 12).unwrap();
//! writer.align_to_byte();
//! writer.write_varu32(300).unwrap();
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_bits(2).unwrap(), 0b10);
//! assert_eq!(reader.read_bits(12).unwrap(), 0x0FFF);
//! reader.align_to_byte().unwrap();
//! assert_eq!(reader.read_varu32().unwrap(), 300);
//! ```

mod error;
mod reader;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use writer::{varu32_len, BitVecWriter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_roundtrip() {
        let bytes = BitVecWriter::new().finish();
        assert!(bytes.is_empty());
        assert!(BitReader::new(&bytes).is_empty());
    }

    #[test]
    fn header_then_values_roundtrip() {
        let mut writer = BitVecWriter::new();
        writer.write_bits(1, 2).unwrap();
        writer.write_bits(0b101_0101, 7).unwrap();
        writer.align_to_byte();
        writer.write_varu32(4000).unwrap();
        writer.write_vars32(-65_536).unwrap();
        writer.write_u16_aligned(0x0421).unwrap();
        writer.write_u32_aligned(0x4000_0000).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(2).unwrap(), 1);
        assert_eq!(reader.read_bits(7).unwrap(), 0b101_0101);
        reader.align_to_byte().unwrap();
        assert_eq!(reader.read_varu32().unwrap(), 4000);
        assert_eq!(reader.read_vars32().unwrap(), -65_536);
        assert_eq!(reader.read_u16_aligned().unwrap(), 0x0421);
        assert_eq!(reader.read_u32_aligned().unwrap(), 0x4000_0000);
        assert!(reader.is_empty());
    }
}
