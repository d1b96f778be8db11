use bitstream::{BitReader, BitVecWriter};
use proptest::prelude::*;

/// One packed record: a narrow tag, a mask, then aligned payload values.
#[derive(Clone, Debug)]
struct Record {
    tag: u32,
    mask_bits: u8,
    mask: u32,
    index: u32,
    values: Vec<i32>,
    flags: u16,
}

fn record_strategy() -> impl Strategy<Value = Record> {
    (1u8..=16, any::<u32>(), any::<u32>(), any::<u16>())
        .prop_flat_map(|(mask_bits, mask, index, flags)| {
            (
                0u32..4,
                Just(mask_bits),
                Just(mask & ((1u32 << mask_bits) - 1)),
                Just(index),
                prop::collection::vec(any::<i32>(), 0..8),
                Just(flags),
            )
        })
        .prop_map(|(tag, mask_bits, mask, index, values, flags)| Record {
            tag,
            mask_bits,
            mask,
            index,
            values,
            flags,
        })
}

proptest! {
    #[test]
    fn records_survive_packing(records in prop::collection::vec(record_strategy(), 1..32)) {
        let mut writer = BitVecWriter::new();
        for record in &records {
            writer.write_bits(record.tag, 2).unwrap();
            writer.write_bits(record.mask, record.mask_bits).unwrap();
            writer.align_to_byte();
            writer.write_varu32(record.index).unwrap();
            for value in &record.values {
                writer.write_vars32(*value).unwrap();
            }
            writer.write_u16_aligned(record.flags).unwrap();
        }
        let expected_len = writer.byte_len();
        let bytes = writer.finish();
        prop_assert_eq!(bytes.len(), expected_len);

        let mut reader = BitReader::new(&bytes);
        for record in &records {
            prop_assert_eq!(reader.read_bits(2).unwrap(), record.tag);
            prop_assert_eq!(reader.read_bits(record.mask_bits).unwrap(), record.mask);
            reader.align_to_byte().unwrap();
            prop_assert_eq!(reader.read_varu32().unwrap(), record.index);
            for value in &record.values {
                prop_assert_eq!(reader.read_vars32().unwrap(), *value);
            }
            prop_assert_eq!(reader.read_u16_aligned().unwrap(), record.flags);
        }
        prop_assert!(reader.is_empty());
    }

    #[test]
    fn reader_never_panics(data in prop::collection::vec(any::<u8>(), 0..64), widths in prop::collection::vec(0u8..=40, 0..32)) {
        let mut reader = BitReader::new(&data);
        for width in widths {
            let _ = reader.read_bits(width);
            let _ = reader.align_to_byte();
            let _ = reader.read_varu32();
        }
    }
}
