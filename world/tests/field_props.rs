use proptest::prelude::*;
use world::{ElementKind, FieldMask, Fixed, SectorField, SectorState, TextureId};

fn sector_strategy() -> impl Strategy<Value = SectorState> {
    (
        any::<i32>(),
        any::<i32>(),
        any::<u8>(),
        any::<u16>(),
        any::<[u8; 3]>(),
        any::<i32>(),
        any::<[i32; 2]>(),
    )
        .prop_map(|(floor, ceiling, light, tex, color, speed, offset)| SectorState {
            floor_height: Fixed(floor),
            ceiling_height: Fixed(ceiling),
            light_level: light,
            floor_texture: TextureId(tex),
            ceiling_texture: TextureId(tex.wrapping_add(1)),
            color,
            floor_target: Fixed(floor),
            floor_speed: Fixed(speed),
            ceiling_target: Fixed(ceiling),
            ceiling_speed: Fixed(speed),
            floor_offset: [Fixed(offset[0]), Fixed(offset[1])],
            ceiling_offset: [Fixed(offset[1]), Fixed(offset[0])],
        })
}

proptest! {
    #[test]
    fn copying_changed_fields_closes_the_gap(a in sector_strategy(), b in sector_strategy()) {
        let mut changed = FieldMask::EMPTY;
        for field in SectorField::ALL {
            if a.distance(&b, field) != 0 {
                changed.insert(field.index());
            }
        }
        prop_assert!(changed.fits(ElementKind::Sector));

        let mut patched = b;
        patched.copy_fields(&a, changed);
        prop_assert_eq!(patched, a);
    }

    #[test]
    fn copy_is_idempotent(a in sector_strategy(), b in sector_strategy(), bits in 0u16..0x1000) {
        let mask = FieldMask::from_bits(bits);
        let mut once = b;
        once.copy_fields(&a, mask);
        let mut twice = once;
        twice.copy_fields(&a, mask);
        prop_assert_eq!(once, twice);
    }
}
