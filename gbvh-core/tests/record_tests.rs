use gbvh_core::record::{decode_records, encode_records, index_to_offset, offset_to_index};
use gbvh_core::{Aabb, GbvhError, NULL_OFFSET, NodeDescriptor, RECORD_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_link(rng: &mut StdRng) -> Option<u32> {
    rng.random_bool(0.7).then(|| rng.random_range(0..1_000_000))
}

fn random_descriptor(rng: &mut StdRng) -> NodeDescriptor {
    let min: [f32; 3] = [rng.random(), rng.random(), rng.random()];
    NodeDescriptor {
        bounds: Aabb::new(min, [min[0] * 2.0, min[1] + 1.0, -min[2]]),
        parent: random_link(rng),
        left: random_link(rng),
        right: random_link(rng),
        payload: rng.random_bool(0.5).then(|| rng.random()),
    }
}

#[test]
fn test_random_descriptors_survive_encoding() {
    let mut rng = StdRng::seed_from_u64(0x6276_6800);
    let records: Vec<NodeDescriptor> = (0..2_000).map(|_| random_descriptor(&mut rng)).collect();

    let bytes = encode_records(&records);
    assert_eq!(bytes.len(), records.len() * RECORD_SIZE);
    assert_eq!(decode_records(&bytes).unwrap(), records);
}

#[test]
fn test_all_ones_is_always_none() {
    let mut bytes = NodeDescriptor::default().encode();
    for field in [0x20, 0x28, 0x30] {
        assert_eq!(&bytes[field..field + 8], &[0xFF; 8]);
    }
    bytes[0x20..0x28].copy_from_slice(&NULL_OFFSET.to_le_bytes());
    let desc = NodeDescriptor::decode(&bytes, 0).unwrap();
    assert_eq!((desc.parent, desc.left, desc.right), (None, None, None));
}

#[test]
fn test_offset_index_conversion() {
    for index in [0u32, 1, 2, 1_000, u32::MAX] {
        let offset = index_to_offset(Some(index));
        assert_eq!(offset, u64::from(index) * 64);
        assert_eq!(offset_to_index(offset, 0).unwrap(), Some(index));
    }
    assert_eq!(index_to_offset(None), NULL_OFFSET);
}

#[test]
fn test_index_beyond_u32_rejected() {
    let offset = (u64::from(u32::MAX) + 1) * 64;
    let err = offset_to_index(offset, 3).unwrap_err();
    assert!(matches!(err, GbvhError::OffsetTooLarge { record: 3, offset: o } if o == offset));
    assert!(!err.to_string().contains("0 records"));
}
