use logdex_common::ErrorKind;

use crate::{
    codec::address_value,
    pattern::{BlockRange, Pattern},
};

use super::{address, hash};

#[test]
fn test_canonical_form() {
    let pattern = Pattern::new(
        vec![vec![], vec![hash(3), hash(1), hash(3)], vec![], vec![]],
        4,
    )
    .unwrap();
    assert_eq!(pattern.positions(), &[vec![], vec![hash(1), hash(3)]]);
    assert_eq!(pattern.active_count(), 1);
    assert_eq!(pattern.min_topic_count(), 1);
    assert_eq!(
        pattern.active_positions().collect::<Vec<_>>(),
        vec![(1u8, &[hash(1), hash(3)][..])]
    );
}

#[test]
fn test_all_wildcards_rejected() {
    for positions in [vec![], vec![vec![]], vec![vec![], vec![], vec![]]] {
        let err = Pattern::new(positions, 4).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidPattern { .. }));
    }
}

#[test]
fn test_positions_beyond_topics_are_cut() {
    let mut positions = vec![vec![hash(7)]; 5];
    positions.push(vec![hash(1)]);
    let pattern = Pattern::new(positions.clone(), 4).unwrap();
    assert_eq!(pattern.positions().len(), 5);
    assert_eq!(pattern.min_topic_count(), 4);
    // One more indexable topic keeps the last position.
    assert_eq!(Pattern::new(positions, 5).unwrap().min_topic_count(), 5);

    // Only the cut positions were constrained.
    let mut positions = vec![vec![]; 5];
    positions.push(vec![hash(1)]);
    let err = Pattern::new(positions, 4).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidPattern { .. }));
}

#[test]
fn test_trailing_wildcards_beyond_topics_are_trimmed() {
    let mut positions = vec![vec![hash(1)]];
    positions.resize(10, vec![]);
    let pattern = Pattern::new(positions, 4).unwrap();
    assert_eq!(pattern.positions().len(), 1);
    assert_eq!(pattern.min_topic_count(), 0);
}

#[test]
fn test_builder() {
    let pattern = Pattern::builder()
        .address([address(1), address(2)])
        .topic(1, [hash(9)])
        .build(4)
        .unwrap();
    assert_eq!(
        pattern.positions(),
        &[
            vec![address_value(&address(1)), address_value(&address(2))],
            vec![],
            vec![hash(9)],
        ]
    );
    assert_eq!(pattern.min_topic_count(), 2);

    let raw = Pattern::builder().topic(0, [hash(5)]).into_positions();
    assert_eq!(raw, vec![vec![], vec![hash(5)]]);
}

#[test]
fn test_block_range() {
    let range = BlockRange::between(5, 10);
    assert!(!range.is_empty());
    assert!(range.contains(5) && range.contains(10));
    assert!(!range.contains(4) && !range.contains(11));
    assert!(range.ends_before(11));

    assert!(BlockRange::between(11, 10).is_empty());
    assert!(!BlockRange::between(0, 0).is_empty());
    assert!(BlockRange::between(0, 0).contains(0));

    let open = BlockRange::starting_at(3);
    assert!(open.contains(u64::MAX));
    assert!(!open.ends_before(u64::MAX));
    assert_eq!(BlockRange::all(), BlockRange::new(0, None));
}
