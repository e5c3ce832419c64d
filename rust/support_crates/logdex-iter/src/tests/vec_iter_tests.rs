use crate::{OrderedIter, SortedVecIter, collect};

#[test]
fn test_empty() {
    let mut iter = SortedVecIter::<u64>::new(vec![]);
    assert!(!iter.next().unwrap());
    assert!(!iter.seek(&0).unwrap());
}

#[test]
fn test_seek_is_monotonic() {
    let mut iter = SortedVecIter::new(vec![2u64, 4, 6, 8]);
    assert!(iter.seek(&5).unwrap());
    assert_eq!(*iter.current(), 6);
    assert!(iter.seek(&1).unwrap());
    assert_eq!(*iter.current(), 6);
    assert!(iter.seek(&6).unwrap());
    assert_eq!(*iter.current(), 6);
    assert!(iter.next().unwrap());
    assert_eq!(*iter.current(), 8);
    assert!(!iter.seek(&9).unwrap());
    assert!(!iter.next().unwrap());
}

#[test]
fn test_from_unsorted() {
    let mut iter = SortedVecIter::from_unsorted(vec![5u64, 1, 3, 1, 5]);
    assert_eq!(collect(&mut iter).unwrap(), vec![1, 3, 5]);
}

#[test]
fn test_release_exhausts() {
    let mut iter = SortedVecIter::new(vec![1u64, 2]);
    assert!(iter.next().unwrap());
    iter.release();
    iter.release();
    assert!(!iter.next().unwrap());
}
