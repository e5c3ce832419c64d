use crate::{codec::LogId, engine::barrier::MatchBarrier};

use super::hash;

fn id(block: u64, n: u64) -> LogId {
    LogId::new(block, hash(n), 0, 0)
}

#[test]
fn test_completes_after_every_position() {
    let barrier = MatchBarrier::new(3, 3);
    assert!(!barrier.hit(0, id(1, 1)));
    assert!(!barrier.hit(1, id(1, 1)));
    assert!(barrier.hit(2, id(1, 1)));
    assert_eq!(barrier.pending(), 0);
}

#[test]
fn test_single_position_completes_immediately() {
    let barrier = MatchBarrier::new(1, 2);
    assert!(barrier.hit(0, id(4, 1)));
    assert!(barrier.hit(1, id(4, 2)));
    assert_eq!(barrier.pending(), 0);
}

#[test]
fn test_evicts_blocks_every_worker_has_passed() {
    let barrier = MatchBarrier::new(2, 2);
    assert!(!barrier.hit(0, id(1, 1)));
    assert!(!barrier.hit(0, id(5, 2)));
    assert_eq!(barrier.pending(), 2);
    // Worker 1 moves to block 3: block 1 can no longer complete.
    assert!(!barrier.hit(1, id(3, 3)));
    assert_eq!(barrier.pending(), 2);
    // Both workers reached block 5, which drops the count of block 3.
    assert!(barrier.hit(1, id(5, 2)));
    assert_eq!(barrier.pending(), 0);
}

#[test]
fn test_finished_workers_release_counts() {
    let barrier = MatchBarrier::new(2, 2);
    assert!(!barrier.hit(0, id(7, 1)));
    assert!(!barrier.hit(0, id(8, 2)));
    barrier.finish(1);
    // Worker 1 will never report again, but worker 0 might still be in
    // block 8.
    assert_eq!(barrier.pending(), 1);
    barrier.finish(0);
    assert_eq!(barrier.pending(), 0);
}
