use std::sync::Arc;

use logdex_common::ErrorKind;
use logdex_iter::{OrderedIter, collect};

use crate::{
    codec::{LogId, address_value},
    config::IndexConfig,
    kv::{KeyValueStore, MemoryStore},
    store::{LogRec, TopicIndexStore},
};

use super::{address, hash, log_record};

fn store() -> (TopicIndexStore, MemoryStore) {
    let kv = MemoryStore::with_refill_size(4);
    let store = TopicIndexStore::new(Arc::new(kv.clone()), &IndexConfig::default()).unwrap();
    (store, kv)
}

#[test]
fn test_push_and_resolve() {
    let (store, kv) = store();
    let log = log_record(10, 2, 7, &[1, 2, 3]);
    store.push(std::slice::from_ref(&log)).unwrap();
    // Address, three topics and the record itself.
    assert_eq!(kv.len(), 5);
    assert_eq!(store.resolve(&log.id()).unwrap(), log);
}

#[test]
fn test_push_is_idempotent() {
    let (store, kv) = store();
    let logs = (0..20)
        .map(|i| log_record(i, 0, (i % 3) as u8, &[i % 2]))
        .collect::<Vec<_>>();
    store.push(&logs).unwrap();
    let len = kv.len();
    store.push(&logs).unwrap();
    store.push(&logs[5..10]).unwrap();
    assert_eq!(kv.len(), len);

    let mut scan = store.scan(&hash(1), 1, 0, 0).unwrap();
    let found = collect(&mut scan).unwrap();
    assert_eq!(found.len(), 10);
    assert!(found.windows(2).all(|w| w[0].id < w[1].id));
}

#[test]
fn test_push_rejects_too_many_topics() {
    let (store, kv) = store();
    let logs = vec![log_record(1, 0, 1, &[1]), log_record(2, 0, 1, &[1, 2, 3, 4, 5])];
    let err = store.push(&logs).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    assert!(kv.is_empty());
}

#[test]
fn test_resolve_missing() {
    let (store, _) = store();
    let err = store.resolve(&LogId::block_start(1)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
}

#[test]
fn test_scan_from_block_and_seek() {
    let (store, _) = store();
    let logs = (0..50)
        .map(|block| log_record(block, 0, 1, &[]))
        .collect::<Vec<_>>();
    store.push(&logs).unwrap();

    let value = address_value(&address(1));
    let mut scan = store.scan(&value, 0, 20, 0).unwrap();
    assert!(scan.next().unwrap());
    assert_eq!(scan.current().id.block_number(), 20);
    assert_eq!(scan.current().topic_count, 0);

    assert!(scan.seek(&LogRec::seek_target(LogId::block_start(33))).unwrap());
    assert_eq!(scan.current().id, logs[33].id());
    assert!(scan.seek(&LogRec::seek_target(LogId::block_start(5))).unwrap());
    assert_eq!(scan.current().id.block_number(), 33);
    assert!(!scan.seek(&LogRec::seek_target(LogId::block_start(50))).unwrap());
    scan.release();
    scan.release();
}

#[test]
fn test_scan_skips_short_records() {
    let (store, _) = store();
    let logs = (0..30)
        .map(|block| {
            let topics = if block % 3 == 0 { vec![7, 1, 2] } else { vec![7] };
            log_record(block, 0, 1, &topics)
        })
        .collect::<Vec<_>>();
    store.push(&logs).unwrap();

    let mut scan = store.scan(&hash(7), 1, 0, 3).unwrap();
    let blocks = collect(&mut scan)
        .unwrap()
        .into_iter()
        .map(|rec| rec.id.block_number())
        .collect::<Vec<_>>();
    assert_eq!(blocks, (0..30).step_by(3).collect::<Vec<_>>());

    let mut scan = store.scan(&hash(7), 1, 0, 3).unwrap();
    assert!(scan.seek(&LogRec::seek_target(LogId::block_start(4))).unwrap());
    assert_eq!(scan.current().id.block_number(), 6);
}

#[test]
fn test_scan_positions_are_separate() {
    let (store, _) = store();
    store
        .push(&[log_record(1, 0, 1, &[5, 6]), log_record(2, 0, 1, &[6, 5])])
        .unwrap();
    let mut first = store.scan(&hash(5), 1, 0, 0).unwrap();
    let found = collect(&mut first).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.block_number(), 1);
    assert_eq!(found[0].topic_count, 2);
}

#[test]
fn test_max_topics_bound() {
    let config = IndexConfig::default().with_max_topics(300);
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    assert!(TopicIndexStore::new(kv, &config).is_err());
}
