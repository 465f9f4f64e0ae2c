//! Thread Isolation Tests
//!
//! One host and one binding shared by many threads; every thread must see
//! only its own transaction.

use crate::common::*;
use std::sync::Barrier;
use std::thread;

const OWNER: ResourceKey<usize> = ResourceKey::new("owner");

#[test]
fn threads_see_only_their_own_resources() {
    let test_host = TestHost::new();
    let threads = 8;
    let barrier = Barrier::new(threads);

    let ids: Vec<TxnId> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|n| {
                let test_host = &test_host;
                let barrier = &barrier;
                scope.spawn(move || {
                    test_host
                        .in_txn(|binding| {
                            binding.bind_resource(&OWNER, n)?;
                            barrier.wait();
                            assert_eq!(binding.get_resource(&OWNER)?.as_deref(), Some(&n));
                            barrier.wait();
                            Ok(binding.transaction_id().unwrap())
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut distinct = ids.clone();
    distinct.sort_by_key(|id| *id.as_bytes());
    distinct.dedup();
    assert_eq!(distinct.len(), threads);
    assert_eq!(test_host.host.metrics().committed, threads as u64);
}

#[test]
fn transaction_on_one_thread_is_invisible_to_another() {
    let test_host = TestHost::new();
    let host = &test_host.host;

    let status = host.begin(&TransactionDefinition::required()).unwrap();
    assert!(test_host.binding.transaction_id().is_some());

    thread::scope(|scope| {
        scope
            .spawn(|| {
                assert_eq!(test_host.binding.transaction_id(), None);
                assert_eq!(test_host.binding.read_state(), TxnReadState::None);
                assert!(test_host.binding.current_context().is_err());
            })
            .join()
            .unwrap();
    });

    host.commit(&status).unwrap();
}

#[test]
fn listeners_fire_on_their_own_thread() {
    let test_host = TestHost::new();
    let log = event_log();

    thread::scope(|scope| {
        for name in ["left", "right"] {
            let test_host = &test_host;
            let log = &log;
            scope.spawn(move || {
                test_host
                    .in_txn(|binding| binding.bind_listener(Recorder::new(name, log)).map(|_| ()))
                    .unwrap();
            });
        }
    });

    let mut committed = fired(&log, "after_commit");
    committed.sort();
    assert_eq!(committed, vec!["left", "right"]);
}
