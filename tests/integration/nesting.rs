//! Nested Transaction Tests
//!
//! `RequiresNew` suspends the outer transaction; its context, listeners
//! and resources must be invisible inside and intact afterwards.

use crate::common::*;

const NOTE: ResourceKey<&'static str> = ResourceKey::new("note");

#[test]
fn inner_transaction_gets_its_own_context() {
    let test_host = TestHost::new();
    let host = &test_host.host;
    let binding = &test_host.binding;

    let outer = host.begin(&TransactionDefinition::required()).unwrap();
    let outer_id = binding.transaction_id().unwrap();
    let outer_start = binding.transaction_start_time().unwrap();
    binding.bind_resource(&NOTE, "outer").unwrap();

    let inner = host.begin(&TransactionDefinition::requires_new()).unwrap();
    assert_eq!(host.depth(), 2);
    let inner_id = binding.transaction_id().unwrap();
    assert_ne!(inner_id, outer_id);
    let inner_start = binding.transaction_start_time().unwrap();
    assert!(inner_start >= outer_start);
    assert!(binding.get_resource(&NOTE).unwrap().is_none());
    binding.bind_resource(&NOTE, "inner").unwrap();
    host.commit(&inner).unwrap();

    assert_eq!(binding.transaction_id(), Some(outer_id));
    assert_eq!(binding.transaction_start_time(), Some(outer_start));
    assert_eq!(binding.get_resource(&NOTE).unwrap().as_deref(), Some(&"outer"));

    host.commit(&outer).unwrap();
    assert_eq!(binding.transaction_id(), None);
    assert_eq!(host.depth(), 0);
}

#[test]
fn inner_listeners_complete_with_inner_transaction() {
    let test_host = TestHost::new();
    let host = &test_host.host;
    let binding = &test_host.binding;
    let log = event_log();

    let outer = host.begin(&TransactionDefinition::required()).unwrap();
    binding.bind_listener(Recorder::new("outer", &log)).unwrap();

    let inner = host.begin(&TransactionDefinition::requires_new()).unwrap();
    binding.bind_listener(Recorder::new("inner", &log)).unwrap();
    host.rollback(&inner).unwrap();

    assert_eq!(events(&log), vec!["inner:before_completion", "inner:after_rollback"]);

    host.commit(&outer).unwrap();
    assert_eq!(fired(&log, "after_commit"), vec!["outer"]);
}

#[test]
fn inner_transaction_without_binding_use_leaves_outer_untouched() {
    let test_host = TestHost::new();
    let host = &test_host.host;
    let binding = &test_host.binding;

    let outer = host.begin(&TransactionDefinition::required()).unwrap();
    let outer_id = binding.transaction_id().unwrap();

    let inner = host.begin(&TransactionDefinition::requires_new()).unwrap();
    host.commit(&inner).unwrap();

    assert_eq!(binding.transaction_id(), Some(outer_id));
    host.commit(&outer).unwrap();
}

#[test]
fn required_joins_the_outer_context() {
    let test_host = TestHost::new();
    let host = &test_host.host;
    let binding = &test_host.binding;
    let log = event_log();

    let outer = host.begin(&TransactionDefinition::required()).unwrap();
    let outer_id = binding.transaction_id().unwrap();

    let joined = host.begin(&TransactionDefinition::required()).unwrap();
    assert!(!joined.is_new_transaction());
    assert_eq!(binding.transaction_id(), Some(outer_id));
    binding.bind_listener(Recorder::new("joined", &log)).unwrap();
    host.commit(&joined).unwrap();
    assert!(events(&log).is_empty());

    host.commit(&outer).unwrap();
    assert_eq!(fired(&log, "after_commit"), vec!["joined"]);
}

#[test]
fn two_levels_of_nesting_restore_in_order() {
    let test_host = TestHost::new();
    let host = &test_host.host;
    let binding = &test_host.binding;

    let first = host.begin(&TransactionDefinition::required()).unwrap();
    let first_id = binding.transaction_id().unwrap();
    let second = host.begin(&TransactionDefinition::requires_new()).unwrap();
    let second_id = binding.transaction_id().unwrap();
    let third = host.begin(&TransactionDefinition::requires_new()).unwrap();
    let third_id = binding.transaction_id().unwrap();

    assert_ne!(first_id, second_id);
    assert_ne!(second_id, third_id);

    host.commit(&third).unwrap();
    assert_eq!(binding.transaction_id(), Some(second_id));
    host.rollback(&second).unwrap();
    assert_eq!(binding.transaction_id(), Some(first_id));
    host.commit(&first).unwrap();
    assert_eq!(binding.transaction_id(), None);
}

#[test]
fn completing_out_of_order_is_rejected() {
    let test_host = TestHost::new();
    let host = &test_host.host;

    let outer = host.begin(&TransactionDefinition::required()).unwrap();
    let inner = host.begin(&TransactionDefinition::requires_new()).unwrap();

    assert!(matches!(host.commit(&outer), Err(Error::Host(_))));

    host.commit(&inner).unwrap();
    host.commit(&outer).unwrap();
}
