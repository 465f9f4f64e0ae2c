//! Resource Store Tests
//!
//! Bind/get/unbind through the coordinator, collection identity and
//! flags, and the boundary with "no transaction".

use crate::common::*;

const USER: ResourceKey<String> = ResourceKey::new("user");
const VISITED: ResourceKey<TxnSet<u64>> = ResourceKey::new("visited");
const AUDITED: FlagKey = ResourceKey::new("audited");

// ============================================================================
// Bind / get / unbind
// ============================================================================

#[test]
fn bound_resource_is_visible_until_commit() {
    let test_host = TestHost::new();

    test_host
        .in_txn(|binding| {
            assert!(binding.get_resource(&USER)?.is_none());
            binding.bind_resource(&USER, "alice".to_string())?;
            assert_eq!(binding.get_resource(&USER)?.as_deref().map(String::as_str), Some("alice"));

            binding.bind_resource(&USER, "bob".to_string())?;
            assert_eq!(binding.get_resource(&USER)?.as_deref().map(String::as_str), Some("bob"));

            binding.unbind_resource(&USER)?;
            assert!(binding.get_resource(&USER)?.is_none());
            binding.unbind_resource(&USER)?;
            Ok(())
        })
        .unwrap();
}

#[test]
fn resources_do_not_survive_the_transaction() {
    let test_host = TestHost::new();

    test_host
        .in_txn(|binding| binding.bind_resource(&USER, "alice".to_string()))
        .unwrap();

    let seen = test_host.in_txn(|binding| binding.get_resource(&USER)).unwrap();
    assert!(seen.is_none());
}

#[test]
fn shared_arc_is_returned_as_is() {
    let test_host = TestHost::new();
    let shared = Arc::new("shared".to_string());

    test_host
        .in_txn(|binding| {
            binding.bind_resource(&USER, shared.clone())?;
            let fetched = binding.get_resource(&USER)?.unwrap();
            assert!(Arc::ptr_eq(&fetched, &shared));
            Ok(())
        })
        .unwrap();
}

#[test]
fn reading_with_the_wrong_type_is_an_error() {
    let test_host = TestHost::new();
    let as_number: ResourceKey<u64> = ResourceKey::new("user");

    let err = test_host
        .in_txn(|binding| {
            binding.bind_resource(&USER, "alice".to_string())?;
            binding.get_resource(&as_number).map(|_| ())
        })
        .unwrap_err();

    assert!(matches!(err, Error::ResourceTypeMismatch { .. }));
}

#[test]
fn resource_operations_need_a_transaction() {
    let test_host = TestHost::new();
    let binding = &test_host.binding;

    assert!(binding.get_resource(&USER).unwrap_err().is_no_transaction());
    assert!(binding.bind_resource(&USER, "x".to_string()).unwrap_err().is_no_transaction());
    assert!(binding.unbind_resource(&USER).unwrap_err().is_no_transaction());
    assert!(binding.get_set(&VISITED).unwrap_err().is_no_transaction());
}

// ============================================================================
// Collections and flags
// ============================================================================

#[test]
fn collection_is_shared_across_callers_in_one_transaction() {
    let test_host = TestHost::new();

    fn visit(binding: &TransactionBinding<LocalTransactionManager>, id: u64) -> Result<bool> {
        Ok(binding.get_set(&VISITED)?.lock().insert(id))
    }

    test_host
        .in_txn(|binding| {
            assert!(visit(binding, 1)?);
            assert!(visit(binding, 2)?);
            assert!(!visit(binding, 1)?);
            assert_eq!(binding.get_set(&VISITED)?.lock().len(), 2);
            Ok(())
        })
        .unwrap();

    let fresh = test_host
        .in_txn(|binding| Ok(binding.get_set(&VISITED)?.lock().len()))
        .unwrap();
    assert_eq!(fresh, 0);
}

#[test]
fn flag_guards_work_once_per_transaction() {
    let test_host = TestHost::new();
    let mut runs = 0;

    for _ in 0..2 {
        test_host
            .in_txn(|binding| {
                for _ in 0..3 {
                    if binding.set_flag(&AUDITED)? {
                        runs += 1;
                    }
                }
                assert!(binding.test_flag(&AUDITED)?);
                Ok(())
            })
            .unwrap();
    }

    assert_eq!(runs, 2);
}
