//! Synchronization Order Tests
//!
//! The binding hooks must run before the host's session layer so that
//! listeners still see a usable session.

use crate::common::*;
use txbind::{
    ThreadResources, TransactionHost, TransactionSynchronization, SESSION_SYNCHRONIZATION_ORDER,
};

/// Stand-in for the host's session layer
struct SessionLayer {
    order: i32,
    log: EventLog,
}

impl TransactionSynchronization for SessionLayer {
    fn order(&self) -> i32 {
        self.order
    }

    fn suspend(&self, _resources: &dyn ThreadResources) {}

    fn resume(&self, _resources: &dyn ThreadResources) {}

    fn before_commit(&self, _read_only: bool, _resources: &dyn ThreadResources) -> Result<()> {
        self.log.lock().push("session:before_commit".to_string());
        Ok(())
    }

    fn before_completion(&self, _resources: &dyn ThreadResources) -> Result<()> {
        self.log.lock().push("session:before_completion".to_string());
        Ok(())
    }

    fn after_completion(&self, _status: CompletionStatus, _resources: &dyn ThreadResources) {
        self.log.lock().push("session:after_completion".to_string());
    }
}

fn run_with_session(test_host: &TestHost, log: &EventLog) {
    test_host
        .in_txn(|binding| {
            // registered first so only the order decides who runs first
            test_host.host.register_synchronization(Arc::new(SessionLayer {
                order: SESSION_SYNCHRONIZATION_ORDER,
                log: log.clone(),
            }))?;
            binding.bind_listener(Recorder::new("app", log))?;
            Ok(())
        })
        .unwrap();
}

#[test]
fn listeners_run_before_session_layer() {
    let test_host = TestHost::new();
    let log = event_log();

    run_with_session(&test_host, &log);

    assert_eq!(
        events(&log),
        vec![
            "app:before_commit",
            "session:before_commit",
            "app:before_completion",
            "session:before_completion",
            "app:after_commit",
            "session:after_completion",
        ]
    );
}

#[test]
fn configured_order_is_honored() {
    let config = BindingConfig::new().session_order(2000).order_offset(500);
    let test_host = TestHost::with_config(config);
    let log = event_log();

    run_with_session(&test_host, &log);

    assert_eq!(fired(&log, "before_commit"), vec!["session", "app"]);
}

#[test]
fn config_from_toml_drives_the_binding() {
    let config = BindingConfig::from_toml_str(
        r#"
        session_order = 1000
        order_offset = 1
        catch_listener_panics = true
        "#,
    )
    .unwrap();
    assert_eq!(config.synchronization_order(), 999);

    let test_host = TestHost::with_config(config);
    let log = event_log();
    run_with_session(&test_host, &log);
    assert_eq!(fired(&log, "before_commit"), vec!["app", "session"]);
}

#[test]
fn invalid_config_is_rejected() {
    let host = Arc::new(LocalTransactionManager::new());
    let err =
        TransactionBinding::with_config(host, BindingConfig::new().order_offset(0)).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}
