//! Shared fixtures for the integration suite

#![allow(dead_code)]

use parking_lot::Mutex;
pub use txbind::prelude::*;

/// Install a test-writer subscriber once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// =============================================================================
// HOST FIXTURE
// =============================================================================

/// Reference host plus a binding over it
pub struct TestHost {
    pub host: Arc<LocalTransactionManager>,
    pub binding: TransactionBinding<LocalTransactionManager>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_config(BindingConfig::default())
    }

    pub fn with_config(config: BindingConfig) -> Self {
        init_tracing();
        let host = Arc::new(LocalTransactionManager::new());
        let binding = TransactionBinding::with_config(host.clone(), config)
            .expect("test config must be valid");
        Self { host, binding }
    }

    /// Run `work` in a `Required` transaction
    pub fn in_txn<R>(
        &self,
        work: impl FnOnce(&TransactionBinding<LocalTransactionManager>) -> Result<R>,
    ) -> Result<R> {
        self.host
            .execute(&TransactionDefinition::required(), |_| work(&self.binding))
    }

    /// Run `work` in a read-only `Required` transaction
    pub fn in_read_only_txn<R>(
        &self,
        work: impl FnOnce(&TransactionBinding<LocalTransactionManager>) -> Result<R>,
    ) -> Result<R> {
        self.host.execute(&TransactionDefinition::required().read_only(), |_| {
            work(&self.binding)
        })
    }
}

/// Assert the calling thread has no transaction or bound context left
pub fn assert_torn_down(test_host: &TestHost) {
    assert_eq!(test_host.host.depth(), 0);
    assert_eq!(test_host.binding.read_state(), TxnReadState::None);
    assert_eq!(test_host.binding.transaction_id(), None);
}

// =============================================================================
// RECORDING LISTENERS
// =============================================================================

/// Ordered record of "<listener>:<hook>" entries
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().clone()
}

/// Events recorded for one hook, listener names only
pub fn fired(log: &EventLog, hook: &str) -> Vec<String> {
    log.lock()
        .iter()
        .filter_map(|event| {
            let (name, fired_hook) = event.split_once(':')?;
            (fired_hook == hook).then(|| name.to_string())
        })
        .collect()
}

/// Listener that records every callback
pub struct Recorder {
    name: &'static str,
    log: EventLog,
}

impl Recorder {
    pub fn new(name: &'static str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
        })
    }

    fn record(&self, hook: &str) {
        self.log.lock().push(format!("{}:{}", self.name, hook));
    }
}

impl TransactionListener for Recorder {
    fn before_commit(&self, _read_only: bool) -> ListenerResult {
        self.record("before_commit");
        Ok(())
    }

    fn before_completion(&self) -> ListenerResult {
        self.record("before_completion");
        Ok(())
    }

    fn after_commit(&self) -> ListenerResult {
        self.record("after_commit");
        Ok(())
    }

    fn after_rollback(&self) -> ListenerResult {
        self.record("after_rollback");
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Which callback a [`Failing`] listener fails in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    BeforeCommit,
    BeforeCommitPanic,
    AfterCommit,
    AfterCommitPanic,
}

/// Listener that records callbacks and fails in one of them
pub struct Failing {
    inner: Arc<Recorder>,
    at: FailAt,
}

impl Failing {
    pub fn new(name: &'static str, at: FailAt, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            inner: Recorder::new(name, log),
            at,
        })
    }
}

impl TransactionListener for Failing {
    fn before_commit(&self, read_only: bool) -> ListenerResult {
        self.inner.before_commit(read_only)?;
        match self.at {
            FailAt::BeforeCommit => Err(ListenerError::new("refusing to commit")),
            FailAt::BeforeCommitPanic => panic!("listener panicked before commit"),
            _ => Ok(()),
        }
    }

    fn before_completion(&self) -> ListenerResult {
        self.inner.before_completion()
    }

    fn after_commit(&self) -> ListenerResult {
        self.inner.after_commit()?;
        match self.at {
            FailAt::AfterCommit => Err(ListenerError::new("cache flush failed")),
            FailAt::AfterCommitPanic => panic!("listener panicked after commit"),
            FailAt::BeforeCommit | FailAt::BeforeCommitPanic => Ok(()),
        }
    }

    fn after_rollback(&self) -> ListenerResult {
        self.inner.after_rollback()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
