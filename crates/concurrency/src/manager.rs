//! In-process transaction manager for driving the binding lifecycle
//!
//! `LocalTransactionManager` is a small host that implements the boundary
//! contracts the binding layer observes. It keeps one stack of transaction
//! frames per thread, keyed by `ThreadId`, and drives registered
//! synchronizations through the standard lifecycle.
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Sort synchronizations by order()
//! 2. before_commit(read_only)     - failure => rollback path, error returned
//! 3. before_completion()          - failure => rollback path, error returned
//! 4. after_completion(Committed)
//! 5. Pop frame, resume the suspended outer transaction (if any)
//! ```
//!
//! ## Rollback Sequence
//!
//! ```text
//! 1. before_completion()          - failures logged
//! 2. after_completion(RolledBack)
//! 3. Pop frame, resume the suspended outer transaction (if any)
//! ```
//!
//! ## Nesting
//!
//! `Propagation::RequiresNew` inside an active transaction calls
//! `suspend()` on every synchronization of the outer frame before the new
//! frame starts, and `resume()` on them once it completes. Suspend/resume
//! therefore always come in strictly nested pairs.
//!
//! ## Panics
//!
//! A panic raised by a hook (or by the work passed to `execute`) never
//! leaves a frame behind. Completion carries on with the rollback path or
//! the remaining hooks, the frame is popped, and only then is the first
//! panic resumed.
//!
//! # Thread Safety
//!
//! Per-thread state lives in a `DashMap`. No map guard is held while a
//! synchronization runs: hooks and the listeners behind them call back
//! into the manager.

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error, warn};
use txbind_core::{
    CompletionStatus, Error, Result, ThreadResource, ThreadResources, TransactionHost,
    TransactionSynchronization,
};

type Synchronizations = Vec<Arc<dyn TransactionSynchronization>>;

/// Panic payload held back until a frame has been torn down
type PanicPayload = Box<dyn Any + Send>;

/// How `begin` behaves when a transaction is already active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Join the active transaction, or start one if none exists
    #[default]
    Required,
    /// Always start a new transaction, suspending the active one
    RequiresNew,
}

/// Parameters for starting a transaction
#[derive(Debug, Clone, Default)]
pub struct TransactionDefinition {
    /// Behavior with respect to an active transaction
    pub propagation: Propagation,
    /// Whether the transaction is read-only
    pub read_only: bool,
}

impl TransactionDefinition {
    /// Join-or-create, read-write
    pub fn required() -> Self {
        Self::default()
    }

    /// Always a new transaction, read-write
    pub fn requires_new() -> Self {
        Self {
            propagation: Propagation::RequiresNew,
            ..Self::default()
        }
    }

    /// Mark the definition read-only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Handle for a transaction returned by [`LocalTransactionManager::begin`]
///
/// Must be completed on the thread that began it.
#[derive(Debug)]
pub struct TransactionStatus {
    frame_id: u64,
    new_transaction: bool,
    read_only: bool,
    rollback_only: Cell<bool>,
}

impl TransactionStatus {
    /// Did `begin` start a new transaction (rather than join one)?
    pub fn is_new_transaction(&self) -> bool {
        self.new_transaction
    }

    /// Is the transaction read-only?
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Request rollback instead of commit
    pub fn set_rollback_only(&self) {
        self.rollback_only.set(true);
    }

    /// Has rollback been requested through this handle?
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.get()
    }
}

/// Counters over completed transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostMetrics {
    /// Transactions begun (new, not joined)
    pub begun: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions rolled back
    pub rolled_back: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    Active,
    Completing,
}

struct Frame {
    id: u64,
    read_only: bool,
    rollback_only: bool,
    phase: FramePhase,
    synchronizations: Synchronizations,
}

#[derive(Default)]
struct ThreadState {
    resources: FxHashMap<String, ThreadResource>,
    frames: Vec<Frame>,
}

impl ThreadState {
    fn is_idle(&self) -> bool {
        self.frames.is_empty() && self.resources.is_empty()
    }
}

/// In-process host transaction manager
pub struct LocalTransactionManager {
    threads: DashMap<ThreadId, ThreadState>,
    next_frame_id: AtomicU64,
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl LocalTransactionManager {
    /// Create a manager with no active transactions
    pub fn new() -> Self {
        Self {
            threads: DashMap::new(),
            next_frame_id: AtomicU64::new(1),
            begun: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
        }
    }

    /// Begin (or join) a transaction on the calling thread
    pub fn begin(&self, definition: &TransactionDefinition) -> Result<TransactionStatus> {
        let thread = thread::current().id();

        let (status, to_suspend) = {
            let mut state = self.threads.entry(thread).or_default();
            if let (Propagation::Required, Some(top)) = (definition.propagation, state.frames.last())
            {
                if top.phase == FramePhase::Completing {
                    return Err(Error::Host(format!(
                        "transaction {} is completing; it cannot be joined",
                        top.id
                    )));
                }
                debug!(frame = top.id, "Participating in existing transaction");
                return Ok(TransactionStatus {
                    frame_id: top.id,
                    new_transaction: false,
                    read_only: top.read_only,
                    rollback_only: Cell::new(false),
                });
            }

            let to_suspend = state
                .frames
                .last()
                .map(|outer| sorted(&outer.synchronizations))
                .unwrap_or_default();

            let id = self.next_frame_id.fetch_add(1, Ordering::SeqCst);
            state.frames.push(Frame {
                id,
                read_only: definition.read_only,
                rollback_only: false,
                phase: FramePhase::Active,
                synchronizations: Vec::new(),
            });
            (
                TransactionStatus {
                    frame_id: id,
                    new_transaction: true,
                    read_only: definition.read_only,
                    rollback_only: Cell::new(false),
                },
                to_suspend,
            )
        };

        for synchronization in &to_suspend {
            synchronization.suspend(self);
        }
        self.begun.fetch_add(1, Ordering::Relaxed);
        debug!(
            frame = status.frame_id,
            read_only = status.read_only,
            suspended = to_suspend.len(),
            "Began transaction"
        );
        Ok(status)
    }

    /// Commit the transaction behind `status`
    ///
    /// A participating handle only propagates its rollback-only mark to the
    /// enclosing transaction.
    ///
    /// # Errors
    /// - `Host` if `status` is not the innermost transaction on this thread,
    ///   or if a participant marked the transaction rollback-only
    /// - the failure of a before-commit / before-completion hook (the
    ///   transaction has been rolled back by then)
    pub fn commit(&self, status: &TransactionStatus) -> Result<()> {
        if !status.new_transaction {
            if status.is_rollback_only() {
                self.mark_frame_rollback_only(status.frame_id);
            }
            return Ok(());
        }

        let (synchronizations, read_only, global_rollback) = self.start_completion(status)?;

        let frame_id = status.frame_id;
        if status.is_rollback_only() {
            reraise(self.finish_rollback(frame_id, &synchronizations));
            return Ok(());
        }
        if global_rollback {
            reraise(self.finish_rollback(frame_id, &synchronizations));
            return Err(Error::Host(
                "transaction rolled back because it has been marked as rollback-only".to_string(),
            ));
        }

        for synchronization in &synchronizations {
            match panic::catch_unwind(AssertUnwindSafe(|| {
                synchronization.before_commit(read_only, self)
            })) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(frame = frame_id, error = %e, "before-commit failed; rolling back");
                    reraise(self.finish_rollback(frame_id, &synchronizations));
                    return Err(e);
                }
                Err(payload) => {
                    warn!(frame = frame_id, "before-commit panicked; rolling back");
                    let _ = self.finish_rollback(frame_id, &synchronizations);
                    panic::resume_unwind(payload);
                }
            }
        }

        for synchronization in &synchronizations {
            match panic::catch_unwind(AssertUnwindSafe(|| synchronization.before_completion(self))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(frame = frame_id, error = %e, "before-completion failed; rolling back");
                    let mut panicked = None;
                    self.after_completion(
                        frame_id,
                        &synchronizations,
                        CompletionStatus::RolledBack,
                        &mut panicked,
                    );
                    reraise(panicked);
                    return Err(e);
                }
                Err(payload) => {
                    warn!(frame = frame_id, "before-completion panicked; rolling back");
                    let mut panicked = None;
                    self.after_completion(
                        frame_id,
                        &synchronizations,
                        CompletionStatus::RolledBack,
                        &mut panicked,
                    );
                    panic::resume_unwind(payload);
                }
            }
        }

        let mut panicked = None;
        self.after_completion(
            frame_id,
            &synchronizations,
            CompletionStatus::Committed,
            &mut panicked,
        );
        reraise(panicked);
        Ok(())
    }

    /// Roll back the transaction behind `status`
    ///
    /// A participating handle marks the enclosing transaction rollback-only.
    pub fn rollback(&self, status: &TransactionStatus) -> Result<()> {
        if !status.new_transaction {
            self.mark_frame_rollback_only(status.frame_id);
            return Ok(());
        }
        let (synchronizations, _, _) = self.start_completion(status)?;
        reraise(self.finish_rollback(status.frame_id, &synchronizations));
        Ok(())
    }

    /// Run `work` in a transaction: commit on `Ok`, roll back on `Err` or
    /// when the status was marked rollback-only
    ///
    /// If `work` panics the transaction is rolled back and the panic resumed.
    pub fn execute<R, E, F>(&self, definition: &TransactionDefinition, work: F) -> std::result::Result<R, E>
    where
        E: From<Error>,
        F: FnOnce(&TransactionStatus) -> std::result::Result<R, E>,
    {
        let status = self.begin(definition)?;
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| work(&status))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                if let Err(rollback_error) = self.rollback(&status) {
                    error!(error = %rollback_error, "rollback after panicked work failed");
                }
                panic::resume_unwind(payload);
            }
        };
        match outcome {
            Ok(value) => {
                if status.is_rollback_only() {
                    self.rollback(&status)?;
                } else {
                    self.commit(&status)?;
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = self.rollback(&status) {
                    error!(error = %rollback_error, "rollback after failed work also failed");
                }
                Err(e)
            }
        }
    }

    /// Number of transactions (new or suspended) open on the calling thread
    pub fn depth(&self) -> usize {
        self.threads
            .get(&thread::current().id())
            .map_or(0, |state| state.frames.len())
    }

    /// Counters over this manager's lifetime
    pub fn metrics(&self) -> HostMetrics {
        HostMetrics {
            begun: self.begun.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
        }
    }

    /// Validate that `status` is innermost and move its frame to Completing
    fn start_completion(&self, status: &TransactionStatus) -> Result<(Synchronizations, bool, bool)> {
        let thread = thread::current().id();
        let mut state = self
            .threads
            .get_mut(&thread)
            .ok_or_else(|| Error::Host("no transaction open on this thread".to_string()))?;
        let frame = state
            .frames
            .last_mut()
            .filter(|frame| frame.id == status.frame_id)
            .ok_or_else(|| {
                Error::Host(format!(
                    "transaction {} is not the innermost transaction on this thread",
                    status.frame_id
                ))
            })?;
        if frame.phase == FramePhase::Completing {
            return Err(Error::Host(format!(
                "transaction {} is already completing",
                status.frame_id
            )));
        }
        frame.phase = FramePhase::Completing;
        Ok((sorted(&frame.synchronizations), frame.read_only, frame.rollback_only))
    }

    /// Rollback path; returns the first hook panic, if any
    #[must_use]
    fn finish_rollback(
        &self,
        frame_id: u64,
        synchronizations: &Synchronizations,
    ) -> Option<PanicPayload> {
        let mut panicked = None;
        for synchronization in synchronizations {
            match panic::catch_unwind(AssertUnwindSafe(|| synchronization.before_completion(self))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(frame = frame_id, error = %e, "before-completion failed during rollback");
                }
                Err(payload) => {
                    error!(frame = frame_id, "before-completion panicked during rollback");
                    panicked.get_or_insert(payload);
                }
            }
        }
        self.after_completion(
            frame_id,
            synchronizations,
            CompletionStatus::RolledBack,
            &mut panicked,
        );
        panicked
    }

    /// Run after-completion hooks, pop the frame and resume the outer one
    ///
    /// Every hook runs even if an earlier one panics; the first panic is
    /// kept in `panicked`.
    fn after_completion(
        &self,
        frame_id: u64,
        synchronizations: &Synchronizations,
        outcome: CompletionStatus,
        panicked: &mut Option<PanicPayload>,
    ) {
        for synchronization in synchronizations {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| {
                synchronization.after_completion(outcome, self)
            })) {
                error!(frame = frame_id, status = %outcome, "after-completion hook panicked");
                panicked.get_or_insert(payload);
            }
        }
        match outcome {
            CompletionStatus::Committed => self.committed.fetch_add(1, Ordering::Relaxed),
            _ => self.rolled_back.fetch_add(1, Ordering::Relaxed),
        };
        debug!(frame = frame_id, status = %outcome, "Completed transaction");

        let to_resume = self.pop_frame(frame_id);
        for synchronization in &to_resume {
            if let Err(payload) =
                panic::catch_unwind(AssertUnwindSafe(|| synchronization.resume(self)))
            {
                error!(frame = frame_id, "resume hook panicked");
                panicked.get_or_insert(payload);
            }
        }
    }

    /// Pop the completed frame; returns the outer frame's synchronizations
    fn pop_frame(&self, frame_id: u64) -> Synchronizations {
        let thread = thread::current().id();
        let to_resume = match self.threads.get_mut(&thread) {
            Some(mut state) => {
                if state.frames.last().map(|f| f.id) == Some(frame_id) {
                    state.frames.pop();
                }
                state
                    .frames
                    .last()
                    .map(|outer| sorted(&outer.synchronizations))
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };
        self.threads.remove_if(&thread, |_, state| state.is_idle());
        to_resume
    }

    fn mark_frame_rollback_only(&self, frame_id: u64) {
        if let Some(mut state) = self.threads.get_mut(&thread::current().id()) {
            if let Some(frame) = state.frames.iter_mut().find(|f| f.id == frame_id) {
                frame.rollback_only = true;
            }
        }
    }
}

impl Default for LocalTransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadResources for LocalTransactionManager {
    fn get_thread_resource(&self, key: &str) -> Option<ThreadResource> {
        self.threads
            .get(&thread::current().id())
            .and_then(|state| state.resources.get(key).cloned())
    }

    fn bind_thread_resource(&self, key: &str, value: ThreadResource) {
        self.threads
            .entry(thread::current().id())
            .or_default()
            .resources
            .insert(key.to_string(), value);
    }

    fn unbind_thread_resource(&self, key: &str) -> Option<ThreadResource> {
        let thread = thread::current().id();
        let removed = self
            .threads
            .get_mut(&thread)
            .and_then(|mut state| state.resources.remove(key));
        self.threads.remove_if(&thread, |_, state| state.is_idle());
        removed
    }
}

impl TransactionHost for LocalTransactionManager {
    fn is_transaction_active(&self) -> bool {
        self.threads
            .get(&thread::current().id())
            .map_or(false, |state| !state.frames.is_empty())
    }

    fn is_current_transaction_read_only(&self) -> bool {
        self.threads
            .get(&thread::current().id())
            .and_then(|state| state.frames.last().map(|f| f.read_only))
            .unwrap_or(false)
    }

    fn register_synchronization(&self, synchronization: Arc<dyn TransactionSynchronization>) -> Result<()> {
        let mut state = self
            .threads
            .get_mut(&thread::current().id())
            .ok_or_else(Error::no_active_transaction)?;
        let frame = state.frames.last_mut().ok_or_else(Error::no_active_transaction)?;
        if frame.phase == FramePhase::Completing {
            return Err(Error::Host(format!(
                "transaction {} is completing; synchronizations can no longer be registered",
                frame.id
            )));
        }
        frame.synchronizations.push(synchronization);
        Ok(())
    }
}

fn reraise(panicked: Option<PanicPayload>) {
    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
}

fn sorted(synchronizations: &Synchronizations) -> Synchronizations {
    let mut sorted = synchronizations.clone();
    sorted.sort_by_key(|s| s.order());
    sorted
}
