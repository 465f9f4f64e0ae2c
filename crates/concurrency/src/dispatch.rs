//! Listener dispatch for the three notification phases
//!
//! ## Before commit (fixed point)
//!
//! ```text
//! visited = {}
//! loop:
//!   pending = listeners - visited        (registration order)
//!   if pending is empty: done
//!   for l in pending:
//!     visited += l                       (before the call, per listener)
//!     l.before_commit(read_only)?        (may register more listeners)
//! ```
//!
//! Every listener, including ones registered by other listeners during this
//! phase, sees exactly one `before_commit`. A listener that re-registers
//! itself is a duplicate add and is already visited, so the loop ends.
//!
//! ## Before completion
//!
//! One pass over a snapshot taken at call time. Late registrations are not
//! called.
//!
//! ## After completion
//!
//! One pass over a snapshot; `after_commit` when committed, otherwise
//! `after_rollback`. Each call is isolated: an error or a panic is logged
//! and the next listener still runs. Without `catch_panics` the first
//! panic is handed back in the [`CompletionReport`] so the caller can
//! resume it once teardown is done.

use crate::context::TransactionContext;
use crate::listener::{ListenerHandle, ListenerIdentity};
use rustc_hash::FxHashSet;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, trace};
use txbind_core::{CompletionStatus, Error, ListenerError, ListenerResult, Result};

/// Phase names used in errors and logs
pub const PHASE_BEFORE_COMMIT: &str = "before-commit";
/// Phase name for before-completion
pub const PHASE_BEFORE_COMPLETION: &str = "before-completion";
/// Phase name for after-completion
pub const PHASE_AFTER_COMPLETION: &str = "after-completion";

/// Run `before_commit` to a fixed point; returns how many listeners were called
///
/// # Errors
/// The first listener failure, wrapped in `ListenerCallback`. Remaining
/// listeners are not called.
pub fn before_commit(context: &TransactionContext, read_only: bool) -> Result<usize> {
    let mut visited: FxHashSet<ListenerIdentity> = FxHashSet::default();
    let mut round = 0usize;

    loop {
        let pending = context.pending_listeners(&visited);
        if pending.is_empty() {
            break;
        }
        round += 1;
        trace!(
            txn_id = %context.id(),
            round,
            pending = pending.len(),
            "before-commit round"
        );

        for handle in pending {
            visited.insert(handle.identity().clone());
            trace!(txn_id = %context.id(), listener = %handle, "before-commit");
            handle
                .listener()
                .before_commit(read_only)
                .map_err(|source| listener_failure(context, PHASE_BEFORE_COMMIT, source))?;
        }
    }

    debug!(
        txn_id = %context.id(),
        listeners = visited.len(),
        rounds = round,
        "before-commit dispatched"
    );
    Ok(visited.len())
}

/// Run `before_completion` once over a snapshot of the listeners
///
/// # Errors
/// The first listener failure, wrapped in `ListenerCallback`.
pub fn before_completion(context: &TransactionContext) -> Result<usize> {
    let listeners = context.listeners();
    for handle in &listeners {
        trace!(txn_id = %context.id(), listener = %handle, "before-completion");
        handle
            .listener()
            .before_completion()
            .map_err(|source| listener_failure(context, PHASE_BEFORE_COMPLETION, source))?;
    }
    Ok(listeners.len())
}

/// Outcome of the after-completion fan-out
#[derive(Debug, Default)]
pub struct CompletionReport {
    /// Listeners that returned an error or panicked
    pub failures: usize,
    /// First panic, kept only when panics are not contained
    pub panic: Option<Box<dyn Any + Send>>,
}

/// Run `after_commit` / `after_rollback` over a snapshot, isolating failures
///
/// Every listener is called regardless of what the others do.
pub fn after_completion(
    context: &TransactionContext,
    status: CompletionStatus,
    catch_panics: bool,
) -> CompletionReport {
    let listeners = context.listeners();
    let mut report = CompletionReport::default();

    for handle in &listeners {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
            notify_completion(handle, status)
        })) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let e = panic_error(&*payload);
                if !catch_panics && report.panic.is_none() {
                    report.panic = Some(payload);
                }
                Err(e)
            }
        };

        if let Err(e) = outcome {
            report.failures += 1;
            error!(
                txn_id = %context.id(),
                status = %status,
                listener = %handle,
                error = %e,
                "After completion ({}) listener exception",
                status
            );
        }
    }

    report
}

fn notify_completion(handle: &ListenerHandle, status: CompletionStatus) -> ListenerResult {
    if status.is_committed() {
        handle.listener().after_commit()
    } else {
        handle.listener().after_rollback()
    }
}

fn listener_failure(context: &TransactionContext, phase: &'static str, source: ListenerError) -> Error {
    Error::ListenerCallback {
        phase,
        txn_id: context.id(),
        source,
    }
}

fn panic_error(payload: &(dyn Any + Send)) -> ListenerError {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    ListenerError::new(format!("listener panicked: {}", detail))
}
