//! Dispatch trait for scheduling partial transaction update work.
//!
//! This crate defines the [`Dispatch`] trait the updater uses to schedule
//! CPU-intensive work (partial validation, cosigner eligibility checks,
//! ed25519 verification) off the caller's thread.
//!
//! Dispatch is an implementation detail of the hosting process, not the
//! update algorithm. Two implementations exist:
//!
//! - `SyncDispatch` (partialtx-dispatch-sync) runs closures inline, for
//!   deterministic tests
//! - `PooledDispatch` (partialtx-dispatch-pooled) uses a rayon thread pool,
//!   for production

/// Trait for dispatching update work to a worker pool.
///
/// Implementations schedule fire-and-forget closures. Results are
/// communicated back via channels captured in the closures, so callers never
/// block on dispatch itself.
///
/// Implementations must run closures to completion even while the dispatcher
/// is being torn down: a scheduled update owns the sending half of a result
/// channel, and dropping it unfulfilled would strand the receiver.
pub trait Dispatch: Send + Sync + Clone {
    /// Spawn an update task.
    fn spawn_update(&self, f: impl FnOnce() + Send + 'static);

    /// Number of update tasks scheduled but not yet finished.
    fn update_queue_depth(&self) -> usize;
}
