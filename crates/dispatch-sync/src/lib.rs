//! Inline dispatch for deterministic execution.
//!
//! [`SyncDispatch`] runs every closure on the calling thread before
//! `spawn_update` returns. Update outcomes become observable in program
//! order, which makes it the right dispatcher for tests and simulation.

use partialtx_dispatch::Dispatch;

/// Dispatch implementation that executes closures inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncDispatch;

impl SyncDispatch {
    /// Create a new inline dispatcher.
    pub fn new() -> Self {
        Self
    }
}

impl Dispatch for SyncDispatch {
    fn spawn_update(&self, f: impl FnOnce() + Send + 'static) {
        f();
    }

    fn update_queue_depth(&self) -> usize {
        // Closures complete before spawn_update returns.
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_runs_inline() {
        let dispatch = SyncDispatch::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        dispatch.spawn_update(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        // No sleep needed: the closure already ran.
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preserves_program_order() {
        let dispatch = SyncDispatch::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..4 {
            let order = order.clone();
            dispatch.spawn_update(move || order.lock().unwrap().push(i));
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_queue_depth_is_zero() {
        let dispatch = SyncDispatch::new();
        dispatch.spawn_update(|| {});
        assert_eq!(dispatch.update_queue_depth(), 0);
    }

    #[test]
    fn test_clones_share_nothing_but_behave_identically() {
        let dispatch = SyncDispatch::new();
        let clone = dispatch;

        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        clone.spawn_update(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(dispatch.update_queue_depth(), 0);
    }
}
