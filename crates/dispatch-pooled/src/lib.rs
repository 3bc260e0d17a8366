//! Rayon thread pool dispatch for production deployment.
//!
//! [`PooledDispatch`] schedules update work on a dedicated rayon thread
//! pool, keeping partial validation and ed25519 verification off the
//! caller's thread (typically a network intake thread).
//!
//! # Shutdown
//!
//! Dropping the last clone of a `PooledDispatch` drains the pool rather
//! than cancelling it: rayon completes every queued job before the pool's
//! threads exit. Closures that own result channel senders therefore always
//! fulfill their receivers, even when the dispatcher is torn down right
//! after scheduling.
//!
//! # Example
//!
//! ```no_run
//! use partialtx_dispatch_pooled::{PooledDispatch, ThreadPoolConfig};
//!
//! // Auto-detect cores
//! let dispatch = PooledDispatch::new(ThreadPoolConfig::auto()).unwrap();
//!
//! // Or customize
//! let config = ThreadPoolConfig::builder()
//!     .update_threads(4)
//!     .build()
//!     .unwrap();
//! let dispatch = PooledDispatch::new(config).unwrap();
//! ```

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use partialtx_dispatch::Dispatch;

/// Errors from thread pool configuration.
#[derive(Debug, Error)]
pub enum ThreadPoolError {
    #[error("Failed to build rayon thread pool: {0}")]
    RayonBuildError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Configuration for the update thread pool.
///
/// Use [`ThreadPoolConfig::auto`] to size the pool from available cores, or
/// the builder to set explicit values. Deserializable so hosts can embed it
/// in their node configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    /// Number of worker threads for update tasks. Each task runs one
    /// transaction or cosignature update end to end, including signature
    /// verification.
    pub update_threads: usize,

    /// Stack size for update threads (bytes).
    pub update_stack_size: usize,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self::auto()
    }
}

impl ThreadPoolConfig {
    /// Size the pool from available CPU cores.
    ///
    /// One core is left for the intake thread; everything else goes to
    /// update workers. Machines reporting fewer than two cores still get
    /// one worker (over-subscribing is fine).
    pub fn auto() -> Self {
        let available = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(4);

        Self::for_core_count(available)
    }

    /// Configure for a specific number of available cores.
    ///
    /// Useful for testing or when limiting resource usage.
    pub fn for_core_count(total_cores: usize) -> Self {
        Self {
            update_threads: total_cores.saturating_sub(1).max(1),
            update_stack_size: 2 * 1024 * 1024,
        }
    }

    /// Minimal configuration for testing (single worker).
    pub fn minimal() -> Self {
        Self {
            update_threads: 1,
            update_stack_size: 2 * 1024 * 1024,
        }
    }

    /// Create a builder seeded with auto-detected defaults.
    pub fn builder() -> ThreadPoolConfigBuilder {
        ThreadPoolConfigBuilder::new()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ThreadPoolError> {
        if self.update_threads == 0 {
            return Err(ThreadPoolError::InvalidConfig(
                "update_threads must be at least 1".to_string(),
            ));
        }
        if self.update_stack_size == 0 {
            return Err(ThreadPoolError::InvalidConfig(
                "update_stack_size must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`ThreadPoolConfig`].
#[derive(Debug, Clone)]
pub struct ThreadPoolConfigBuilder {
    config: ThreadPoolConfig,
}

impl ThreadPoolConfigBuilder {
    /// Create a new builder with auto-detected defaults.
    pub fn new() -> Self {
        Self {
            config: ThreadPoolConfig::auto(),
        }
    }

    /// Set the number of update worker threads.
    pub fn update_threads(mut self, count: usize) -> Self {
        self.config.update_threads = count;
        self
    }

    /// Set the stack size for update threads.
    pub fn update_stack_size(mut self, size: usize) -> Self {
        self.config.update_stack_size = size;
        self
    }

    /// Build the configuration, validating it first.
    pub fn build(self) -> Result<ThreadPoolConfig, ThreadPoolError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ThreadPoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Rayon thread pool dispatch for production deployment.
///
/// Clones share the same pool and pending counter, so queue depth is
/// consistent across handles.
#[derive(Clone)]
pub struct PooledDispatch {
    config: ThreadPoolConfig,
    update_pool: Arc<rayon::ThreadPool>,
    update_pending: Arc<AtomicUsize>,
}

impl PooledDispatch {
    /// Create a new pooled dispatch with the given configuration.
    pub fn new(config: ThreadPoolConfig) -> Result<Self, ThreadPoolError> {
        config.validate()?;

        let update_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.update_threads)
            .stack_size(config.update_stack_size)
            .thread_name(|i| format!("pt-update-{}", i))
            .build()
            .map_err(|e| ThreadPoolError::RayonBuildError(e.to_string()))?;

        tracing::info!(
            update_threads = config.update_threads,
            "update thread pool initialized"
        );

        Ok(Self {
            config,
            update_pool: Arc::new(update_pool),
            update_pending: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Create with auto-detected configuration.
    pub fn auto() -> Result<Self, ThreadPoolError> {
        Self::new(ThreadPoolConfig::auto())
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThreadPoolConfig {
        &self.config
    }
}

impl Dispatch for PooledDispatch {
    fn spawn_update(&self, f: impl FnOnce() + Send + 'static) {
        self.update_pending.fetch_add(1, Ordering::Relaxed);
        let pending = self.update_pending.clone();
        let pool = Arc::clone(&self.update_pool);
        self.update_pool.spawn(move || {
            // install() keeps any nested parallel iterators on this pool.
            pool.install(f);
            pending.fetch_sub(1, Ordering::Relaxed);
        });
    }

    fn update_queue_depth(&self) -> usize {
        self.update_pending.load(Ordering::Relaxed)
    }
}
