//! Thread pool for background task execution.
//!
//! Built on rayon's work-stealing scheduler. A task's result is handed to a
//! callback through a [`UiDispatcher`], so the callback runs in the
//! initiating context rather than on the worker.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use horizon_forge_core::{DirectDispatcher, ThreadPool};
//!
//! let pool = ThreadPool::global().expect("thread pool");
//! pool.spawn_with_callback(Arc::new(DirectDispatcher), || 6 * 7, |answer| {
//!     assert_eq!(answer, Some(42));
//! });
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::error::{ForgeError, ThreadPoolError};
use crate::invocation::{QueuedInvocation, UiDispatcher};

static GLOBAL_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// Configuration for creating a thread pool.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads. `None` means one per CPU core.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
    /// Stack size for worker threads in bytes.
    pub stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "forge-worker".to_string(),
            stack_size: None,
        }
    }
}

impl ThreadPoolConfig {
    /// Configuration with a fixed thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }
}

/// A pool of worker threads for background tasks.
pub struct ThreadPool {
    pool: RayonThreadPool,
    active_tasks: Arc<AtomicUsize>,
}

impl ThreadPool {
    /// The process-wide pool, created with default settings on first use.
    pub fn global() -> Result<&'static ThreadPool, ForgeError> {
        if let Some(pool) = GLOBAL_POOL.get() {
            return Ok(pool);
        }
        let pool = ThreadPool::new(ThreadPoolConfig::default())?;
        // Losing an initialization race just drops our pool.
        let _ = GLOBAL_POOL.set(pool);
        GLOBAL_POOL
            .get()
            .ok_or_else(|| ThreadPoolError::CreationFailed("global pool unavailable".into()).into())
    }

    /// Create a standalone pool.
    pub fn new(config: ThreadPoolConfig) -> Result<Self, ForgeError> {
        let name = config.thread_name.clone();
        let mut builder = ThreadPoolBuilder::new().thread_name(move |index| format!("{name}-{index}"));

        if let Some(num_threads) = config.num_threads {
            builder = builder.num_threads(num_threads);
        }
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let pool = builder
            .build()
            .map_err(|e| ThreadPoolError::CreationFailed(e.to_string()))?;

        tracing::debug!(
            target: "horizon_forge_core",
            threads = pool.current_num_threads(),
            name = %config.thread_name,
            "thread pool created"
        );

        Ok(Self {
            pool,
            active_tasks: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Number of tasks currently running or queued.
    pub fn active_tasks(&self) -> usize {
        self.active_tasks.load(Ordering::Acquire)
    }

    /// Spawn a task whose result is delivered to `callback` through `dispatcher`.
    ///
    /// A panicking task still reaches the callback, with `None`.
    pub fn spawn_with_callback<F, T, C>(&self, dispatcher: Arc<dyn UiDispatcher>, task: F, callback: C)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
        C: FnOnce(Option<T>) + Send + 'static,
    {
        self.active_tasks.fetch_add(1, Ordering::AcqRel);
        let active_tasks = self.active_tasks.clone();

        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(task)).ok();
            if result.is_none() {
                tracing::error!(target: "horizon_forge_core", "task with callback panicked");
            }
            active_tasks.fetch_sub(1, Ordering::AcqRel);
            dispatcher.dispatch(QueuedInvocation::new(move || callback(result)));
        });
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads())
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

static_assertions::assert_impl_all!(ThreadPool: Send, Sync);
