//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use crate::core::Spawn;

/// Tokio-based spawner that runs the scheduler's driver loop and dispatches
/// on a tokio runtime.
///
/// A spawner from [`TokioSpawner::with_worker_threads`] owns its runtime.
/// Clones only carry the handle: schedulers and spawned tasks hold clones,
/// and a runtime must never be dropped from inside one of its own tasks.
/// Keep the owning spawner alive for as long as work runs on it.
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
    /// Set only on the spawner that built the runtime.
    runtime: Option<Arc<tokio::runtime::Runtime>>,
}

impl Clone for TokioSpawner {
    fn clone(&self) -> Self {
        Self::new(self.handle.clone())
    }
}

impl TokioSpawner {
    /// Create a spawner from a tokio runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            runtime: None,
        }
    }

    /// Spawner for the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like
    /// [`tokio::runtime::Handle::current`].
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    /// Spawner for the current runtime, if there is one.
    pub fn try_current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }

    /// Create a spawner owning a new multi-threaded runtime.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Handle of the runtime this spawner spawns onto.
    pub const fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }

    /// Whether this spawner owns its runtime.
    pub const fn owns_runtime(&self) -> bool {
        self.runtime.is_some()
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}
