//! Task spawning abstraction for runtime independence.
//!
//! The client spawns its background loops through [`TaskSpawner`] rather
//! than calling `tokio::spawn` directly, so an embedding application can
//! route them onto its own runtime.

use std::future::Future;

use futures::future::BoxFuture;

/// Abstraction for spawning background tasks.
///
/// Tasks run detached; the client stops them through its session
/// cancellation token rather than by joining.
///
/// # Example
///
/// ```ignore
/// let spawner: Arc<dyn TaskSpawner> = Arc::new(TokioSpawner::current());
/// spawner.spawn(async {
///     // Background work here
/// });
/// ```
pub trait TaskSpawner: Send + Sync {
    /// Spawns a boxed future as a background task.
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>);
}

impl dyn TaskSpawner {
    /// Spawns a future as a background task.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_boxed(Box::pin(future));
    }
}

/// Tokio-based spawner.
///
/// Uses a Tokio runtime handle to spawn tasks.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn tokio_spawner_executes_task() {
        let spawner: Arc<dyn TaskSpawner> = Arc::new(TokioSpawner::current());
        let (tx, rx) = oneshot::channel();

        spawner.spawn(async move {
            let _ = tx.send(7);
        });

        assert_eq!(rx.await.unwrap(), 7);
    }
}
