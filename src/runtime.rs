//! Runtime abstraction layer for async operations
//!
//! Tile fetches are spawned through the [`AsyncSpawner`] installed here, so
//! the viewer itself never depends on a particular executor. With the
//! `tokio-runtime` feature the default spawner targets the ambient Tokio
//! runtime; otherwise fetches run on a private background Tokio runtime.

use crate::prelude::{Future, Pin};
use crate::{MosaicError, Result};

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(
        &self,
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Result<Box<dyn AsyncHandle>>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience function for spawning with the global runtime
pub fn spawn<F>(future: F) -> Result<Box<dyn AsyncHandle>>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::trace!("runtime::spawn");
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;
    use ::tokio::task::JoinHandle;

    struct TaskHandle(JoinHandle<()>);

    impl AsyncHandle for TaskHandle {
        fn is_finished(&self) -> bool {
            self.0.is_finished()
        }

        fn cancel(&self) {
            self.0.abort();
        }
    }

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::Handle;

        /// Tokio-based async spawner
        ///
        /// Without an explicit handle the runtime of the calling thread is
        /// used; hosts that drive the viewer from a non-Tokio UI thread pass
        /// the handle of the runtime they own.
        #[derive(Default)]
        pub struct TokioSpawner {
            handle: Option<Handle>,
        }

        impl TokioSpawner {
            pub fn new() -> Self {
                Self { handle: None }
            }

            pub fn with_handle(handle: Handle) -> Self {
                Self {
                    handle: Some(handle),
                }
            }
        }

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Result<Box<dyn AsyncHandle>> {
                let handle = match &self.handle {
                    Some(handle) => handle.clone(),
                    None => Handle::try_current()
                        .map_err(|e| MosaicError::Runtime(e.to_string()))?,
                };
                Ok(Box::new(TaskHandle(handle.spawn(future))))
            }
        }
    }

    pub mod thread_impl {
        use super::*;
        use crate::prelude::Mutex;
        use ::tokio::runtime::{Builder, Handle};

        /// Runs futures on a private current-thread Tokio runtime
        ///
        /// The runtime is built on first use and driven by a dedicated
        /// `mosaic-fetch` thread, so HTTP fetches get a reactor even when the
        /// host has no Tokio runtime of its own.
        #[derive(Default)]
        pub struct ThreadSpawner {
            handle: Mutex<Option<Handle>>,
        }

        impl ThreadSpawner {
            pub fn new() -> Self {
                Self::default()
            }

            fn handle(&self) -> Result<Handle> {
                let mut slot = self
                    .handle
                    .lock()
                    .map_err(|e| MosaicError::Runtime(e.to_string()))?;
                if let Some(handle) = slot.as_ref() {
                    return Ok(handle.clone());
                }

                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| MosaicError::Runtime(e.to_string()))?;
                let handle = runtime.handle().clone();
                std::thread::Builder::new()
                    .name("mosaic-fetch".to_string())
                    .spawn(move || runtime.block_on(std::future::pending::<()>()))
                    .map_err(|e| MosaicError::Runtime(e.to_string()))?;
                log::debug!("started background fetch runtime");
                *slot = Some(handle.clone());
                Ok(handle)
            }
        }

        impl AsyncSpawner for ThreadSpawner {
            fn spawn_boxed(
                &self,
                future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
            ) -> Result<Box<dyn AsyncHandle>> {
                let handle = self.handle()?;
                Ok(Box::new(TaskHandle(handle.spawn(future))))
            }
        }
    }
}

/// Global runtime instance
static RUNTIME: std::sync::OnceLock<Box<dyn AsyncSpawner>> = std::sync::OnceLock::new();

/// Initialize the runtime with a specific spawner
///
/// Returns `false` when a spawner was already installed.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) -> bool {
    RUNTIME.set(spawner).is_ok()
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner::new())
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                Box::new(spawners::thread_impl::ThreadSpawner::new())
            }
        })
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test]
    async fn test_tokio_spawner() {
        let handle = spawn(async {
            ::tokio::time::sleep(::tokio::time::Duration::from_millis(10)).await;
        })
        .unwrap();

        assert!(!handle.is_finished());

        ::tokio::time::sleep(::tokio::time::Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_tokio_spawner_without_runtime_errors() {
        let spawner = spawners::tokio_impl::TokioSpawner::new();
        let result = spawner.spawn_boxed(Box::pin(async {}));
        assert!(matches!(result, Err(MosaicError::Runtime(_))));
    }

    #[test]
    fn test_thread_spawner_runs_future() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let handle = spawners::thread_impl::ThreadSpawner::new()
            .spawn_boxed(Box::pin(async move {
                let _ = tx.send(7u32);
            }))
            .unwrap();
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap(), 7);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while !handle.is_finished() && std::time::Instant::now() < deadline {
            std::thread::yield_now();
        }
        assert!(handle.is_finished());
    }

    #[test]
    fn test_thread_spawner_drives_http_fetches() {
        use crate::core::config::ApiConfig;
        use crate::data::backend::{HttpBackend, ViewerBackend};

        let backend = HttpBackend::new(&ApiConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_ms: 500,
            view: "2D".into(),
        });
        let (tx, rx) = crossbeam_channel::bounded(1);
        spawners::thread_impl::ThreadSpawner::new()
            .spawn_boxed(Box::pin(async move {
                let result = backend.fetch_metadata(1).await;
                let _ = tx.send(matches!(result, Err(MosaicError::Network(_))));
            }))
            .unwrap();
        // a missing reactor would panic the task and never answer
        assert!(rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap());
    }
}
