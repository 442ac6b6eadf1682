//! Runtime abstraction layer for background redraw work
//!
//! Redraws are dispatched through a [`RedrawExecutor`], so the engine works
//! with a plain thread per dispatch, a Tokio blocking pool, or inline on the
//! caller for deterministic embedding.

use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};

/// A unit of background work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A trait for dispatching redraw jobs off the interactive thread
pub trait RedrawExecutor: Send + Sync + 'static {
    /// Run the job, possibly on another thread. Must not block on the job.
    fn execute(&self, job: Job) -> Result<()>;

    /// Human readable executor name used in logs
    fn name(&self) -> &'static str;
}

/// Spawns one named OS thread per dispatched job
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl RedrawExecutor for ThreadExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        std::thread::Builder::new()
            .name("mapframe-redraw".to_string())
            .spawn(job)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "thread"
    }
}

/// Runs jobs synchronously on the calling thread
///
/// Results still travel through the renderer's channel and are published on
/// the next poll, so the handoff semantics are unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl RedrawExecutor for InlineExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        job();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}

#[cfg(feature = "tokio-runtime")]
pub mod tokio_impl {
    use super::{Job, RedrawExecutor};
    use crate::{MapError, Result};

    /// Dispatches jobs onto a Tokio runtime's blocking pool
    #[derive(Debug, Clone)]
    pub struct TokioExecutor {
        handle: ::tokio::runtime::Handle,
    }

    impl TokioExecutor {
        pub fn new(handle: ::tokio::runtime::Handle) -> Self {
            Self { handle }
        }

        /// Uses the runtime the caller is currently running inside
        pub fn current() -> Result<Self> {
            ::tokio::runtime::Handle::try_current()
                .map(Self::new)
                .map_err(|e| MapError::Runtime(e.to_string()))
        }
    }

    impl RedrawExecutor for TokioExecutor {
        fn execute(&self, job: Job) -> Result<()> {
            // The JoinHandle is dropped on purpose: completion is reported
            // through the renderer's channel.
            drop(self.handle.spawn_blocking(job));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "tokio"
        }
    }
}

#[cfg(feature = "tokio-runtime")]
pub use tokio_impl::TokioExecutor;

/// A non-blocking try-acquire flag
///
/// Acquiring is an attempt, never a wait: a second caller is told the guard
/// is taken and must decide what to do instead.
#[derive(Debug, Default)]
pub struct TryGuard {
    held: AtomicBool,
}

impl TryGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the caller now holds the guard
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_try_guard_is_exclusive() {
        let guard = TryGuard::new();
        assert!(guard.try_acquire());
        assert!(!guard.try_acquire());
        assert!(guard.is_held());
        guard.release();
        assert!(guard.try_acquire());
    }

    #[test]
    fn test_inline_executor_runs_immediately() {
        let (tx, rx) = mpsc::channel();
        InlineExecutor
            .execute(Box::new(move || tx.send(42).unwrap()))
            .unwrap();
        assert_eq!(rx.try_recv().unwrap(), 42);
    }

    #[test]
    fn test_thread_executor_runs_off_thread() {
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        ThreadExecutor
            .execute(Box::new(move || {
                tx.send(std::thread::current().id()).unwrap();
            }))
            .unwrap();
        let worker = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert_ne!(worker, caller);
    }

    #[cfg(feature = "tokio-runtime")]
    #[::tokio::test(flavor = "multi_thread")]
    async fn test_tokio_executor() {
        let executor = TokioExecutor::current().unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        executor
            .execute(Box::new(move || tx.send("done").unwrap()))
            .unwrap();
        let result = ::tokio::task::spawn_blocking(move || {
            rx.recv_timeout(std::time::Duration::from_secs(5))
        })
        .await
        .unwrap();
        assert_eq!(result.unwrap(), "done");
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_tokio_executor_requires_runtime() {
        assert!(TokioExecutor::current().is_err());
    }
}
