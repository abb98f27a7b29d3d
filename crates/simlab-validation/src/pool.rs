//! Worker pool and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::ValidationError;

/// Build a pool with `threads` workers, or one per CPU when unset or zero.
pub fn build_pool(threads: Option<usize>) -> Result<ThreadPool, ValidationError> {
    let threads = threads.filter(|n| *n > 0).unwrap_or_else(num_cpus::get);
    debug!(threads, "Building worker pool");

    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("simlab-worker-{}", i))
        .build()?;
    Ok(pool)
}

/// Shared cancellation request, checked before each unit of work starts.
///
/// A unit already running is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), ValidationError> {
        if self.is_cancelled() {
            Err(ValidationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size() {
        let pool = build_pool(Some(3)).unwrap();
        assert_eq!(pool.current_num_threads(), 3);

        let pool = build_pool(Some(0)).unwrap();
        assert_eq!(pool.current_num_threads(), num_cpus::get());
    }

    #[test]
    fn test_cancellation_is_shared() {
        let flag = CancellationFlag::new();
        let clone = flag.clone();
        assert!(flag.check().is_ok());

        clone.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(ValidationError::Cancelled)));
    }
}
