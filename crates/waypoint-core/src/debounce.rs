//! Cancellable debounced task queue.
//!
//! Each [`Debouncer::trigger`] aborts the task still waiting from the
//! previous trigger, so only the last of a burst of triggers runs.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs the last future triggered within `delay`.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// A debouncer waiting `delay` before running.
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// The configured delay.
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `task` to run after the delay, aborting any pending task.
    /// Must be called inside a tokio runtime.
    pub fn trigger<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            if !previous.is_finished() {
                tracing::debug!("debounced task superseded");
            }
            previous.abort();
        }
    }

    /// Abort the pending task, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    /// Whether a triggered task has not yet finished.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter_task(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> + use<> {
        let counter = Arc::clone(counter);
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_trigger_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let ran = Arc::new(AtomicUsize::new(0));

        debouncer.trigger(counter_task(&ran, 1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.trigger(counter_task(&ran, 2));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_task() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let ran = Arc::new(AtomicUsize::new(0));

        debouncer.trigger(counter_task(&ran, 1));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_triggers_all_run() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            debouncer.trigger(async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
