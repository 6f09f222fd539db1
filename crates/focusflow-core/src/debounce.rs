use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Runs only the most recently scheduled action, once `delay` has passed
/// without a newer schedule.
///
/// Only the timer is cancellable. Once it fires, the action is handed to its
/// own task and runs to completion regardless of later `schedule`/`cancel`.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        trace!(delay_ms = delay.as_millis() as u64, "scheduling debounced action");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!("debounce timer fired");
            let _ = tokio::spawn(action);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take()
            && !handle.is_finished()
        {
            trace!("cancelling superseded debounced action");
            handle.abort();
        }
    }

    /// True while the timer is armed.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
