use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Tracks how many per-vhost serve workers are still running. [`Gateway::close`]
/// waits on this reaching zero before it tears down the demuxer and public
/// listener.
#[derive(Clone, Default)]
pub(crate) struct ShutdownGroup(Arc<Inner>);

#[derive(Default)]
struct Inner {
    count: AtomicUsize,
    zero: Notify,
}

impl ShutdownGroup {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enter(&self) {
        self.0.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn leave(&self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.zero.notify_waiters();
        }
    }

    pub(crate) async fn wait_until_zero(&self) {
        loop {
            // Register interest before checking the count: `Notify` remembers
            // a notification that lands between registration and the await
            // below, so this can't race a `leave()` that fires zero exactly
            // in between the load and the wait.
            let notified = self.0.zero.notified();
            if self.0.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}
