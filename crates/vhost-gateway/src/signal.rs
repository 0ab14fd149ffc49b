use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A write-once broadcast signal: many waiters, fired exactly once.
#[derive(Clone)]
pub(crate) struct OnceSignal(Arc<Inner>);

struct Inner {
    fired: AtomicBool,
    notify: Notify,
}

impl OnceSignal {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Inner {
            fired: AtomicBool::new(false),
            notify: Notify::new(),
        }))
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.0.fired.load(Ordering::SeqCst)
    }

    pub(crate) fn fire(&self) {
        if !self.0.fired.swap(true, Ordering::SeqCst) {
            self.0.notify.notify_waiters();
        }
    }

    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.0.notify.notified();
            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }
}
