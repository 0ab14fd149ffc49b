use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tracing::debug;

use crate::buffered::PeekedStream;
use crate::demuxer::Inner;

/// Error returned by [`VirtualListener::accept`] once the listener has been
/// closed (either explicitly or because the demuxer itself closed).
#[derive(Debug, thiserror::Error)]
#[error("virtual listener for {0} is closed")]
pub struct ListenerClosed(pub String);

/// A connection-valued queue that looks like a stream listener to the
/// consumer above it, but is fed by the demuxer rather than by the kernel.
/// One of these exists per registered vhost name.
pub struct VirtualListener {
    name: String,
    rx: mpsc::Receiver<PeekedStream>,
    demuxer: Weak<Inner>,
    closed: bool,
}

impl VirtualListener {
    pub(crate) fn new(name: String, rx: mpsc::Receiver<PeekedStream>, demuxer: Weak<Inner>) -> Self {
        Self {
            name,
            rx,
            demuxer,
            closed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Yields the next connection routed to this vhost, or an error once the
    /// listener is closed.
    pub async fn accept(&mut self) -> Result<PeekedStream, ListenerClosed> {
        if self.closed {
            return Err(ListenerClosed(self.name.clone()));
        }
        match self.rx.recv().await {
            Some(conn) => Ok(conn),
            None => {
                self.closed = true;
                Err(ListenerClosed(self.name.clone()))
            }
        }
    }

    /// Releases the name from the demuxer so no further connections are
    /// routed here, and stops accepting. Connections already queued are
    /// discarded. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(inner) = self.demuxer.upgrade() {
            Inner::unbind(&inner, &self.name).await;
        }
        self.rx.close();
        debug!(vhost = %self.name, "virtual listener closed");
    }
}
