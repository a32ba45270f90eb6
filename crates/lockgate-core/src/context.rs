//! Per-request context: the raw resource key and the caller's cancellation
//! signal.
//!
//! The gate hands the same [`RequestContext`] to the downstream handler, so
//! the handler observes exactly the cancellation the gate observed.

use tokio::sync::watch;

/// Creates a linked cancel trigger and signal.
pub fn cancellation() -> (Canceller, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelSignal { rx })
}

/// Trigger side of a cancellation pair. Cancelling is permanent.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Another signal observing this canceller.
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side of a cancellation pair. Cheap to clone.
///
/// A signal whose [`Canceller`] was dropped without cancelling stays
/// uncancelled forever.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        CancelSignal { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; pends forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // sender gone without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}

/// What the gate needs from an inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    resource_key: String,
    cancel: CancelSignal,
}

impl RequestContext {
    /// Context for `resource_key` that is never cancelled.
    pub fn new(resource_key: impl Into<String>) -> Self {
        RequestContext {
            resource_key: resource_key.into(),
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// The key exactly as the request supplied it; may be empty.
    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    pub fn cancel_signal(&self) -> &CancelSignal {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
