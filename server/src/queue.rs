//! Bounded update queue between the webhook handler and the sync worker.
//!
//! The producer side never blocks: when the queue is full the update is
//! dropped and the caller told so, which keeps webhook latency flat under
//! load. Items drain in FIFO order to a single consumer.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Clone)]
pub struct UpdateQueue {
    tx: mpsc::Sender<String>,
}

pub struct UpdateReceiver {
    rx: mpsc::Receiver<String>,
}

impl UpdateQueue {
    /// Create a queue holding at most `capacity` pending branch names,
    /// returning the cloneable producer handle and the sole consumer end.
    pub fn bounded(capacity: usize) -> (UpdateQueue, UpdateReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (UpdateQueue { tx }, UpdateReceiver { rx })
    }

    /// Non-blocking enqueue. `false` means the item was shed (queue full or
    /// shut down) and the caller should signal backpressure upstream.
    pub fn enqueue(&self, branch: impl Into<String>) -> bool {
        match self.tx.try_send(branch.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(branch)) => {
                tracing::warn!(branch = %branch, "update queue full, dropping update");
                false
            }
            Err(TrySendError::Closed(branch)) => {
                tracing::warn!(branch = %branch, "update queue closed, dropping update");
                false
            }
        }
    }
}

impl UpdateReceiver {
    /// Next branch in FIFO order; `None` once every producer handle is
    /// dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
