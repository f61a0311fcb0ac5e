//! Single-slot hand-off channels between the control side and the bridge.
//!
//! Each direction of the exchange owns one [`Handoff`]. A slot holds at
//! most one item: putting into an occupied slot is a protocol violation
//! (the peer produced a second item before the first was consumed) and
//! fails immediately with [`HandoffError::Occupied`] instead of queueing.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};

/// Errors raised by a [`Handoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    /// The slot already holds an item that has not been taken.
    #[error("hand-off slot already occupied")]
    Occupied,

    /// The channel can no longer deliver items.
    #[error("hand-off channel closed")]
    Closed,
}

/// A bounded hand-off channel of capacity one.
#[derive(Debug)]
pub struct Handoff<T> {
    tx: mpsc::Sender<T>,
    rx: Mutex<mpsc::Receiver<T>>,
}

impl<T> Handoff<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Place an item in the slot without waiting.
    pub fn put(&self, item: T) -> Result<(), HandoffError> {
        self.tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(_) => HandoffError::Occupied,
            TrySendError::Closed(_) => HandoffError::Closed,
        })
    }

    /// Wait until an item is available and take it.
    pub async fn get(&self) -> Result<T, HandoffError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(HandoffError::Closed)
    }

    /// Take the item if one is present, without waiting.
    ///
    /// Returns `None` while another task is blocked in [`get`](Self::get),
    /// since that task will receive the next item.
    pub fn try_get(&self) -> Option<T> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }

    /// Whether the slot is currently empty.
    pub fn is_empty(&self) -> bool {
        self.tx.capacity() == self.tx.max_capacity()
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}
