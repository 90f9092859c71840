//! Blocking multi-producer multi-consumer queue (§5) used to hand
//! completed documents from indexing workers to the storage writer.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::time::Duration;

/// A bounded, blocking MPMC queue.
pub struct BlockingQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> BlockingQueue<T> {
    /// Creates a queue with the given capacity. Sends block once the queue
    /// is full; receives block once it is empty.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// A cloneable handle for pushing items; blocks if the queue is full.
    pub fn sender(&self) -> Sender<T> {
        self.sender.clone()
    }

    /// A cloneable handle for popping items; blocks if the queue is empty.
    pub fn receiver(&self) -> Receiver<T> {
        self.receiver.clone()
    }

    /// Pushes an item, blocking if the queue is full. Fails if every
    /// receiver has been dropped.
    pub fn push(&self, item: T) -> Result<(), T> {
        self.sender.send(item).map_err(|e| e.0)
    }

    /// Pops an item, blocking up to `timeout`. Returns `None` on timeout or
    /// once every sender has been dropped and the queue is drained.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// The number of items currently queued.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// True if the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
