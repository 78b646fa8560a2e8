//! Async message queue
//!
//! Decouples message arrival from possibly-suspended consumption while
//! preserving arrival order. Internally two parallel sequences live under
//! one mutex — buffered messages and pending waiters — with the invariant
//! that at most one of them is non-empty at any time. The mutex protects
//! only sequence membership; waiter resolution happens outside it through a
//! oneshot channel, so the continuation always runs as its own scheduled
//! task and a consumer calling straight back into the queue cannot
//! deadlock.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::QueueError;

type Waiter<M> = oneshot::Sender<Result<M, QueueError>>;

struct Inner<M> {
    messages: VecDeque<M>,
    waiters: VecDeque<Waiter<M>>,
    closed: bool,
}

/// FIFO pairing of arriving messages with awaiting consumers.
///
/// Messages are delivered in arrival order, matched to `next()` callers in
/// request order. `push` may be called from any thread; each registered
/// waiter is resolved exactly once — with a message, or with
/// [`QueueError::Closed`] on teardown.
pub struct MessageQueue<M> {
    inner: Mutex<Inner<M>>,
}

impl<M> Default for MessageQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> MessageQueue<M> {
    pub fn new() -> Self {
        MessageQueue {
            inner: Mutex::new(Inner {
                messages: VecDeque::new(),
                waiters: VecDeque::new(),
                closed: false,
            }),
        }
    }

    /// Hand a message to the oldest waiter, or buffer it if nobody waits.
    ///
    /// A waiter whose `next()` future was dropped hands the message back
    /// through the failed send and the following waiter is tried, so a
    /// cancelled consumer never swallows a message. Pushing to a closed
    /// queue drops the message.
    pub fn push(&self, message: M) {
        let mut message = message;
        loop {
            let waiter = {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return;
                }
                match inner.waiters.pop_front() {
                    Some(waiter) => waiter,
                    None => {
                        inner.messages.push_back(message);
                        return;
                    }
                }
            };
            // resolve outside the lock; the receiver runs as its own task
            match waiter.send(Ok(message)) {
                Ok(()) => return,
                Err(returned) => match returned {
                    Ok(recovered) => message = recovered,
                    Err(_) => return,
                },
            }
        }
    }

    /// Await the next message in arrival order.
    ///
    /// Resolves immediately if a message is buffered; otherwise the caller
    /// is registered as a waiter and suspended until a future `push` (or
    /// `close`) resolves it.
    pub async fn next(&self) -> Result<M, QueueError> {
        let receiver = {
            let mut inner = self.inner.lock();
            if let Some(message) = inner.messages.pop_front() {
                return Ok(message);
            }
            if inner.closed {
                return Err(QueueError::Closed);
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.push_back(tx);
            rx
        };
        receiver.await.map_err(|_| QueueError::Closed)?
    }

    /// Close the queue: every pending waiter resolves with
    /// [`QueueError::Closed`]; messages already buffered stay drainable
    /// through `next()`; later pushes are dropped.
    pub fn close(&self) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            std::mem::take(&mut inner.waiters)
        };
        if !waiters.is_empty() {
            debug!(count = waiters.len(), "resolving pending waiters on close");
        }
        for waiter in waiters {
            let _ = waiter.send(Err(QueueError::Closed));
        }
    }

    /// Number of buffered, undelivered messages.
    pub fn buffered(&self) -> usize {
        self.inner.lock().messages.len()
    }

    /// Number of registered, unresolved waiters.
    pub fn waiting(&self) -> usize {
        self.inner.lock().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffered_message_resolves_immediately() {
        let queue = MessageQueue::new();
        queue.push(1u32);
        assert_eq!(queue.next().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn close_resolves_pending_waiters() {
        let queue = std::sync::Arc::new(MessageQueue::<u32>::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        while queue.waiting() == 0 {
            tokio::task::yield_now().await;
        }
        queue.close();
        assert_eq!(waiter.await.unwrap(), Err(QueueError::Closed));
    }

    #[tokio::test]
    async fn closed_queue_still_drains_buffered_messages() {
        let queue = MessageQueue::new();
        queue.push(1u32);
        queue.close();
        assert_eq!(queue.next().await.unwrap(), 1);
        assert_eq!(queue.next().await, Err(QueueError::Closed));
    }
}
