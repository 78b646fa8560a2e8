//! Ordering, exclusivity, and teardown behavior of the message queue.

use std::sync::Arc;

use bridge::{MessageQueue, QueueError};
use futures::future::join_all;
use tokio::task::yield_now;

async fn settle(queue: &MessageQueue<u32>, waiters: usize) {
    while queue.waiting() < waiters {
        yield_now().await;
    }
}

#[tokio::test]
async fn buffered_messages_drain_in_arrival_order() {
    let queue = MessageQueue::new();
    queue.push(1u32);
    queue.push(2);
    queue.push(3);
    assert_eq!(queue.next().await.unwrap(), 1);
    assert_eq!(queue.next().await.unwrap(), 2);
    assert_eq!(queue.next().await.unwrap(), 3);
}

#[tokio::test]
async fn waiters_resolve_in_registration_order() {
    let queue = Arc::new(MessageQueue::new());

    let mut handles = Vec::new();
    for n in 0..3usize {
        let waiter = queue.clone();
        handles.push(tokio::spawn(async move { waiter.next().await }));
        // register one waiter at a time so the order is pinned down
        settle(&queue, n + 1).await;
    }

    queue.push(10u32);
    queue.push(20);
    queue.push(30);

    let mut got = Vec::new();
    for handle in handles {
        got.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(got, vec![10, 20, 30]);
}

#[tokio::test]
async fn buffered_and_waiting_are_never_both_populated() {
    let queue = Arc::new(MessageQueue::new());

    queue.push(1u32);
    queue.push(2);
    assert_eq!(queue.buffered(), 2);
    assert_eq!(queue.waiting(), 0);

    assert_eq!(queue.next().await.unwrap(), 1);
    assert_eq!(queue.next().await.unwrap(), 2);

    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.next().await })
    };
    settle(&queue, 1).await;
    assert_eq!(queue.buffered(), 0);
    assert_eq!(queue.waiting(), 1);

    queue.push(3);
    assert_eq!(waiter.await.unwrap().unwrap(), 3);
    assert_eq!(queue.buffered(), 0);
    assert_eq!(queue.waiting(), 0);
}

#[tokio::test]
async fn interleaved_push_and_pop_preserves_order() {
    let queue = Arc::new(MessageQueue::new());
    queue.push(1u32);
    assert_eq!(queue.next().await.unwrap(), 1);

    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.next().await })
    };
    settle(&queue, 1).await;
    queue.push(2);
    assert_eq!(waiter.await.unwrap().unwrap(), 2);

    queue.push(3);
    queue.push(4);
    assert_eq!(queue.next().await.unwrap(), 3);
    assert_eq!(queue.next().await.unwrap(), 4);
}

#[tokio::test]
async fn cancelled_waiter_does_not_swallow_a_message() {
    let queue = Arc::new(MessageQueue::new());

    let doomed = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.next().await })
    };
    settle(&queue, 1).await;
    doomed.abort();
    assert!(doomed.await.unwrap_err().is_cancelled());

    // the stale waiter is skipped and the message survives
    queue.push(7u32);
    assert_eq!(queue.next().await.unwrap(), 7);
}

#[tokio::test]
async fn cancelled_waiter_is_skipped_in_favor_of_a_live_one() {
    let queue = Arc::new(MessageQueue::new());

    let doomed = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.next().await })
    };
    settle(&queue, 1).await;

    let live = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.next().await })
    };
    settle(&queue, 2).await;

    doomed.abort();
    assert!(doomed.await.unwrap_err().is_cancelled());

    queue.push(9u32);
    assert_eq!(live.await.unwrap().unwrap(), 9);
}

#[tokio::test]
async fn close_fails_every_pending_waiter() {
    let queue = Arc::new(MessageQueue::<u32>::new());

    let mut handles = Vec::new();
    for n in 0..2usize {
        let waiter = queue.clone();
        handles.push(tokio::spawn(async move { waiter.next().await }));
        settle(&queue, n + 1).await;
    }

    queue.close();
    for outcome in join_all(handles).await {
        assert_eq!(outcome.unwrap(), Err(QueueError::Closed));
    }

    queue.push(1);
    assert_eq!(queue.next().await, Err(QueueError::Closed));
}
