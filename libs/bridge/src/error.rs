//! Runtime-layer errors
//!
//! Bridge errors stay local to one event: a failed readiness wait is
//! delivered to that watch's task alone and never tears down the
//! connection. No retries happen at this layer.

use std::time::Duration;

use thiserror::Error;

/// Errors from the raw bus connection surface.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BusError {
    #[error("connection is closed")]
    Disconnected,

    #[error("match registration failed: {rule}: {reason}")]
    MatchFailed { rule: String, reason: String },
}

/// Errors resolving a queue waiter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueueError {
    /// The queue was closed (or dropped) before a message arrived.
    #[error("queue closed before a message arrived")]
    Closed,
}

/// Errors from a method call round trip.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The peer answered with an error message.
    #[error("call failed with '{name}': {message}")]
    ErrorReply { name: String, message: String },

    #[error("no reply within {0:?}")]
    ReplyTimeout(Duration),
}
