//! # Async Bus Runtime
//!
//! ## Purpose
//!
//! Adapts a callback-driven bus library onto the tokio runtime. The bus
//! library wants to be told when its descriptors are ready, when its timers
//! fire, and when to keep draining queued traffic; tokio wants everything
//! expressed as scheduled tasks. The event bridge translates between the
//! two, and the message queue pairs arriving messages with suspended
//! consumers.
//!
//! ## Integration Points
//!
//! - **Foreign Seam**: [`bus`] models the library side — watch and timeout
//!   handles, dispatch status, and the raw connection surface
//! - **Event Bridge**: [`EventBridge`] owns the watch/timeout registries
//!   and the dispatch trampoline
//! - **Queue**: [`MessageQueue`] delivers messages to `next()` callers in
//!   arrival order, FIFO on both sides
//! - **Connection**: [`Connection`] composes bridge, queue and codec into
//!   call/reply and signal delivery
//!
//! ## Architecture Role
//!
//! ```text
//! bus library ⇄ [EventBridge] ⇄ tokio runtime
//!                    ↓
//!               dispatch() → handler → [MessageQueue] → awaiting callers
//! ```
//!
//! ## Concurrency Model
//!
//! One reactor-style task queue (the tokio runtime handle). Every
//! completion — descriptor readiness, timer fire, trampoline step, waiter
//! resolution — is a discrete scheduled unit, never an inline call. The
//! queue's mutex exists because push/next may arrive from non-reactor
//! threads; the bridge itself assumes reactor context.

pub mod bridge;
pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
pub mod matchrule;
pub mod queue;
pub mod testing;

pub use bridge::EventBridge;
pub use bus::{
    BusTimeout, BusWatch, DispatchStatus, EventHooks, RawConnection, TimeoutId, WatchFlags,
    WatchId,
};
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use error::{BusError, CallError, QueueError};
pub use matchrule::MatchRule;
pub use queue::MessageQueue;
pub use testing::LoopbackBus;
