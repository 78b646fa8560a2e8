//! Foreign bus surface
//!
//! Object-safe traits modeling the callback-driven bus library the bridge
//! adapts. The library owns its descriptors, its timers, and its message
//! buffers; this seam exposes only what the bridge needs: which descriptor
//! to wait on, in which direction, for how long, and whom to tell when
//! readiness arrives. Handle identity is carried as an opaque id so the
//! registries never key on raw addresses.

use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::Duration;

use codec::Message;
use types::Endpoint;

use crate::error::BusError;
use crate::matchrule::MatchRule;

/// Stable identity of a watch handle, assigned by the bus library.
pub type WatchId = u64;

/// Stable identity of a timeout handle, assigned by the bus library.
pub type TimeoutId = u64;

/// Requested (or observed) readiness directions for a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchFlags {
    pub readable: bool,
    pub writable: bool,
}

impl WatchFlags {
    pub const fn read() -> Self {
        WatchFlags {
            readable: true,
            writable: false,
        }
    }

    pub const fn write() -> Self {
        WatchFlags {
            readable: false,
            writable: true,
        }
    }
}

/// A descriptor-interest handle owned by the bus library.
///
/// `flags` and `enabled` are re-read every time the bridge decides whether
/// to keep waiting; the library may flip them between any two readiness
/// notifications.
pub trait BusWatch: Send + Sync + 'static {
    fn id(&self) -> WatchId;
    fn fd(&self) -> RawFd;
    fn flags(&self) -> WatchFlags;
    fn enabled(&self) -> bool;
    /// Called on the reactor when the descriptor is ready in `ready`
    /// direction(s). Runs as a scheduled task, never inline in the poll.
    fn notify(&self, ready: WatchFlags);
}

/// A timer handle owned by the bus library.
pub trait BusTimeout: Send + Sync + 'static {
    fn id(&self) -> TimeoutId;
    fn interval(&self) -> Duration;
    fn enabled(&self) -> bool;
    /// Called once per arming when the interval elapses.
    fn notify(&self);
}

/// Whether the bus library still holds undispatched traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// At least one message is queued; dispatch again.
    DataRemains,
    /// Nothing queued.
    Complete,
}

/// Callbacks the bus library invokes as its event sources change.
///
/// All hooks may be called from whatever thread the library is driven on;
/// implementations schedule their real work onto the reactor.
pub trait EventHooks: Send + Sync {
    fn watch_added(&self, watch: Arc<dyn BusWatch>);
    fn watch_removed(&self, id: WatchId);
    /// Enabled flag or direction interest changed on a live watch.
    fn watch_toggled(&self, watch: Arc<dyn BusWatch>);

    fn timeout_added(&self, timeout: Arc<dyn BusTimeout>);
    fn timeout_removed(&self, id: TimeoutId);
    fn timeout_toggled(&self, timeout: Arc<dyn BusTimeout>);

    fn dispatch_status_changed(&self, status: DispatchStatus);
}

/// The raw connection surface of the bus library.
///
/// [`crate::testing::LoopbackBus`] is the in-process implementation; a
/// transport binding over a real daemon implements the same seam.
pub trait RawConnection: Send + Sync + 'static {
    /// Register the event hooks. Existing watches and timeouts are
    /// announced through `watch_added`/`timeout_added` before this returns.
    fn install_event_hooks(&self, hooks: Arc<dyn EventHooks>);

    /// Process one queued message, delivering it to the message handler.
    fn dispatch(&self) -> DispatchStatus;

    /// Current status without dispatching anything.
    fn dispatch_status(&self) -> DispatchStatus;

    /// Queue `message` for transmission. Assigns and returns its serial;
    /// the body is sealed as a side effect.
    fn send(&self, message: &Message) -> Result<u32, BusError>;

    /// Allocate a method-call message addressed per `endpoint`.
    fn new_method_call(&self, endpoint: &Endpoint, member: &str) -> Message;

    /// Ask the bus to route messages matching `rule` to this connection.
    fn add_match(&self, rule: &MatchRule) -> Result<(), BusError>;

    /// Install the handler `dispatch` delivers incoming messages to.
    fn set_message_handler(&self, handler: Box<dyn Fn(Message) + Send + Sync>);
}
