//! Event bridge
//!
//! Translates the bus library's descriptor watches, timers, and dispatch
//! status into tokio primitives. Each enabled watch direction is one
//! readiness task on an [`AsyncFd`]; each enabled timeout is one sleep
//! task; "data remains" becomes a self-rescheduling dispatch step. Every
//! continuation runs as its own spawned task, so a notify callback that
//! re-enters the bus library never recurses into the reactor.
//!
//! Registries key on the library-assigned handle ids. A toggle cancels the
//! handle's current tasks and re-arms from the handle's present flags, so
//! there is never more than one pending wait per watch direction or per
//! timer.

use std::collections::HashMap;
use std::os::unix::io::{AsRawFd, BorrowedFd, RawFd};
use std::sync::{Arc, Weak};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use parking_lot::Mutex;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::bus::{
    BusTimeout, BusWatch, DispatchStatus, EventHooks, RawConnection, TimeoutId, WatchFlags,
    WatchId,
};

/// Borrowed descriptor. The bus library owns the fd; dropping this must not
/// close it, so no `Drop` impl.
struct WatchFd(RawFd);

impl AsRawFd for WatchFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

struct WatchEntry {
    watch: Arc<dyn BusWatch>,
    fd: Arc<AsyncFd<WatchFd>>,
    read_task: Option<JoinHandle<()>>,
    write_task: Option<JoinHandle<()>>,
}

impl WatchEntry {
    fn cancel(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(task) = self.write_task.take() {
            task.abort();
        }
    }
}

struct TimerEntry {
    timeout: Arc<dyn BusTimeout>,
    task: Option<JoinHandle<()>>,
}

impl TimerEntry {
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Adapts a [`RawConnection`]'s event sources onto a tokio runtime.
///
/// Install with [`EventBridge::install`]; the bridge registers itself as
/// the connection's event hooks and keeps the connection by weak reference
/// so the two never keep each other alive.
pub struct EventBridge {
    conn: Weak<dyn RawConnection>,
    handle: Handle,
    watches: Mutex<HashMap<WatchId, WatchEntry>>,
    timeouts: Mutex<HashMap<TimeoutId, TimerEntry>>,
}

impl EventBridge {
    /// Wire `conn`'s event hooks to tasks on `handle`.
    ///
    /// Watches and timeouts the connection already holds are announced
    /// during installation and armed before this returns. If traffic is
    /// already queued, a dispatch step is scheduled immediately.
    pub fn install(conn: &Arc<dyn RawConnection>, handle: Handle) -> Arc<EventBridge> {
        let bridge = Arc::new(EventBridge {
            conn: Arc::downgrade(conn),
            handle,
            watches: Mutex::new(HashMap::new()),
            timeouts: Mutex::new(HashMap::new()),
        });
        conn.install_event_hooks(bridge.clone());
        if conn.dispatch_status() == DispatchStatus::DataRemains {
            bridge.drain();
        }
        bridge
    }

    /// Schedule one dispatch step; it reschedules itself while the
    /// connection reports data remaining.
    fn drain(&self) {
        step(self.handle.clone(), self.conn.clone());
    }

    /// (Re)spawn readiness tasks to match the watch's current flags.
    /// Existing tasks for this watch are cancelled first, so each
    /// direction has at most one pending wait.
    fn arm_watch(&self, entry: &mut WatchEntry) {
        entry.cancel();
        if !entry.watch.enabled() {
            return;
        }
        let flags = entry.watch.flags();
        if flags.readable {
            entry.read_task = Some(self.spawn_wait(entry, Direction::Read));
        }
        if flags.writable {
            entry.write_task = Some(self.spawn_wait(entry, Direction::Write));
        }
    }

    fn spawn_wait(&self, entry: &WatchEntry, dir: Direction) -> JoinHandle<()> {
        let watch = entry.watch.clone();
        let fd = entry.fd.clone();
        self.handle.spawn(async move {
            let raw = watch.fd();
            loop {
                let waited = match dir {
                    Direction::Read => fd.readable().await,
                    Direction::Write => fd.writable().await,
                };
                let mut guard = match waited {
                    Ok(guard) => guard,
                    Err(e) => {
                        warn!(id = watch.id(), error = %e, "readiness wait failed");
                        break;
                    }
                };
                watch.notify(dir.flags());
                // flags can flip inside notify; re-read before waiting again
                if !watch.enabled() || !dir.requested(watch.flags()) {
                    break;
                }
                // the library may consume less than everything per
                // notification; keep level-triggered semantics by clearing
                // the cached readiness only once the descriptor would block
                if !still_ready(raw, dir) {
                    guard.clear_ready();
                }
            }
        })
    }

    fn arm_timeout(&self, entry: &mut TimerEntry) {
        entry.cancel();
        if !entry.timeout.enabled() {
            return;
        }
        let timeout = entry.timeout.clone();
        entry.task = Some(self.handle.spawn(async move {
            tokio::time::sleep(timeout.interval()).await;
            timeout.notify();
        }));
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Read,
    Write,
}

impl Direction {
    fn flags(self) -> WatchFlags {
        match self {
            Direction::Read => WatchFlags::read(),
            Direction::Write => WatchFlags::write(),
        }
    }

    fn requested(self, flags: WatchFlags) -> bool {
        match self {
            Direction::Read => flags.readable,
            Direction::Write => flags.writable,
        }
    }
}

/// Zero-timeout poll of one descriptor in one direction. Tokio's `AsyncFd`
/// is edge-driven: once readiness is cleared, a descriptor that never fully
/// drained produces no new edge, so the bridge asks the kernel directly
/// whether data (or buffer space) remains before clearing.
fn still_ready(fd: RawFd, dir: Direction) -> bool {
    let interest = match dir {
        Direction::Read => PollFlags::POLLIN,
        Direction::Write => PollFlags::POLLOUT,
    };
    // the fd is foreign-owned and outlives the wait task
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let mut fds = [PollFd::new(borrowed, interest)];
    match poll(&mut fds, PollTimeout::ZERO) {
        Ok(n) if n > 0 => fds[0]
            .revents()
            .is_some_and(|revents| revents.intersects(interest)),
        _ => false,
    }
}

/// One dispatch step. Spawned rather than looped so every message handler
/// runs as its own task and other work interleaves between messages.
fn step(handle: Handle, conn: Weak<dyn RawConnection>) {
    let respawn = handle.clone();
    handle.spawn(async move {
        let Some(conn) = conn.upgrade() else {
            return;
        };
        if conn.dispatch() == DispatchStatus::DataRemains {
            step(respawn, Arc::downgrade(&conn));
        }
    });
}

impl EventHooks for EventBridge {
    fn watch_added(&self, watch: Arc<dyn BusWatch>) {
        // registration may arrive from outside the runtime
        let _rt = self.handle.enter();
        let fd = match AsyncFd::with_interest(
            WatchFd(watch.fd()),
            Interest::READABLE | Interest::WRITABLE,
        ) {
            Ok(fd) => Arc::new(fd),
            Err(e) => {
                error!(id = watch.id(), fd = watch.fd(), error = %e, "failed to register descriptor");
                return;
            }
        };
        debug!(id = watch.id(), fd = watch.fd(), "watch added");
        let mut entry = WatchEntry {
            watch,
            fd,
            read_task: None,
            write_task: None,
        };
        self.arm_watch(&mut entry);
        self.watches.lock().insert(entry.watch.id(), entry);
    }

    fn watch_removed(&self, id: WatchId) {
        if let Some(mut entry) = self.watches.lock().remove(&id) {
            debug!(id, "watch removed");
            entry.cancel();
        }
    }

    fn watch_toggled(&self, watch: Arc<dyn BusWatch>) {
        let _rt = self.handle.enter();
        let mut watches = self.watches.lock();
        if let Some(entry) = watches.get_mut(&watch.id()) {
            debug!(id = watch.id(), enabled = watch.enabled(), "watch toggled");
            self.arm_watch(entry);
        }
    }

    fn timeout_added(&self, timeout: Arc<dyn BusTimeout>) {
        let _rt = self.handle.enter();
        debug!(id = timeout.id(), interval = ?timeout.interval(), "timeout added");
        let mut entry = TimerEntry {
            timeout,
            task: None,
        };
        self.arm_timeout(&mut entry);
        self.timeouts.lock().insert(entry.timeout.id(), entry);
    }

    fn timeout_removed(&self, id: TimeoutId) {
        if let Some(mut entry) = self.timeouts.lock().remove(&id) {
            debug!(id, "timeout removed");
            entry.cancel();
        }
    }

    fn timeout_toggled(&self, timeout: Arc<dyn BusTimeout>) {
        let _rt = self.handle.enter();
        let mut timeouts = self.timeouts.lock();
        if let Some(entry) = timeouts.get_mut(&timeout.id()) {
            debug!(id = timeout.id(), enabled = timeout.enabled(), "timeout toggled");
            self.arm_timeout(entry);
        }
    }

    fn dispatch_status_changed(&self, status: DispatchStatus) {
        if status == DispatchStatus::DataRemains {
            self.drain();
        }
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        for entry in self.watches.lock().values_mut() {
            entry.cancel();
        }
        for entry in self.timeouts.lock().values_mut() {
            entry.cancel();
        }
    }
}
