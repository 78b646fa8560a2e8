//! Shared harness for the end-to-end suites: a connection wired over an
//! in-process loopback bus, driven by the current runtime.

use std::sync::Arc;

use bridge::{Connection, ConnectionConfig, LoopbackBus, RawConnection};
use tokio::runtime::Handle;

/// Build a [`Connection`] over a fresh [`LoopbackBus`].
///
/// Must be called from within a tokio runtime; the bridge spawns its tasks
/// on the caller's handle.
pub fn loopback_connection(config: ConnectionConfig) -> (Arc<LoopbackBus>, Arc<Connection>) {
    init_tracing();
    let bus = LoopbackBus::new();
    let raw: Arc<dyn RawConnection> = bus.clone();
    let conn = Connection::new(raw, Handle::current(), config);
    tracing::debug!("loopback connection ready");
    (bus, conn)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
