//! Loopback bus
//!
//! In-process [`RawConnection`] implementation: sent method calls are
//! answered by registered responders, signals loop straight back, and
//! delivery goes through the same queued-traffic/dispatch cycle a real bus
//! library uses. This is the harness the connection and end-to-end tests
//! run against.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use codec::mem::MemBody;
use codec::{CodecResult, Message, MessageKind};
use parking_lot::Mutex;
use tracing::{debug, warn};
use types::Endpoint;

use crate::bus::{DispatchStatus, EventHooks, RawConnection};
use crate::error::BusError;
use crate::matchrule::MatchRule;

/// Answers a method call. `Ok(None)` swallows the call without replying,
/// which is how reply-timeout behavior is exercised.
pub type Responder = dyn Fn(&Message) -> CodecResult<Option<Message>> + Send + Sync;

type Handler = Arc<dyn Fn(Message) + Send + Sync>;

struct LoopState {
    queued: VecDeque<Message>,
    handler: Option<Handler>,
    next_serial: u32,
    responders: HashMap<(String, String), Arc<Responder>>,
    matches: Vec<String>,
    connected: bool,
}

/// In-process bus for tests.
pub struct LoopbackBus {
    hooks: Mutex<Option<Arc<dyn EventHooks>>>,
    state: Mutex<LoopState>,
}

impl LoopbackBus {
    pub fn new() -> Arc<Self> {
        Arc::new(LoopbackBus {
            hooks: Mutex::new(None),
            state: Mutex::new(LoopState {
                queued: VecDeque::new(),
                handler: None,
                next_serial: 1,
                responders: HashMap::new(),
                matches: Vec::new(),
                connected: true,
            }),
        })
    }

    /// Register `responder` for calls to `interface.member`.
    pub fn respond_to<F>(&self, interface: &str, member: &str, responder: F)
    where
        F: Fn(&Message) -> CodecResult<Option<Message>> + Send + Sync + 'static,
    {
        self.state
            .lock()
            .responders
            .insert((interface.to_owned(), member.to_owned()), Arc::new(responder));
    }

    /// Deliver `signal` as inbound traffic, as if another peer emitted it.
    pub fn emit_signal(&self, signal: Message) {
        self.stamp(&signal);
        self.enqueue(signal);
    }

    /// Drop the bus side of the connection: later sends and match
    /// registrations fail with [`BusError::Disconnected`] /
    /// [`BusError::MatchFailed`].
    pub fn disconnect(&self) {
        self.state.lock().connected = false;
        debug!("loopback bus disconnected");
    }

    /// Match strings registered through [`RawConnection::add_match`].
    pub fn match_strings(&self) -> Vec<String> {
        self.state.lock().matches.clone()
    }

    /// Inbound messages queued but not yet dispatched.
    pub fn queued(&self) -> usize {
        self.state.lock().queued.len()
    }

    fn stamp(&self, message: &Message) -> u32 {
        let serial = {
            let mut state = self.state.lock();
            let serial = state.next_serial;
            state.next_serial += 1;
            serial
        };
        message.set_serial(serial);
        message.seal();
        serial
    }

    fn enqueue(&self, message: Message) {
        self.state.lock().queued.push_back(message);
        let hooks = self.hooks.lock().clone();
        if let Some(hooks) = hooks {
            hooks.dispatch_status_changed(DispatchStatus::DataRemains);
        }
    }

    fn answer_call(&self, call: &Message) {
        let key = (
            call.interface().unwrap_or_default(),
            call.member().unwrap_or_default(),
        );
        let responder = self.state.lock().responders.get(&key).cloned();
        let reply = match responder {
            Some(responder) => match responder(call) {
                Ok(Some(reply)) => reply,
                Ok(None) => {
                    debug!(%call, "responder swallowed call");
                    return;
                }
                Err(e) => match MemBody::error_reply(
                    call,
                    "org.freedesktop.DBus.Error.Failed",
                    &e.to_string(),
                ) {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(error = %e, "failed to build error reply");
                        return;
                    }
                },
            },
            None => {
                let text = format!("no responder for {}.{}", key.0, key.1);
                match MemBody::error_reply(call, "org.freedesktop.DBus.Error.UnknownMethod", &text)
                {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(error = %e, "failed to build error reply");
                        return;
                    }
                }
            }
        };
        self.stamp(&reply);
        self.enqueue(reply);
    }
}

impl RawConnection for LoopbackBus {
    fn install_event_hooks(&self, hooks: Arc<dyn EventHooks>) {
        *self.hooks.lock() = Some(hooks);
    }

    fn dispatch(&self) -> DispatchStatus {
        let (message, handler, status) = {
            let mut state = self.state.lock();
            let message = state.queued.pop_front();
            let status = if state.queued.is_empty() {
                DispatchStatus::Complete
            } else {
                DispatchStatus::DataRemains
            };
            (message, state.handler.clone(), status)
        };
        if let Some(message) = message {
            match handler {
                // handler runs outside the lock; it may call back in
                Some(handler) => handler(message),
                None => warn!(%message, "dispatched with no message handler"),
            }
        }
        status
    }

    fn dispatch_status(&self) -> DispatchStatus {
        if self.state.lock().queued.is_empty() {
            DispatchStatus::Complete
        } else {
            DispatchStatus::DataRemains
        }
    }

    fn send(&self, message: &Message) -> Result<u32, BusError> {
        if !self.state.lock().connected {
            return Err(BusError::Disconnected);
        }
        let serial = self.stamp(message);
        match message.kind() {
            MessageKind::MethodCall => self.answer_call(message),
            MessageKind::Signal => self.enqueue(message.clone()),
            MessageKind::MethodReturn | MessageKind::Error => self.enqueue(message.clone()),
        }
        Ok(serial)
    }

    fn new_method_call(&self, endpoint: &Endpoint, member: &str) -> Message {
        MemBody::method_call(endpoint, member)
    }

    fn add_match(&self, rule: &MatchRule) -> Result<(), BusError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(BusError::MatchFailed {
                rule: rule.to_match_string(),
                reason: "connection is closed".to_owned(),
            });
        }
        state.matches.push(rule.to_match_string());
        Ok(())
    }

    fn set_message_handler(&self, handler: Box<dyn Fn(Message) + Send + Sync>) {
        self.state.lock().handler = Some(Arc::from(handler));
    }
}
