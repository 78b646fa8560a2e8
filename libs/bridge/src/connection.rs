//! Connection
//!
//! Composes the raw bus surface, the event bridge, and per-call message
//! queues into the async API: awaitable method calls with reply timeout,
//! and signal subscription streams.
//!
//! Reply routing keys on the call's serial. Because the dispatch
//! trampoline runs on its own tasks, a reply can arrive before the calling
//! task has registered its queue; such replies are stashed by serial and
//! claimed when registration catches up. Both maps are always taken in
//! replies-then-orphans order.

use std::collections::HashMap;
use std::sync::Arc;

use codec::{Message, MessageKind};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};
use types::Endpoint;

use crate::bridge::EventBridge;
use crate::bus::RawConnection;
use crate::config::ConnectionConfig;
use crate::error::{BusError, CallError};
use crate::matchrule::MatchRule;
use crate::queue::MessageQueue;

struct SignalSub {
    rule: MatchRule,
    queue: Arc<MessageQueue<Message>>,
}

type ReplyMap = Mutex<HashMap<u32, Arc<MessageQueue<Message>>>>;
type OrphanMap = Mutex<HashMap<u32, Message>>;

/// An async connection over a [`RawConnection`].
pub struct Connection {
    raw: Arc<dyn RawConnection>,
    // keeps the watch/timeout tasks alive for the connection's lifetime
    _bridge: Arc<EventBridge>,
    config: ConnectionConfig,
    replies: Arc<ReplyMap>,
    orphans: Arc<OrphanMap>,
    signals: Arc<Mutex<Vec<SignalSub>>>,
}

impl Connection {
    /// Attach to `raw`, driving its events on `handle`.
    pub fn new(raw: Arc<dyn RawConnection>, handle: Handle, config: ConnectionConfig) -> Arc<Self> {
        let replies: Arc<ReplyMap> = Arc::new(Mutex::new(HashMap::new()));
        let orphans: Arc<OrphanMap> = Arc::new(Mutex::new(HashMap::new()));
        let signals: Arc<Mutex<Vec<SignalSub>>> = Arc::new(Mutex::new(Vec::new()));

        {
            let replies = replies.clone();
            let orphans = orphans.clone();
            let signals = signals.clone();
            raw.set_message_handler(Box::new(move |message| {
                route(&replies, &orphans, &signals, message);
            }));
        }

        let bridge = EventBridge::install(&raw, handle);
        Arc::new(Connection {
            raw,
            _bridge: bridge,
            config,
            replies,
            orphans,
            signals,
        })
    }

    /// Allocate a method-call message addressed per `endpoint`.
    pub fn new_method_call(&self, endpoint: &Endpoint, member: &str) -> Message {
        self.raw.new_method_call(endpoint, member)
    }

    /// Send without expecting a reply. Returns the assigned serial.
    pub fn send(&self, message: &Message) -> Result<u32, BusError> {
        self.raw.send(message)
    }

    /// Send `message` and await its reply.
    ///
    /// An error reply resolves as [`CallError::ErrorReply`]; no reply
    /// within the configured window resolves as [`CallError::ReplyTimeout`].
    pub async fn method_call(&self, message: &Message) -> Result<Message, CallError> {
        let serial = self.raw.send(message)?;
        trace!(serial, "method call sent");

        let queue = {
            let mut replies = self.replies.lock();
            let mut orphans = self.orphans.lock();
            if let Some(early) = orphans.remove(&serial) {
                debug!(serial, "reply arrived before registration");
                return finish_call(early);
            }
            let queue = Arc::new(MessageQueue::new());
            replies.insert(serial, queue.clone());
            queue
        };

        match tokio::time::timeout(self.config.reply_timeout, queue.next()).await {
            Ok(reply) => finish_call(reply?),
            Err(_) => {
                self.replies.lock().remove(&serial);
                // the reply may have slipped into the stash while timing out
                if let Some(late) = self.orphans.lock().remove(&serial) {
                    return finish_call(late);
                }
                warn!(serial, timeout = ?self.config.reply_timeout, "method call timed out");
                Err(CallError::ReplyTimeout(self.config.reply_timeout))
            }
        }
    }

    /// Subscribe to messages matching `rule`. The returned queue receives
    /// every matching delivery in arrival order.
    pub fn subscribe(&self, rule: MatchRule) -> Result<Arc<MessageQueue<Message>>, BusError> {
        self.raw.add_match(&rule)?;
        let queue = Arc::new(MessageQueue::new());
        self.signals.lock().push(SignalSub {
            rule,
            queue: queue.clone(),
        });
        Ok(queue)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for queue in self.replies.lock().values() {
            queue.close();
        }
        for sub in self.signals.lock().iter() {
            sub.queue.close();
        }
    }
}

fn route(
    replies: &ReplyMap,
    orphans: &OrphanMap,
    signals: &Mutex<Vec<SignalSub>>,
    message: Message,
) {
    match message.kind() {
        MessageKind::MethodReturn | MessageKind::Error => {
            let serial = message.reply_serial();
            let mut replies = replies.lock();
            match replies.remove(&serial) {
                Some(queue) => {
                    drop(replies);
                    queue.push(message);
                }
                None => {
                    orphans.lock().insert(serial, message);
                }
            }
        }
        MessageKind::Signal => {
            let subs = signals.lock();
            let mut delivered = 0usize;
            for sub in subs.iter() {
                if sub.rule.matches(&message) {
                    sub.queue.push(message.clone());
                    delivered += 1;
                }
            }
            if delivered == 0 {
                trace!(%message, "signal with no subscriber");
            }
        }
        MessageKind::MethodCall => {
            // no object export on this surface
            debug!(%message, "unhandled inbound method call");
        }
    }
}

fn finish_call(reply: Message) -> Result<Message, CallError> {
    if reply.kind() == MessageKind::Error {
        let name = reply
            .error_name()
            .unwrap_or_else(|| "org.freedesktop.DBus.Error.Failed".to_owned());
        let mut text = String::new();
        if reply.unpack(&mut text).is_err() {
            text.clear();
        }
        return Err(CallError::ErrorReply {
            name,
            message: text,
        });
    }
    Ok(reply)
}
