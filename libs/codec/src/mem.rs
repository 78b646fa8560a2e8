//! In-memory message body
//!
//! Reference implementation of the cursor seam over a structural value
//! tree. It backs the loopback transport and the test suites; it stores
//! elements, not wire bytes — byte layout stays the bus library's job.
//!
//! The append cursor takes the body's argument lock only for the instant a
//! completed top-level value is committed, so a reader opened while a
//! packer is still alive never blocks; it sees the values committed so
//! far. The read cursor works on a snapshot taken when it is created.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cursor::{AppendCursor, Basic, ReadCursor};
use crate::error::{CodecError, CodecResult};
use crate::message::{Message, MessageBody, MessageKind};
use types::{Endpoint, ObjectPath, Signature, TypeCode};

/// One element in the value tree.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Basic(TypeCode, Basic),
    Array {
        #[allow(dead_code)] // carried for parity with the wire container
        contained: Signature,
        items: Vec<Value>,
    },
    DictEntry(Vec<Value>),
    Variant {
        #[allow(dead_code)]
        contained: Signature,
        items: Vec<Value>,
    },
}

impl Value {
    fn code(&self) -> TypeCode {
        match self {
            Value::Basic(code, _) => *code,
            Value::Array { .. } => TypeCode::Array,
            Value::DictEntry(_) => TypeCode::DictEntry,
            Value::Variant { .. } => TypeCode::Variant,
        }
    }
}

/// In-memory message body.
pub struct MemBody {
    kind: MessageKind,
    path: Option<String>,
    interface: Option<String>,
    member: Option<String>,
    destination: Option<String>,
    sender: Option<String>,
    error_name: Option<String>,
    serial: AtomicU32,
    reply_serial: AtomicU32,
    sealed: AtomicBool,
    args: Mutex<Vec<Value>>,
}

impl MemBody {
    fn build(kind: MessageKind) -> MemBodyBuilder {
        MemBodyBuilder {
            body: MemBody {
                kind,
                path: None,
                interface: None,
                member: None,
                destination: None,
                sender: None,
                error_name: None,
                serial: AtomicU32::new(0),
                reply_serial: AtomicU32::new(0),
                sealed: AtomicBool::new(false),
                args: Mutex::new(Vec::new()),
            },
        }
    }

    /// A method call addressed to `endpoint`, invoking `member`.
    pub fn method_call(endpoint: &Endpoint, member: &str) -> Message {
        MemBody::build(MessageKind::MethodCall)
            .destination(endpoint.destination())
            .path(endpoint.path().as_str())
            .interface(endpoint.interface())
            .member(member)
            .finish()
    }

    /// A method return answering `call`.
    pub fn method_return(call: &Message) -> Message {
        let mut builder = MemBody::build(MessageKind::MethodReturn);
        if let Some(sender) = call.sender() {
            builder = builder.destination(&sender);
        }
        if let Some(destination) = call.destination() {
            builder = builder.sender(&destination);
        }
        let msg = builder.finish();
        msg.set_reply_serial(call.serial());
        msg
    }

    /// An error reply answering `call`, with the conventional human-readable
    /// text as the first argument.
    pub fn error_reply(call: &Message, name: &str, text: &str) -> CodecResult<Message> {
        let mut builder = MemBody::build(MessageKind::Error).error_name(name);
        if let Some(sender) = call.sender() {
            builder = builder.destination(&sender);
        }
        let msg = builder.finish();
        msg.set_reply_serial(call.serial());
        msg.pack(text)?;
        Ok(msg)
    }

    /// A signal emitted from `path` on `interface`.
    pub fn signal(path: &ObjectPath, interface: &str, member: &str) -> Message {
        MemBody::build(MessageKind::Signal)
            .path(path.as_str())
            .interface(interface)
            .member(member)
            .finish()
    }
}

struct MemBodyBuilder {
    body: MemBody,
}

impl MemBodyBuilder {
    fn path(mut self, path: &str) -> Self {
        self.body.path = Some(path.to_owned());
        self
    }

    fn interface(mut self, interface: &str) -> Self {
        self.body.interface = Some(interface.to_owned());
        self
    }

    fn member(mut self, member: &str) -> Self {
        self.body.member = Some(member.to_owned());
        self
    }

    fn destination(mut self, destination: &str) -> Self {
        self.body.destination = Some(destination.to_owned());
        self
    }

    fn sender(mut self, sender: &str) -> Self {
        self.body.sender = Some(sender.to_owned());
        self
    }

    fn error_name(mut self, name: &str) -> Self {
        self.body.error_name = Some(name.to_owned());
        self
    }

    fn finish(self) -> Message {
        Message::from_body(Arc::new(self.body))
    }
}

impl MessageBody for MemBody {
    fn kind(&self) -> MessageKind {
        self.kind
    }

    fn path(&self) -> Option<String> {
        self.path.clone()
    }

    fn interface(&self) -> Option<String> {
        self.interface.clone()
    }

    fn member(&self) -> Option<String> {
        self.member.clone()
    }

    fn destination(&self) -> Option<String> {
        self.destination.clone()
    }

    fn sender(&self) -> Option<String> {
        self.sender.clone()
    }

    fn error_name(&self) -> Option<String> {
        self.error_name.clone()
    }

    fn serial(&self) -> u32 {
        self.serial.load(Ordering::Acquire)
    }

    fn set_serial(&self, serial: u32) {
        self.serial.store(serial, Ordering::Release);
    }

    fn reply_serial(&self) -> u32 {
        self.reply_serial.load(Ordering::Acquire)
    }

    fn set_reply_serial(&self, serial: u32) {
        self.reply_serial.store(serial, Ordering::Release);
    }

    fn append(&self) -> CodecResult<Box<dyn AppendCursor + '_>> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(CodecError::Sealed);
        }
        Ok(Box::new(MemAppend {
            args: &self.args,
            stack: Vec::new(),
        }))
    }

    fn read(&self) -> Box<dyn ReadCursor + '_> {
        let snapshot = Arc::new(self.args.lock().clone());
        Box::new(MemRead {
            items: snapshot,
            pos: 0,
        })
    }

    fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }
}

/// A container opened but not yet closed.
struct Pending {
    code: TypeCode,
    contained: Signature,
    items: Vec<Value>,
}

/// Append cursor. Nested container contents accumulate locally and reach
/// the shared argument list only as completed top-level values, under a
/// momentary lock, so concurrent readers are never blocked on a live
/// cursor.
struct MemAppend<'a> {
    args: &'a Mutex<Vec<Value>>,
    stack: Vec<Pending>,
}

impl MemAppend<'_> {
    fn push_value(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(top) => top.items.push(value),
            None => self.args.lock().push(value),
        }
    }
}

impl AppendCursor for MemAppend<'_> {
    fn append_basic(&mut self, code: TypeCode, value: Basic) -> CodecResult<()> {
        if !code.is_basic() {
            return Err(CodecError::NotBasic { code });
        }
        self.push_value(Value::Basic(code, value));
        Ok(())
    }

    fn open_container(
        &mut self,
        code: TypeCode,
        contained: Option<&Signature>,
    ) -> CodecResult<()> {
        let contained = match (code, contained) {
            (TypeCode::Array | TypeCode::Variant, Some(sig)) => sig.clone(),
            (TypeCode::Array | TypeCode::Variant, None) => {
                return Err(CodecError::MissingSignature { code })
            }
            (TypeCode::DictEntry, _) => Signature::default(),
            _ => return Err(CodecError::NotContainer { code }),
        };
        self.stack.push(Pending {
            code,
            contained,
            items: Vec::new(),
        });
        Ok(())
    }

    fn close_container(&mut self) -> CodecResult<()> {
        let pending = self.stack.pop().ok_or(CodecError::ContainerUnderflow)?;
        let value = match pending.code {
            TypeCode::Array => Value::Array {
                contained: pending.contained,
                items: pending.items,
            },
            TypeCode::DictEntry => {
                if pending.items.len() != 2 {
                    return Err(CodecError::MalformedDictEntry {
                        len: pending.items.len(),
                    });
                }
                Value::DictEntry(pending.items)
            }
            TypeCode::Variant => {
                if pending.items.len() != 1 {
                    return Err(CodecError::MalformedVariant {
                        len: pending.items.len(),
                    });
                }
                Value::Variant {
                    contained: pending.contained,
                    items: pending.items,
                }
            }
            code => return Err(CodecError::NotContainer { code }),
        };
        self.push_value(value);
        Ok(())
    }
}

/// Read cursor over a snapshot of the value tree. Forward-only.
struct MemRead {
    items: Arc<Vec<Value>>,
    pos: usize,
}

impl ReadCursor for MemRead {
    fn arg_type(&self) -> TypeCode {
        self.items
            .get(self.pos)
            .map(Value::code)
            .unwrap_or(TypeCode::Invalid)
    }

    fn get_basic(&self) -> CodecResult<Basic> {
        match self.items.get(self.pos) {
            Some(Value::Basic(_, value)) => Ok(value.clone()),
            Some(other) => Err(CodecError::NotBasic { code: other.code() }),
            None => Err(CodecError::Exhausted),
        }
    }

    fn next(&mut self) -> bool {
        if self.pos < self.items.len() {
            self.pos += 1;
        }
        self.pos < self.items.len()
    }

    fn recurse(&self) -> CodecResult<Box<dyn ReadCursor + '_>> {
        match self.items.get(self.pos) {
            Some(Value::Array { items, .. })
            | Some(Value::DictEntry(items))
            | Some(Value::Variant { items, .. }) => Ok(Box::new(MemRead {
                items: Arc::new(items.clone()),
                pos: 0,
            })),
            Some(other) => Err(CodecError::NotContainer { code: other.code() }),
            None => Err(CodecError::Exhausted),
        }
    }
}
