//! Message handle
//!
//! A [`Message`] is a cheap-to-clone shared handle over an opaque,
//! foreign-owned message body. The reference count tracks the longest-lived
//! holder among packer, unpacker, queue entry, and external collaborators;
//! the body is released when the last holder drops. Once packing completes
//! the buffer is sealed and all later readers see an immutable buffer.

use std::fmt;
use std::sync::Arc;

use crate::cursor::{AppendCursor, ReadCursor};
use crate::error::CodecResult;
use crate::packer::{Pack, Packer};
use crate::unpacker::{Unpack, Unpacker};
use types::TypeCode;

/// The four message categories the bus distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    MethodCall,
    MethodReturn,
    Error,
    Signal,
}

impl MessageKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::MethodCall => "method_call",
            MessageKind::MethodReturn => "method_return",
            MessageKind::Error => "error",
            MessageKind::Signal => "signal",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The foreign-owned message buffer behind a [`Message`].
///
/// Implemented by each transport; [`crate::mem::MemBody`] is the in-memory
/// reference implementation. Header fields are owned snapshots because the
/// underlying storage may be interior-locked.
pub trait MessageBody: Send + Sync {
    fn kind(&self) -> MessageKind;
    fn path(&self) -> Option<String>;
    fn interface(&self) -> Option<String>;
    fn member(&self) -> Option<String>;
    fn destination(&self) -> Option<String>;
    fn sender(&self) -> Option<String>;
    /// Error name, present on `Error` messages only.
    fn error_name(&self) -> Option<String>;
    fn serial(&self) -> u32;
    fn set_serial(&self, serial: u32);
    fn reply_serial(&self) -> u32;
    fn set_reply_serial(&self, serial: u32);

    /// Append cursor positioned after the last existing argument.
    /// Fails once the body is sealed.
    fn append(&self) -> CodecResult<Box<dyn AppendCursor + '_>>;

    /// Read cursor positioned at the first argument.
    fn read(&self) -> Box<dyn ReadCursor + '_>;

    /// Mark packing complete; the buffer is immutable from here on.
    fn seal(&self);
}

/// Shared-ownership handle over a message body.
#[derive(Clone)]
pub struct Message {
    body: Arc<dyn MessageBody>,
}

impl Message {
    pub fn from_body(body: Arc<dyn MessageBody>) -> Self {
        Message { body }
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn path(&self) -> Option<String> {
        self.body.path()
    }

    pub fn interface(&self) -> Option<String> {
        self.body.interface()
    }

    pub fn member(&self) -> Option<String> {
        self.body.member()
    }

    pub fn destination(&self) -> Option<String> {
        self.body.destination()
    }

    pub fn sender(&self) -> Option<String> {
        self.body.sender()
    }

    pub fn error_name(&self) -> Option<String> {
        self.body.error_name()
    }

    pub fn serial(&self) -> u32 {
        self.body.serial()
    }

    pub fn set_serial(&self, serial: u32) {
        self.body.set_serial(serial);
    }

    pub fn reply_serial(&self) -> u32 {
        self.body.reply_serial()
    }

    pub fn set_reply_serial(&self, serial: u32) {
        self.body.set_reply_serial(serial);
    }

    /// Seal the buffer; further appends fail with [`CodecError::Sealed`].
    ///
    /// [`CodecError::Sealed`]: crate::error::CodecError::Sealed
    pub fn seal(&self) {
        self.body.seal();
    }

    /// Start packing arguments: `msg.packer()?.arg(&a)?.arg(&b)?;`
    ///
    /// The first failing argument stops the chain; later arguments are not
    /// attempted.
    pub fn packer(&self) -> CodecResult<Packer<'_>> {
        Ok(Packer::new(self.body.append()?))
    }

    /// Pack a single value. Repeated calls append left to right.
    pub fn pack<T: Pack + ?Sized>(&self, value: &T) -> CodecResult<()> {
        self.packer()?.arg(value)?;
        Ok(())
    }

    /// Start unpacking arguments from the first one:
    /// `msg.unpacker().arg(&mut a)?.arg(&mut b)?;`
    ///
    /// A failing argument leaves its cursor position unconsumed and stops
    /// the chain.
    pub fn unpacker(&self) -> Unpacker<'_> {
        Unpacker::new(self.body.read())
    }

    /// Unpack the first argument into `value`.
    pub fn unpack<T: Unpack>(&self, value: &mut T) -> CodecResult<()> {
        self.unpacker().arg(value)?;
        Ok(())
    }

    /// Raw append cursor, for callers driving the container primitives
    /// themselves. Most code wants [`Message::packer`].
    pub fn append_cursor(&self) -> CodecResult<Box<dyn AppendCursor + '_>> {
        self.body.append()
    }

    /// Raw read cursor positioned at the first argument.
    pub fn read_cursor(&self) -> Box<dyn ReadCursor + '_> {
        self.body.read()
    }

    /// Number of top-level arguments in the body.
    pub fn args_num(&self) -> usize {
        let mut cur = self.body.read();
        let mut num = 0;
        while cur.arg_type() != TypeCode::Invalid {
            cur.next();
            num += 1;
        }
        num
    }
}

fn or_null(field: Option<String>) -> String {
    field.unwrap_or_else(|| "(null)".to_owned())
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type='{}',sender='{}',interface='{}',member='{}',path='{}',destination='{}'",
            self.kind(),
            or_null(self.sender()),
            or_null(self.interface()),
            or_null(self.member()),
            or_null(self.path()),
            or_null(self.destination()),
        )
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({self})")
    }
}
