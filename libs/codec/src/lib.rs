//! # Bus Message Codec
//!
//! ## Purpose
//!
//! Typed packing and unpacking of bus messages. The codec walks a
//! left-to-right argument list against a message's append or read cursor,
//! deriving container signatures from the static types involved. The wire
//! byte-layout itself is owned by the underlying bus library; this crate
//! only drives it through a small cursor seam.
//!
//! ## Integration Points
//!
//! - **Cursor Seam**: [`AppendCursor`]/[`ReadCursor`] model the foreign
//!   cursor API (open/close container, append-basic, get-basic,
//!   get-arg-type, recurse, advance)
//! - **Message Handle**: [`Message`] is a shared-ownership handle over an
//!   opaque message body; cloning tracks the longest-lived holder
//! - **Marshaling**: [`Pack`]/[`Unpack`] recurse through nested containers,
//!   short-circuiting on the first failing argument
//! - **In-Memory Body**: [`mem::MemBody`] implements the seam over a value
//!   tree for the loopback transport and the test suites
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/bridge
//!     ↑           ↓           ↓
//! Signatures  Pack/Unpack  Queue/Bridge
//! TypeCode    Cursors      Connection
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Wire byte layout, alignment, endianness (bus library's job)
//! - Async runtime integration (belongs in libs/bridge)
//! - Service discovery or introspection

pub mod cursor;
pub mod error;
pub mod mem;
pub mod message;
pub mod packer;
pub mod unpacker;

pub use cursor::{AppendCursor, Basic, ReadCursor};
pub use error::{CodecError, CodecResult};
pub use message::{Message, MessageBody, MessageKind};
pub use packer::{Pack, Packer};
pub use unpacker::{Unpack, Unpacker};
