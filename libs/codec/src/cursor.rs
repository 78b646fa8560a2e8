//! Cursor seam over the foreign message buffer
//!
//! The bus library owns the wire buffer and its byte layout; the codec only
//! moves a position marker through it. Two cursor flavors exist: append
//! (packing) and read (unpacking). Both are strictly stack-disciplined —
//! every opened nested container closes before the parent advances — and a
//! cursor is scoped to one pack/unpack call tree.

use crate::error::CodecResult;
use types::{Signature, TypeCode};

/// Storage classes a basic append/read primitive can carry.
///
/// This is the storage union, not the type table: several type codes share
/// a storage class. String-likes (string, object path, signature) all travel
/// as `Str`; booleans travel as the wire's fixed-width `U32` because the
/// host's boolean width is not assumed to match.
#[derive(Debug, Clone, PartialEq)]
pub enum Basic {
    Byte(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
}

/// Append-side cursor primitives.
///
/// `open_container` takes the *contained* signature: the element signature
/// for an array, the inner value's signature for a variant, and nothing for
/// a dict entry (fixed two-slot shape).
pub trait AppendCursor {
    /// Append one basic value under the given type code.
    fn append_basic(&mut self, code: TypeCode, value: Basic) -> CodecResult<()>;

    /// Open a nested container. All appends go into it until it closes.
    fn open_container(&mut self, code: TypeCode, contained: Option<&Signature>)
        -> CodecResult<()>;

    /// Close the innermost open container.
    fn close_container(&mut self) -> CodecResult<()>;
}

/// Read-side cursor primitives.
///
/// Exactly four operations: query the current type, read the current value,
/// advance, and recurse into a container. There is no backward movement;
/// unpacking is strictly forward, single-pass.
pub trait ReadCursor {
    /// Type code of the current element, or `Invalid` once exhausted.
    fn arg_type(&self) -> TypeCode;

    /// Read the current element as a basic value. Does not advance.
    fn get_basic(&self) -> CodecResult<Basic>;

    /// Advance to the next element. Returns whether the cursor still points
    /// at a valid element; callers past the last argument only ever see
    /// `arg_type() == Invalid`, so the return value is mostly ignored.
    fn next(&mut self) -> bool;

    /// Enter the current container element with a fresh sub-cursor. The
    /// outer cursor does not move; advance it after the sub-cursor is done.
    fn recurse(&self) -> CodecResult<Box<dyn ReadCursor + '_>>;
}
