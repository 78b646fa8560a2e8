//! Message packing
//!
//! Serializes a left-to-right typed argument list into a message body.
//! Scalars write directly through the basic-append primitive keyed by their
//! type code; containers open a nested cursor tagged with their derived
//! element signature, pack each element recursively, then close. Any element
//! failure aborts the container without attempting recovery — the cursor is
//! left in the documented partial state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::cursor::{AppendCursor, Basic};
use crate::error::CodecResult;
use types::{BusType, ObjectPath, Signature, TypeCode, Variant};

/// A value that can be appended to a message.
pub trait Pack {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()>;
}

/// Argument-list builder over a message's append cursor.
///
/// `packer.arg(&a)?.arg(&b)?` — the first failure stops the chain.
pub struct Packer<'m> {
    cur: Box<dyn AppendCursor + 'm>,
}

impl<'m> Packer<'m> {
    pub(crate) fn new(cur: Box<dyn AppendCursor + 'm>) -> Self {
        Packer { cur }
    }

    pub fn arg<T: Pack + ?Sized>(&mut self, value: &T) -> CodecResult<&mut Self> {
        value.pack_into(&mut *self.cur)?;
        Ok(self)
    }
}

// the cursor is opaque; only the builder's presence is printable
impl fmt::Debug for Packer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packer").finish_non_exhaustive()
    }
}

macro_rules! pack_basic {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Pack for $ty {
                fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
                    cur.append_basic(<$ty as BusType>::CODE, Basic::$variant(*self))
                }
            }
        )*
    };
}

pack_basic! {
    u8 => Byte,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
}

impl Pack for bool {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        // Booleans are a fixed-width integer on the wire; the host bool
        // width is not assumed to match.
        cur.append_basic(TypeCode::Boolean, Basic::U32(u32::from(*self)))
    }
}

impl Pack for str {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        cur.append_basic(TypeCode::String, Basic::Str(self.to_owned()))
    }
}

impl Pack for String {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        self.as_str().pack_into(cur)
    }
}

impl Pack for ObjectPath {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        cur.append_basic(TypeCode::ObjectPath, Basic::Str(self.0.clone()))
    }
}

impl Pack for Signature {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        cur.append_basic(TypeCode::Signature, Basic::Str(self.0.clone()))
    }
}

impl<T: Pack + ?Sized> Pack for &T {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        (**self).pack_into(cur)
    }
}

impl<T: Pack + ?Sized> Pack for Box<T> {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        (**self).pack_into(cur)
    }
}

fn pack_sequence<T: Pack + BusType>(
    items: &[T],
    cur: &mut dyn AppendCursor,
) -> CodecResult<()> {
    let contained = T::signature();
    cur.open_container(TypeCode::Array, Some(&contained))?;
    for item in items {
        // element failure aborts the container, no recovery attempted
        item.pack_into(cur)?;
    }
    cur.close_container()
}

impl<T: Pack + BusType> Pack for [T] {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        pack_sequence(self, cur)
    }
}

impl<T: Pack + BusType> Pack for Vec<T> {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        pack_sequence(self, cur)
    }
}

// A pair packs as a dict entry: a fixed two-slot container, so the cursor
// needs no signature argument.
impl<K: Pack, V: Pack> Pack for (K, V) {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        cur.open_container(TypeCode::DictEntry, None)?;
        self.0.pack_into(cur)?;
        self.1.pack_into(cur)?;
        cur.close_container()
    }
}

macro_rules! pack_map {
    ($($map:ident),* $(,)?) => {
        $(
            impl<K: Pack + BusType, V: Pack + BusType> Pack for $map<K, V> {
                fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
                    let contained = <(K, V)>::signature();
                    cur.open_container(TypeCode::Array, Some(&contained))?;
                    for (key, value) in self {
                        cur.open_container(TypeCode::DictEntry, None)?;
                        key.pack_into(cur)?;
                        value.pack_into(cur)?;
                        cur.close_container()?;
                    }
                    cur.close_container()
                }
            }
        )*
    };
}

pack_map!(HashMap, BTreeMap);

impl Pack for Variant {
    fn pack_into(&self, cur: &mut dyn AppendCursor) -> CodecResult<()> {
        let contained = Signature::new(self.inner_code().as_char().to_string());
        cur.open_container(TypeCode::Variant, Some(&contained))?;
        // exhaustive over the closed alternative set: a new alternative
        // will not compile until packed here
        match self {
            Variant::String(v) => v.pack_into(cur)?,
            Variant::Bool(v) => v.pack_into(cur)?,
            Variant::Byte(v) => v.pack_into(cur)?,
            Variant::Int16(v) => v.pack_into(cur)?,
            Variant::UInt16(v) => v.pack_into(cur)?,
            Variant::Int32(v) => v.pack_into(cur)?,
            Variant::UInt32(v) => v.pack_into(cur)?,
            Variant::Int64(v) => v.pack_into(cur)?,
            Variant::UInt64(v) => v.pack_into(cur)?,
            Variant::Double(v) => v.pack_into(cur)?,
        }
        cur.close_container()
    }
}
