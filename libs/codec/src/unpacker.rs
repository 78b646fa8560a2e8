//! Message unpacking
//!
//! Mirrors the packer over a read cursor. Every target first compares the
//! cursor's current type code against the statically expected one; a
//! mismatch fails without consuming, a match reads and advances. Unpacking
//! is strictly forward and single-pass. A failed sequence or map unpack
//! leaves a partially populated output — documented, not hidden.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::cursor::{Basic, ReadCursor};
use crate::error::{CodecError, CodecResult};
use types::{BusType, ObjectPath, Signature, TypeCode, Variant};

/// A value that can be read out of a message.
pub trait Unpack {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()>;
}

/// Argument-list reader over a message's read cursor.
///
/// `unpacker.arg(&mut a)?.arg(&mut b)?` — stops at the first mismatched or
/// failing argument, leaving that argument's cursor position unconsumed.
pub struct Unpacker<'m> {
    cur: Box<dyn ReadCursor + 'm>,
}

impl<'m> Unpacker<'m> {
    pub(crate) fn new(cur: Box<dyn ReadCursor + 'm>) -> Self {
        Unpacker { cur }
    }

    pub fn arg<T: Unpack>(&mut self, value: &mut T) -> CodecResult<&mut Self> {
        value.unpack_from(&mut *self.cur)?;
        Ok(self)
    }
}

impl fmt::Debug for Unpacker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unpacker")
            .field("at", &self.cur.arg_type())
            .finish_non_exhaustive()
    }
}

fn expect_code(cur: &dyn ReadCursor, expected: TypeCode) -> CodecResult<()> {
    let found = cur.arg_type();
    if found != expected {
        return Err(CodecError::TypeMismatch { expected, found });
    }
    Ok(())
}

macro_rules! unpack_basic {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Unpack for $ty {
                fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
                    expect_code(cur, <$ty as BusType>::CODE)?;
                    match cur.get_basic()? {
                        Basic::$variant(v) => *self = v,
                        _ => {
                            return Err(CodecError::CorruptCursor {
                                code: <$ty as BusType>::CODE,
                            })
                        }
                    }
                    // advancing past the last argument is fine; arg_type()
                    // reports Invalid from there on
                    cur.next();
                    Ok(())
                }
            }
        )*
    };
}

unpack_basic! {
    u8 => Byte,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
}

impl Unpack for bool {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
        expect_code(cur, TypeCode::Boolean)?;
        match cur.get_basic()? {
            // wire representation is a fixed-width integer
            Basic::U32(v) => *self = v != 0,
            _ => return Err(CodecError::CorruptCursor { code: TypeCode::Boolean }),
        }
        cur.next();
        Ok(())
    }
}

fn unpack_text(cur: &mut dyn ReadCursor, code: TypeCode) -> CodecResult<String> {
    expect_code(cur, code)?;
    match cur.get_basic()? {
        Basic::Str(v) => {
            cur.next();
            Ok(v)
        }
        _ => Err(CodecError::CorruptCursor { code }),
    }
}

impl Unpack for String {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
        *self = unpack_text(cur, TypeCode::String)?;
        Ok(())
    }
}

impl Unpack for ObjectPath {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
        self.0 = unpack_text(cur, TypeCode::ObjectPath)?;
        Ok(())
    }
}

impl Unpack for Signature {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
        self.0 = unpack_text(cur, TypeCode::Signature)?;
        Ok(())
    }
}

impl Unpack for Variant {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
        expect_code(cur, TypeCode::Variant)?;
        let result = {
            let mut sub = cur.recurse()?;
            unpack_variant_inner(&mut *sub)
        };
        // the outer cursor advances whether or not the inner type matched
        cur.next();
        *self = result?;
        Ok(())
    }
}

// Dispatch over the closed alternative set by the *actual* inner type code.
// An inner code outside the set is surfaced as a hard error rather than
// silently leaving the output at its default.
fn unpack_variant_inner(sub: &mut dyn ReadCursor) -> CodecResult<Variant> {
    macro_rules! alt {
        ($ty:ty, $variant:ident) => {{
            let mut value = <$ty>::default();
            value.unpack_from(sub)?;
            Variant::$variant(value)
        }};
    }

    Ok(match sub.arg_type() {
        TypeCode::String => alt!(String, String),
        TypeCode::Boolean => alt!(bool, Bool),
        TypeCode::Byte => alt!(u8, Byte),
        TypeCode::Int16 => alt!(i16, Int16),
        TypeCode::UInt16 => alt!(u16, UInt16),
        TypeCode::Int32 => alt!(i32, Int32),
        TypeCode::UInt32 => alt!(u32, UInt32),
        TypeCode::Int64 => alt!(i64, Int64),
        TypeCode::UInt64 => alt!(u64, UInt64),
        TypeCode::Double => alt!(f64, Double),
        found => {
            tracing::debug!(code = %found, "variant holds a type outside the alternative set");
            return Err(CodecError::UnsupportedVariant { found });
        }
    })
}

impl<K: Unpack, V: Unpack> Unpack for (K, V) {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
        // the raw dict-entry code, distinct from the '{' used when the
        // entry's signature is composed
        expect_code(cur, TypeCode::DictEntry)?;
        {
            let mut sub = cur.recurse()?;
            self.0.unpack_from(&mut *sub)?;
            self.1.unpack_from(&mut *sub)?;
        }
        cur.next();
        Ok(())
    }
}

impl<T: Unpack + Default> Unpack for Vec<T> {
    fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
        expect_code(cur, TypeCode::Array)?;
        {
            let mut sub = cur.recurse()?;
            while sub.arg_type() != TypeCode::Invalid {
                // append-then-fill: on a mid-loop failure the elements
                // appended so far stay visible (documented partial result)
                self.push(T::default());
                if let Some(slot) = self.last_mut() {
                    slot.unpack_from(&mut *sub)?;
                }
            }
        }
        cur.next();
        Ok(())
    }
}

macro_rules! unpack_map {
    ($map:ident, $($bound:tt)+) => {
        impl<K: Unpack + Default + $($bound)+, V: Unpack + Default> Unpack for $map<K, V> {
            fn unpack_from(&mut self, cur: &mut dyn ReadCursor) -> CodecResult<()> {
                expect_code(cur, TypeCode::Array)?;
                {
                    let mut sub = cur.recurse()?;
                    while sub.arg_type() != TypeCode::Invalid {
                        // unpack into a temporary pair, insert by move;
                        // entries inserted so far survive a later failure
                        let mut entry = (K::default(), V::default());
                        entry.unpack_from(&mut *sub)?;
                        self.insert(entry.0, entry.1);
                    }
                }
                cur.next();
                Ok(())
            }
        }
    };
}

unpack_map!(HashMap, Eq + Hash);
unpack_map!(BTreeMap, Ord);
