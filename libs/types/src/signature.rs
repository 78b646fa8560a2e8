//! Type-signature derivation
//!
//! Maps a static Rust type to its canonical wire signature. Basic elements
//! map 1:1 onto the fixed code table; containers compose by concatenation:
//! an array is `a` + element signature, a dict entry is `{` + key + value +
//! `}` and is only meaningful inside an array. Unsupported types have no
//! `BusType` impl and fail at compile time rather than deriving a wrong or
//! empty signature.
//!
//! Derivation is a pure function of the type: repeated evaluation always
//! yields the same string. Stable Rust cannot concatenate const strings
//! across generic types, so composition happens in `write_signature`
//! instead of a const item; the per-type `CODE` stays const.

use std::collections::{BTreeMap, HashMap};

use crate::element::{ObjectPath, Signature, TypeCode, Variant};

/// A type with a wire representation.
///
/// `CODE` is the outermost type code (`a` for every array-shaped type);
/// `write_signature` appends the full composite signature.
pub trait BusType {
    const CODE: TypeCode;

    fn write_signature(out: &mut String);

    /// The full derived signature for this type.
    fn signature() -> Signature {
        let mut out = String::new();
        Self::write_signature(&mut out);
        Signature(out)
    }
}

macro_rules! basic_bus_type {
    ($($ty:ty => $code:expr),* $(,)?) => {
        $(
            impl BusType for $ty {
                const CODE: TypeCode = $code;

                fn write_signature(out: &mut String) {
                    out.push(Self::CODE.as_char());
                }
            }
        )*
    };
}

basic_bus_type! {
    bool => TypeCode::Boolean,
    u8 => TypeCode::Byte,
    i16 => TypeCode::Int16,
    u16 => TypeCode::UInt16,
    i32 => TypeCode::Int32,
    u32 => TypeCode::UInt32,
    i64 => TypeCode::Int64,
    u64 => TypeCode::UInt64,
    f64 => TypeCode::Double,
    String => TypeCode::String,
    str => TypeCode::String,
    ObjectPath => TypeCode::ObjectPath,
    Signature => TypeCode::Signature,
    Variant => TypeCode::Variant,
}

// Reference and box indirection delegate transparently to the pointee.
impl<T: BusType + ?Sized> BusType for &T {
    const CODE: TypeCode = T::CODE;

    fn write_signature(out: &mut String) {
        T::write_signature(out);
    }
}

impl<T: BusType + ?Sized> BusType for Box<T> {
    const CODE: TypeCode = T::CODE;

    fn write_signature(out: &mut String) {
        T::write_signature(out);
    }
}

impl<T: BusType> BusType for Vec<T> {
    const CODE: TypeCode = TypeCode::Array;

    fn write_signature(out: &mut String) {
        out.push(TypeCode::Array.as_char());
        T::write_signature(out);
    }
}

impl<T: BusType> BusType for [T] {
    const CODE: TypeCode = TypeCode::Array;

    fn write_signature(out: &mut String) {
        out.push(TypeCode::Array.as_char());
        T::write_signature(out);
    }
}

// A pair is a dict entry. Its signature uses the `{`/`}` spelling; the raw
// `e` code only ever shows up on a read cursor.
impl<K: BusType, V: BusType> BusType for (K, V) {
    const CODE: TypeCode = TypeCode::DictEntry;

    fn write_signature(out: &mut String) {
        out.push('{');
        K::write_signature(out);
        V::write_signature(out);
        out.push('}');
    }
}

macro_rules! map_bus_type {
    ($($map:ident),* $(,)?) => {
        $(
            impl<K: BusType, V: BusType> BusType for $map<K, V> {
                const CODE: TypeCode = TypeCode::Array;

                fn write_signature(out: &mut String) {
                    out.push(TypeCode::Array.as_char());
                    <(K, V)>::write_signature(out);
                }
            }
        )*
    };
}

map_bus_type!(HashMap, BTreeMap);
