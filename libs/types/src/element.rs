//! Wire type codes and element value types
//!
//! Messages are composed of elements identified by unique single-byte type
//! codes. The code table here mirrors the underlying bus wire format; the
//! actual byte layout of each element is owned by the bus library and never
//! touched by this stack.

use std::fmt;

/// Single-byte wire type codes.
///
/// `Invalid` (0) doubles as the end-of-cursor marker: a read cursor reports
/// it once every argument has been consumed. `DictEntry` is the *raw* code
/// (`e`) seen on a read cursor; when composing signatures the entry is
/// spelled with `{`/`}` instead, which is why the two never mix.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Invalid = 0,
    Boolean = b'b',
    Byte = b'y',
    Int16 = b'n',
    UInt16 = b'q',
    Int32 = b'i',
    UInt32 = b'u',
    Int64 = b'x',
    UInt64 = b't',
    Double = b'd',
    String = b's',
    ObjectPath = b'o',
    Signature = b'g',
    Array = b'a',
    Variant = b'v',
    DictEntry = b'e',
}

impl TypeCode {
    /// The signature character for this code.
    pub const fn as_char(self) -> char {
        self as u8 as char
    }

    /// Look a code up from its signature character.
    pub fn from_char(c: char) -> Option<TypeCode> {
        Some(match c {
            'b' => TypeCode::Boolean,
            'y' => TypeCode::Byte,
            'n' => TypeCode::Int16,
            'q' => TypeCode::UInt16,
            'i' => TypeCode::Int32,
            'u' => TypeCode::UInt32,
            'x' => TypeCode::Int64,
            't' => TypeCode::UInt64,
            'd' => TypeCode::Double,
            's' => TypeCode::String,
            'o' => TypeCode::ObjectPath,
            'g' => TypeCode::Signature,
            'a' => TypeCode::Array,
            'v' => TypeCode::Variant,
            'e' => TypeCode::DictEntry,
            _ => return None,
        })
    }

    /// True for the fixed-width and string-like codes that can be carried
    /// by a single basic append/read primitive.
    pub const fn is_basic(self) -> bool {
        !matches!(
            self,
            TypeCode::Invalid | TypeCode::Array | TypeCode::Variant | TypeCode::DictEntry
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == TypeCode::Invalid {
            write!(f, "<invalid>")
        } else {
            write!(f, "{}", self.as_char())
        }
    }
}

/// An object path element. Carries its own type code (`o`) on the wire,
/// distinct from a plain string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectPath(pub String);

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Self {
        ObjectPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectPath {
    fn from(s: &str) -> Self {
        ObjectPath(s.to_owned())
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signature element: a string of type codes describing a value's shape.
/// Used both as a wire value (code `g`) and as the output of signature
/// derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature(pub String);

impl Signature {
    pub fn new(sig: impl Into<String>) -> Self {
        Signature(sig.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Signature {
    fn from(s: &str) -> Self {
        Signature(s.to_owned())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of alternatives a variant element may hold.
///
/// Matching on this enum is deliberately exhaustive everywhere it is
/// dispatched (signature derivation, packing, unpacking): adding an
/// alternative will not compile until every dispatch site handles it.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    String(String),
    Bool(bool),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
}

impl Variant {
    /// Type code of the held alternative.
    pub fn inner_code(&self) -> TypeCode {
        match self {
            Variant::String(_) => TypeCode::String,
            Variant::Bool(_) => TypeCode::Boolean,
            Variant::Byte(_) => TypeCode::Byte,
            Variant::Int16(_) => TypeCode::Int16,
            Variant::UInt16(_) => TypeCode::UInt16,
            Variant::Int32(_) => TypeCode::Int32,
            Variant::UInt32(_) => TypeCode::UInt32,
            Variant::Int64(_) => TypeCode::Int64,
            Variant::UInt64(_) => TypeCode::UInt64,
            Variant::Double(_) => TypeCode::Double,
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::UInt32(0)
    }
}
