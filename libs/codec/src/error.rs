//! Codec errors
//!
//! Marshaling failures never panic and never tear anything down: they leave
//! the cursor in the documented partial state and push recovery to the
//! caller. A type mismatch is detected by signature comparison before
//! anything is consumed, so it is always distinguishable from a
//! successfully-read falsy value.

use thiserror::Error;
use types::TypeCode;

/// Errors raised while packing or unpacking a message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// The cursor's current element does not have the expected type code.
    /// The element was not consumed.
    #[error("type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: TypeCode, found: TypeCode },

    /// A basic read/append primitive was used on a container element.
    #[error("element '{code}' is a container, not a basic value")]
    NotBasic { code: TypeCode },

    /// A container operation was used on a non-container element.
    #[error("element '{code}' is not a container")]
    NotContainer { code: TypeCode },

    /// `open_container` for an array or variant requires the contained
    /// signature.
    #[error("container '{code}' opened without a contained signature")]
    MissingSignature { code: TypeCode },

    /// `close_container` without a matching open.
    #[error("close_container without a matching open_container")]
    ContainerUnderflow,

    /// A dict entry must hold exactly a key and a value.
    #[error("dict entry closed with {len} elements, expected 2")]
    MalformedDictEntry { len: usize },

    /// A variant must hold exactly one value.
    #[error("variant closed with {len} elements, expected 1")]
    MalformedVariant { len: usize },

    /// The read cursor has no further elements.
    #[error("cursor is exhausted")]
    Exhausted,

    /// A variant held an inner type outside the closed alternative set.
    /// The outer cursor has already advanced past the variant.
    #[error("variant holds unsupported inner type '{found}'")]
    UnsupportedVariant { found: TypeCode },

    /// The cursor reported one type code but stored another storage class.
    /// Indicates a defective cursor implementation, not caller error.
    #[error("cursor storage does not match its reported code '{code}'")]
    CorruptCursor { code: TypeCode },

    /// The message buffer is sealed; packing completed and the buffer is
    /// immutable from here on.
    #[error("message is sealed; no further arguments can be appended")]
    Sealed,
}

pub type CodecResult<T> = Result<T, CodecError>;
