//! # Bus Element Model
//!
//! ## Purpose
//!
//! Pure data layer for the async bus stack: the wire type-code table,
//! the element newtypes that carry their own codes (object paths and
//! signatures), the closed variant alternative set, endpoint addressing,
//! and the type-signature deriver that maps a static Rust type to its
//! canonical wire signature.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → libs/codec → libs/bridge
//!     ↑             ↓            ↓
//! Pure Data    Pack/Unpack   Event Bridge
//! TypeCode     Cursors       Queue/Connection
//! BusType      Message       Watch/Timeout
//! ```
//!
//! ## What This Crate Contains
//! - `TypeCode`: fixed single-byte code table mirroring the bus wire format
//! - `ObjectPath`, `Signature`, `Variant`: element value types
//! - `Endpoint`: bus addressing record (destination, path, interface)
//! - `BusType`: compile-time-checked signature derivation
//!
//! ## What This Crate Does NOT Contain
//! - Cursor or message handling (belongs in libs/codec)
//! - Runtime or transport logic (belongs in libs/bridge)

pub mod element;
pub mod endpoint;
pub mod signature;

pub use element::{ObjectPath, Signature, TypeCode, Variant};
pub use endpoint::Endpoint;
pub use signature::BusType;
