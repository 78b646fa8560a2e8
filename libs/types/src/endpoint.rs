//! Bus endpoint addressing
//!
//! An endpoint names the peer side of a method call: the destination
//! service, the object path within it, the interface, and optionally a
//! default member. Connection bootstrap and name acquisition stay outside
//! this stack; the record is plain data.

use crate::element::ObjectPath;

/// Address of a remote object interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    destination: String,
    path: ObjectPath,
    interface: String,
    member: Option<String>,
}

impl Endpoint {
    pub fn new(
        destination: impl Into<String>,
        path: impl Into<ObjectPath>,
        interface: impl Into<String>,
    ) -> Self {
        Endpoint {
            destination: destination.into(),
            path: path.into(),
            interface: interface.into(),
            member: None,
        }
    }

    /// Attach a default member (method or signal name).
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }
}
