//! Match rules
//!
//! A match rule names the messages a subscriber wants: optional kind,
//! path, interface, member, and sender. The same rule serves two jobs —
//! rendered as the bus's `key='value'` string for registration, and
//! evaluated locally to route delivered messages to the right queue.

use std::fmt;

use codec::{Message, MessageKind};
use types::ObjectPath;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchRule {
    kind: Option<MessageKind>,
    path: Option<ObjectPath>,
    interface: Option<String>,
    member: Option<String>,
    sender: Option<String>,
}

impl MatchRule {
    /// Rule matching signals only; narrow it with the `with_*` builders.
    pub fn signal() -> Self {
        MatchRule {
            kind: Some(MessageKind::Signal),
            ..MatchRule::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<ObjectPath>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Render the bus registration string, e.g.
    /// `type='signal',interface='org.example.Svc',member='Changed'`.
    pub fn to_match_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(kind) = self.kind {
            parts.push(format!("type='{kind}'"));
        }
        if let Some(path) = &self.path {
            parts.push(format!("path='{path}'"));
        }
        if let Some(interface) = &self.interface {
            parts.push(format!("interface='{interface}'"));
        }
        if let Some(member) = &self.member {
            parts.push(format!("member='{member}'"));
        }
        if let Some(sender) = &self.sender {
            parts.push(format!("sender='{sender}'"));
        }
        parts.join(",")
    }

    /// Whether `message` satisfies every constraint the rule carries.
    /// Unset fields match anything.
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(kind) = self.kind {
            if message.kind() != kind {
                return false;
            }
        }
        if let Some(path) = &self.path {
            if message.path().as_deref() != Some(path.as_str()) {
                return false;
            }
        }
        if let Some(interface) = &self.interface {
            if message.interface().as_deref() != Some(interface.as_str()) {
                return false;
            }
        }
        if let Some(member) = &self.member {
            if message.member().as_deref() != Some(member.as_str()) {
                return false;
            }
        }
        if let Some(sender) = &self.sender {
            if message.sender().as_deref() != Some(sender.as_str()) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_match_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::mem::MemBody;

    #[test]
    fn match_string_renders_set_fields_in_order() {
        let rule = MatchRule::signal()
            .with_interface("org.example.Svc")
            .with_member("Changed");
        assert_eq!(
            rule.to_match_string(),
            "type='signal',interface='org.example.Svc',member='Changed'"
        );
    }

    #[test]
    fn rule_filters_by_interface_and_member() {
        let rule = MatchRule::signal()
            .with_interface("org.example.Svc")
            .with_member("Changed");

        let hit = MemBody::signal(&ObjectPath::new("/x"), "org.example.Svc", "Changed");
        let wrong_member = MemBody::signal(&ObjectPath::new("/x"), "org.example.Svc", "Added");
        let wrong_iface = MemBody::signal(&ObjectPath::new("/x"), "org.other.Svc", "Changed");

        assert!(rule.matches(&hit));
        assert!(!rule.matches(&wrong_member));
        assert!(!rule.matches(&wrong_iface));
    }

    #[test]
    fn unset_fields_match_anything() {
        let rule = MatchRule::signal();
        let msg = MemBody::signal(&ObjectPath::new("/x"), "a.b", "C");
        assert!(rule.matches(&msg));
    }
}
