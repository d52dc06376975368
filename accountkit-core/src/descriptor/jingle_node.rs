use super::non_blank;
use crate::codec::{field_key, IndexedDescriptor};
use crate::error::{AccountError, AccountResult};
use crate::properties::AccountProperties;

/// Prefix of the Jingle Nodes relay list.
pub const JN_PREFIX: &str = "JINGLE_NODES";
/// Upper bound on stored Jingle Nodes.
pub const MAX_JN_RELAY_COUNT: usize = 100;

const ADDRESS: &str = "ADDRESS";
const IS_RELAY_SUPPORTED: &str = "IS_RELAY_SUPPORTED";

/// A Jingle Nodes tracker or relay, addressed by JID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JingleNodeDescriptor {
    jid: String,
    relay_supported: bool,
}

impl JingleNodeDescriptor {
    /// Creates a node entry.
    pub fn new(jid: impl Into<String>, relay_supported: bool) -> Self {
        Self {
            jid: jid.into(),
            relay_supported,
        }
    }

    /// JID of the node.
    #[must_use]
    pub fn jid(&self) -> &str {
        &self.jid
    }

    /// Whether the node relays media (as opposed to only tracking relays).
    #[must_use]
    pub const fn is_relay_supported(&self) -> bool {
        self.relay_supported
    }

    /// Sets relay support.
    pub fn set_relay_supported(&mut self, relay_supported: bool) {
        self.relay_supported = relay_supported;
    }
}

impl IndexedDescriptor for JingleNodeDescriptor {
    fn store_descriptor(&self, props: &mut AccountProperties, entry_prefix: &str) {
        props.insert(field_key(entry_prefix, ADDRESS), self.jid.trim());
        props.insert(
            field_key(entry_prefix, IS_RELAY_SUPPORTED),
            self.relay_supported.to_string(),
        );
    }

    fn load_descriptor(props: &AccountProperties, entry_prefix: &str) -> Option<Self> {
        let jid = non_blank(props.get(&field_key(entry_prefix, ADDRESS)))?;
        Some(Self {
            jid: jid.to_owned(),
            relay_supported: props.get_bool(&field_key(entry_prefix, IS_RELAY_SUPPORTED), false),
        })
    }

    fn validate(&self, entry_prefix: &str) -> AccountResult<()> {
        let jid = self.jid.trim();
        if jid.is_empty() {
            return Err(AccountError::configuration(
                field_key(entry_prefix, ADDRESS),
                "relay node JID is empty",
            ));
        }
        if jid.starts_with('@') || jid.ends_with('@') || jid.starts_with('/') {
            return Err(AccountError::configuration(
                field_key(entry_prefix, ADDRESS),
                format!("malformed relay node JID {jid:?}"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let node = JingleNodeDescriptor::new("relay.example.com", true);
        let mut props = AccountProperties::new();
        node.store_descriptor(&mut props, "JINGLE_NODES0");

        assert_eq!(props.get("JINGLE_NODES0.ADDRESS"), Some("relay.example.com"));
        assert_eq!(props.get("JINGLE_NODES0.IS_RELAY_SUPPORTED"), Some("true"));
        assert_eq!(
            JingleNodeDescriptor::load_descriptor(&props, "JINGLE_NODES0"),
            Some(node)
        );
    }

    #[test]
    fn test_load_blank_address_is_absent() {
        let props = AccountProperties::from_iter([("JINGLE_NODES0.ADDRESS", " ")]);
        assert!(JingleNodeDescriptor::load_descriptor(&props, "JINGLE_NODES0").is_none());
    }

    #[test]
    fn test_validate() {
        assert!(JingleNodeDescriptor::new("", false).validate("JINGLE_NODES0").is_err());
        assert!(JingleNodeDescriptor::new("@example.com", false)
            .validate("JINGLE_NODES0")
            .is_err());
        assert!(JingleNodeDescriptor::new("tracker@example.com", false)
            .validate("JINGLE_NODES0")
            .is_ok());
    }
}
