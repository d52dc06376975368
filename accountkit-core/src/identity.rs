use crate::properties::{self, AccountProperties};

/// Baseline identity configuration shared by every account of a protocol.
///
/// Holds the fields that are not owned by any sub-registration: the protocol
/// name and the optional icon paths. [`AccountIdentity::store_properties`]
/// is the last step of every store: it writes these fields into the output
/// and overlays the staged account properties on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    protocol: String,
    protocol_icon_path: Option<String>,
    account_icon_path: Option<String>,
}

impl AccountIdentity {
    /// Creates an identity for `protocol` with no icons.
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            protocol_icon_path: None,
            account_icon_path: None,
        }
    }

    /// Protocol name (e.g. `Jabber`).
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Path to the protocol icon.
    #[must_use]
    pub fn protocol_icon_path(&self) -> Option<&str> {
        self.protocol_icon_path.as_deref()
    }

    /// Path to the account icon.
    #[must_use]
    pub fn account_icon_path(&self) -> Option<&str> {
        self.account_icon_path.as_deref()
    }

    /// Writes the identity fields into `output`, then overlays `staged`.
    ///
    /// Icon paths given here replace the remembered ones; `None` keeps them.
    /// The vault-managed `ENCRYPTED_PASSWORD` marker is dropped from the
    /// result; the password vault re-creates it when the account is saved.
    pub fn store_properties(
        &mut self,
        protocol_icon_path: Option<&str>,
        account_icon_path: Option<&str>,
        staged: AccountProperties,
        output: &mut AccountProperties,
    ) {
        if let Some(path) = protocol_icon_path {
            self.protocol_icon_path = Some(path.to_owned());
        }
        if let Some(path) = account_icon_path {
            self.account_icon_path = Some(path.to_owned());
        }

        output.insert(properties::PROTOCOL_NAME, self.protocol.as_str());
        output.set_or_remove_if_empty(
            properties::PROTOCOL_ICON_PATH,
            self.protocol_icon_path.as_deref(),
        );
        output.set_or_remove_if_empty(
            properties::ACCOUNT_ICON_PATH,
            self.account_icon_path.as_deref(),
        );
        output.overlay(staged);
        output.remove(properties::ENCRYPTED_PASSWORD);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_overlays_staged_values() {
        let mut identity = AccountIdentity::new("Jabber");
        let mut output = AccountProperties::from_iter([
            (properties::USER_ID, "old@example.com"),
            (properties::ENCRYPTED_PASSWORD, "xyz"),
            ("SERVER_PORT", "5222"),
        ]);
        let staged = AccountProperties::from_iter([(properties::USER_ID, "new@example.com")]);

        identity.store_properties(Some("icons/jabber.png"), None, staged, &mut output);

        assert_eq!(output.get(properties::USER_ID), Some("new@example.com"));
        assert_eq!(output.get("SERVER_PORT"), Some("5222"));
        assert_eq!(output.get(properties::PROTOCOL_NAME), Some("Jabber"));
        assert_eq!(output.get(properties::PROTOCOL_ICON_PATH), Some("icons/jabber.png"));
        assert!(!output.contains_key(properties::ACCOUNT_ICON_PATH));
        assert!(!output.contains_key(properties::ENCRYPTED_PASSWORD));
    }

    #[test]
    fn test_icon_paths_are_remembered() {
        let mut identity = AccountIdentity::new("Jabber");
        let mut output = AccountProperties::new();
        identity.store_properties(None, Some("avatar.png"), AccountProperties::new(), &mut output);

        let mut second = AccountProperties::new();
        identity.store_properties(None, None, AccountProperties::new(), &mut second);
        assert_eq!(second.get(properties::ACCOUNT_ICON_PATH), Some("avatar.png"));
        assert_eq!(identity.account_icon_path(), Some("avatar.png"));
    }
}
