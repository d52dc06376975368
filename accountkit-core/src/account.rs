//! Persisted account handles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::properties::{self, AccountProperties};

/// Protocol name used for XMPP accounts.
pub const JABBER_PROTOCOL: &str = "Jabber";

/// Key under which an account's properties are persisted.
///
/// Opaque to the registration model; produced by [`crate::AccountLookup`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountKey(String);

impl AccountKey {
    /// Wraps a persisted account key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted account as seen by [`crate::AccountRegistration::load_account`].
pub trait AccountHandle {
    /// All persisted properties of the account.
    fn properties(&self) -> &AccountProperties;

    /// The account's user identifier.
    fn user_id(&self) -> Option<&str>;

    /// Unique identifier, `<protocol>:<user id>`.
    fn account_unique_id(&self) -> &str;

    /// Whether the password is kept between sessions.
    fn is_password_persistent(&self) -> bool {
        self.properties()
            .get_bool(properties::PASSWORD_PERSISTENT, true)
    }
}

/// Builds the unique identifier of an account.
#[must_use]
pub fn account_unique_id(protocol: &str, user_id: &str) -> String {
    format!("{protocol}:{user_id}")
}

/// A snapshot of a persisted account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAccount {
    unique_id: String,
    properties: AccountProperties,
}

impl StoredAccount {
    /// Builds an account snapshot from its persisted properties.
    ///
    /// The unique id is taken from `ACCOUNT_UID` when present, otherwise it is
    /// derived from `protocol` and `USER_ID`.
    #[must_use]
    pub fn new(protocol: &str, props: AccountProperties) -> Self {
        let unique_id = props.get(properties::ACCOUNT_UID).map_or_else(
            || account_unique_id(protocol, props.get(properties::USER_ID).unwrap_or_default()),
            str::to_owned,
        );
        Self {
            unique_id,
            properties: props,
        }
    }

    /// Consumes the snapshot, returning its properties.
    #[must_use]
    pub fn into_properties(self) -> AccountProperties {
        self.properties
    }
}

impl AccountHandle for StoredAccount {
    fn properties(&self) -> &AccountProperties {
        &self.properties
    }

    fn user_id(&self) -> Option<&str> {
        self.properties.get(properties::USER_ID)
    }

    fn account_unique_id(&self) -> &str {
        &self.unique_id
    }
}
