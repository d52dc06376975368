//! Flat account property maps and the well-known keys stored in them.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

/// Account identifier string.
pub const USER_ID: &str = "USER_ID";
/// Plaintext password, present only when remembered.
pub const PASSWORD: &str = "PASSWORD";
/// Vault-managed password marker; never part of a staged output.
pub const ENCRYPTED_PASSWORD: &str = "ENCRYPTED_PASSWORD";
/// Whether the password is kept between sessions.
pub const PASSWORD_PERSISTENT: &str = "PASSWORD_PERSISTENT";
/// Protocol the account belongs to.
pub const PROTOCOL_NAME: &str = "PROTOCOL_NAME";
/// Unique account identifier (`<protocol>:<user id>`).
pub const ACCOUNT_UID: &str = "ACCOUNT_UID";
/// Path to the protocol icon.
pub const PROTOCOL_ICON_PATH: &str = "PROTOCOL_ICON_PATH";
/// Path to the account icon.
pub const ACCOUNT_ICON_PATH: &str = "ACCOUNT_ICON_PATH";

/// An ordered `String -> String` property map.
///
/// Used both as the model's scratch buffer and as the output handed to
/// persistence. Keys are dotted, case-sensitive paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountProperties {
    entries: BTreeMap<String, String>,
}

impl AccountProperties {
    /// Creates an empty property map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value under `key` parsed as a boolean, or `default` when
    /// absent or not `true`/`false`.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") => true,
            Some(v) if v.eq_ignore_ascii_case("false") => false,
            _ => default,
        }
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Stores `value` under `key`, or removes `key` when `value` is absent or empty.
    pub fn set_or_remove_if_empty(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(v) if !v.is_empty() => {
                self.entries.insert(key.to_owned(), v.to_owned());
            }
            _ => {
                self.entries.remove(key);
            }
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Removes every entry whose key satisfies `predicate`. Returns the number removed.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        before - self.entries.len()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over all keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over entries whose key starts with `prefix`.
    pub fn with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copies every entry of `source` whose key is not already present here.
    ///
    /// Local entries win; this is the load-side merge.
    pub fn merge_missing(&mut self, source: &Self) {
        for (key, value) in &source.entries {
            self.entries
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Writes every entry of `overlay` here, replacing existing values.
    ///
    /// The overlay wins; this is the store-side merge.
    pub fn overlay(&mut self, overlay: Self) {
        self.entries.extend(overlay.entries);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AccountProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for AccountProperties {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
