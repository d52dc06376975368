//! Persisted account property store.

use crate::account::AccountKey;
use crate::error::AccountResult;

/// Persisted, per-account `name -> value` configuration.
///
/// Names are relative to the account (e.g. `STUN0.ADDRESS`); the store is
/// responsible for scoping them under `account`.
pub trait PropertyStore: Send + Sync {
    /// Lists every property name stored for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_names(&self, account: &AccountKey) -> AccountResult<Vec<String>>;

    /// Reads one property.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, account: &AccountKey, name: &str) -> AccountResult<Option<String>>;

    /// Writes one property.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(&self, account: &AccountKey, name: &str, value: &str) -> AccountResult<()>;

    /// Deletes one property. Deleting a missing name is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, account: &AccountKey, name: &str) -> AccountResult<()>;

    /// Lists the names for `account` that satisfy `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn names_matching(
        &self,
        account: &AccountKey,
        predicate: &dyn Fn(&str) -> bool,
    ) -> AccountResult<Vec<String>> {
        Ok(self
            .list_names(account)?
            .into_iter()
            .filter(|name| predicate(name))
            .collect())
    }
}
