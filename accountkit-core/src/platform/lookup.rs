//! Account key resolution.

use crate::account::AccountKey;
use crate::error::AccountResult;

/// Resolves the persisted key of an account.
pub trait AccountLookup: Send + Sync {
    /// Returns the persisted key of the `protocol` account identified by
    /// `account_uid`, or `None` if it has never been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    fn resolve(&self, protocol: &str, account_uid: &str) -> AccountResult<Option<AccountKey>>;
}
