//! Password vault access.

use secrecy::SecretString;

use crate::account::AccountHandle;
use crate::error::AccountResult;

/// Loads an account's login password from the vault.
pub trait PasswordLoader: Send + Sync {
    /// Returns the stored password, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be read.
    fn load(&self, account: &dyn AccountHandle) -> AccountResult<Option<SecretString>>;
}

/// Loads per-entry TURN passwords from the vault.
pub trait StunPasswordLoader: Send + Sync {
    /// Returns the password stored for the STUN entry `entry_prefix`
    /// (e.g. `STUN0`) of `account`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be read.
    fn load(
        &self,
        account: &dyn AccountHandle,
        entry_prefix: &str,
    ) -> AccountResult<Option<SecretString>>;
}
