//! Runtime service discovery.

use std::sync::Arc;

use super::{AccountLookup, PasswordLoader, PropertyStore, StunPasswordLoader};
use crate::error::AccountResult;

/// Media engine capabilities needed to present encoding settings.
pub trait MediaService: Send + Sync {
    /// Default priority per encoding, keyed `<name>/<clock rate>`
    /// (e.g. `opus/48000`). Priority `0` means disabled.
    fn default_encoding_priorities(&self) -> Vec<(String, u32)>;
}

/// Locates optional runtime services.
pub trait ServiceLocator: Send + Sync {
    /// Returns the media service, or `None` if none is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    fn media_service(&self) -> AccountResult<Option<Arc<dyn MediaService>>>;
}

/// Provider of every capability a registration session depends on.
pub trait AccountServices: Send + Sync {
    /// Returns the account key resolver.
    fn account_lookup(&self) -> Arc<dyn AccountLookup>;

    /// Returns the persisted property store.
    fn property_store(&self) -> Arc<dyn PropertyStore>;

    /// Returns the login password loader.
    fn password_loader(&self) -> Arc<dyn PasswordLoader>;

    /// Returns the TURN password loader.
    fn stun_password_loader(&self) -> Arc<dyn StunPasswordLoader>;

    /// Returns the service locator.
    fn service_locator(&self) -> Arc<dyn ServiceLocator>;
}
