//! In-memory implementations of platform traits for testing.
//!
//! These implementations keep everything in process memory, including
//! passwords in clear text. They are designed for unit and integration
//! testing of the registration model and for the developer CLI.

// Allow certain clippy lints for test-only code
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use secrecy::SecretString;

use super::{
    AccountLookup, AccountServices, MediaService, PasswordLoader, PropertyStore, ServiceLocator,
    StunPasswordLoader,
};
use crate::account::{AccountHandle, AccountKey};
use crate::descriptor::secret;
use crate::error::{AccountError, AccountResult};
use crate::properties::{self, AccountProperties};

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    error: fn(String) -> AccountError,
) -> AccountResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| error("mutex poisoned".to_string()))
}

// =============================================================================
// Memory Property Store
// =============================================================================

#[derive(Default)]
struct StoreState {
    accounts: BTreeMap<AccountKey, AccountProperties>,
    by_uid: HashMap<String, AccountKey>,
}

/// In-memory property store and account lookup.
///
/// Accounts are keyed `acc<n>` the first time they are persisted.
#[derive(Default)]
pub struct MemoryPropertyStore {
    state: Mutex<StoreState>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryPropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Persists `props` for the account `account_uid`, creating it if needed.
    ///
    /// Existing names not present in `props` are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if writes are configured to fail.
    pub fn persist(&self, account_uid: &str, props: &AccountProperties) -> AccountResult<AccountKey> {
        self.check_writable()?;
        let mut state = lock(&self.state, AccountError::PropertyStore)?;
        let key = if let Some(key) = state.by_uid.get(account_uid) {
            key.clone()
        } else {
            let key = AccountKey::new(format!(
                "acc{}",
                self.next_id.fetch_add(1, Ordering::Relaxed) + 1
            ));
            state.by_uid.insert(account_uid.to_owned(), key.clone());
            key
        };
        let stored = state.accounts.entry(key.clone()).or_default();
        for (name, value) in props.iter() {
            stored.insert(name, value);
        }
        Ok(key)
    }

    /// Returns a copy of the properties persisted under `key`.
    #[must_use]
    pub fn account_properties(&self, key: &AccountKey) -> Option<AccountProperties> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.accounts.get(key).cloned())
    }

    /// Makes every subsequent `set`/`delete`/`persist` fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> AccountResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AccountError::PropertyStore("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn list_names(&self, account: &AccountKey) -> AccountResult<Vec<String>> {
        let state = lock(&self.state, AccountError::PropertyStore)?;
        Ok(state
            .accounts
            .get(account)
            .map(|props| props.keys().map(str::to_owned).collect())
            .unwrap_or_default())
    }

    fn get(&self, account: &AccountKey, name: &str) -> AccountResult<Option<String>> {
        let state = lock(&self.state, AccountError::PropertyStore)?;
        Ok(state
            .accounts
            .get(account)
            .and_then(|props| props.get(name))
            .map(str::to_owned))
    }

    fn set(&self, account: &AccountKey, name: &str, value: &str) -> AccountResult<()> {
        self.check_writable()?;
        lock(&self.state, AccountError::PropertyStore)?
            .accounts
            .entry(account.clone())
            .or_default()
            .insert(name, value);
        Ok(())
    }

    fn delete(&self, account: &AccountKey, name: &str) -> AccountResult<()> {
        self.check_writable()?;
        if let Some(props) = lock(&self.state, AccountError::PropertyStore)?
            .accounts
            .get_mut(account)
        {
            props.remove(name);
        }
        Ok(())
    }
}

impl AccountLookup for MemoryPropertyStore {
    fn resolve(&self, protocol: &str, account_uid: &str) -> AccountResult<Option<AccountKey>> {
        let state = lock(&self.state, AccountError::AccountLookup)?;
        let Some(key) = state.by_uid.get(account_uid) else {
            return Ok(None);
        };
        let stored_protocol = state
            .accounts
            .get(key)
            .and_then(|props| props.get(properties::PROTOCOL_NAME));
        if stored_protocol.is_some_and(|stored| stored != protocol) {
            return Ok(None);
        }
        Ok(Some(key.clone()))
    }
}

// =============================================================================
// Memory Credentials
// =============================================================================

/// In-memory password vault.
#[derive(Default)]
pub struct MemoryCredentials {
    passwords: Mutex<HashMap<String, String>>,
}

impl MemoryCredentials {
    /// Creates an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the login password of `account_uid`.
    pub fn store_password(&self, account_uid: &str, password: &str) {
        if let Ok(mut passwords) = self.passwords.lock() {
            passwords.insert(account_uid.to_owned(), password.to_owned());
        }
    }

    /// Stores the TURN password of the STUN entry `entry_prefix` of `account_uid`.
    pub fn store_stun_password(&self, account_uid: &str, entry_prefix: &str, password: &str) {
        self.store_password(&stun_key(account_uid, entry_prefix), password);
    }

    fn load_key(&self, key: &str) -> AccountResult<Option<SecretString>> {
        let passwords = lock(&self.passwords, AccountError::Credentials)?;
        Ok(passwords.get(key).map(|p| secret(p)))
    }
}

fn stun_key(account_uid: &str, entry_prefix: &str) -> String {
    format!("{account_uid}.{entry_prefix}")
}

impl PasswordLoader for MemoryCredentials {
    fn load(&self, account: &dyn AccountHandle) -> AccountResult<Option<SecretString>> {
        self.load_key(account.account_unique_id())
    }
}

impl StunPasswordLoader for MemoryCredentials {
    fn load(
        &self,
        account: &dyn AccountHandle,
        entry_prefix: &str,
    ) -> AccountResult<Option<SecretString>> {
        self.load_key(&stun_key(account.account_unique_id(), entry_prefix))
    }
}

// =============================================================================
// Media service and locator
// =============================================================================

/// Media service with a fixed encoding table.
pub struct StaticMediaService {
    priorities: Vec<(String, u32)>,
}

impl StaticMediaService {
    /// Creates a media service reporting `priorities`.
    #[must_use]
    pub fn new(priorities: Vec<(String, u32)>) -> Self {
        Self { priorities }
    }
}

impl Default for StaticMediaService {
    fn default() -> Self {
        Self::new(
            [
                ("opus/48000", 750),
                ("SILK/24000", 714),
                ("G722/8000", 705),
                ("speex/32000", 701),
                ("PCMU/8000", 650),
                ("PCMA/8000", 600),
                ("VP8/90000", 1100),
                ("H264/90000", 1000),
            ]
            .into_iter()
            .map(|(name, priority)| (name.to_owned(), priority))
            .collect(),
        )
    }
}

impl MediaService for StaticMediaService {
    fn default_encoding_priorities(&self) -> Vec<(String, u32)> {
        self.priorities.clone()
    }
}

/// Service locator returning a preset media service.
#[derive(Default)]
pub struct MemoryServiceLocator {
    media: Option<Arc<dyn MediaService>>,
    fail: bool,
}

impl MemoryServiceLocator {
    /// Locator that finds `media`.
    #[must_use]
    pub fn with_media(media: Arc<dyn MediaService>) -> Self {
        Self {
            media: Some(media),
            fail: false,
        }
    }

    /// Locator whose registry is unreachable.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            media: None,
            fail: true,
        }
    }
}

impl ServiceLocator for MemoryServiceLocator {
    fn media_service(&self) -> AccountResult<Option<Arc<dyn MediaService>>> {
        if self.fail {
            return Err(AccountError::ServiceLocator(
                "service registry unavailable".to_string(),
            ));
        }
        Ok(self.media.clone())
    }
}

// =============================================================================
// Memory Platform
// =============================================================================

/// Bundle of in-memory capabilities.
pub struct MemoryPlatform {
    store: Arc<MemoryPropertyStore>,
    credentials: Arc<MemoryCredentials>,
    locator: Arc<MemoryServiceLocator>,
}

impl MemoryPlatform {
    /// Creates a platform with an empty store and a default media service.
    #[must_use]
    pub fn new() -> Self {
        Self::with_locator(MemoryServiceLocator::with_media(Arc::new(
            StaticMediaService::default(),
        )))
    }

    /// Creates a platform using `locator` for service discovery.
    #[must_use]
    pub fn with_locator(locator: MemoryServiceLocator) -> Self {
        Self {
            store: Arc::new(MemoryPropertyStore::new()),
            credentials: Arc::new(MemoryCredentials::new()),
            locator: Arc::new(locator),
        }
    }

    /// The in-memory property store.
    #[must_use]
    pub fn store(&self) -> &MemoryPropertyStore {
        &self.store
    }

    /// The in-memory password vault.
    #[must_use]
    pub fn credentials(&self) -> &MemoryCredentials {
        &self.credentials
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountServices for MemoryPlatform {
    fn account_lookup(&self) -> Arc<dyn AccountLookup> {
        self.store.clone()
    }

    fn property_store(&self) -> Arc<dyn PropertyStore> {
        self.store.clone()
    }

    fn password_loader(&self) -> Arc<dyn PasswordLoader> {
        self.credentials.clone()
    }

    fn stun_password_loader(&self) -> Arc<dyn StunPasswordLoader> {
        self.credentials.clone()
    }

    fn service_locator(&self) -> Arc<dyn ServiceLocator> {
        self.locator.clone()
    }
}
