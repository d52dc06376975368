//! JSON-file backed implementation of every account capability.
//!
//! The whole file is loaded into memory on open. Capability calls mutate the
//! in-memory copy only; nothing reaches disk until [`FileStore::save`].

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use accountkit_core::descriptor::STUN_PREFIX;
use accountkit_core::platform::memory::StaticMediaService;
use accountkit_core::{
    AccountError, AccountHandle, AccountKey, AccountLookup, AccountProperties, AccountResult,
    AccountServices, MediaService, PasswordLoader, PropertyStore, ServiceLocator,
    StunPasswordLoader,
};
use eyre::WrapErr;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    accounts: BTreeMap<AccountKey, AccountProperties>,
    #[serde(default)]
    uids: BTreeMap<String, AccountKey>,
    #[serde(default)]
    passwords: BTreeMap<String, String>,
}

/// Account database kept in a single JSON file.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StoreFile>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> eyre::Result<Self> {
        let state = if path.exists() {
            let raw = fs::read_to_string(path)
                .wrap_err_with(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).wrap_err_with(|| format!("parsing {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "store file not found, starting empty");
            StoreFile::default()
        };
        Ok(Self {
            path: path.to_owned(),
            state: Mutex::new(state),
        })
    }

    /// Writes the store back to disk.
    ///
    /// The file is replaced atomically: the new content goes to a temporary
    /// file in the same directory, is synced, and is then renamed over the
    /// target. A failed save leaves the previous file in place.
    pub fn save(&self) -> eyre::Result<()> {
        let json = {
            let state = self.lock()?;
            serde_json::to_string_pretty(&*state)?
        };
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).wrap_err_with(|| format!("creating {}", dir.display()))?;

        let mut temp = NamedTempFile::new_in(dir)
            .wrap_err_with(|| format!("creating a temporary file in {}", dir.display()))?;
        temp.write_all(json.as_bytes())
            .wrap_err_with(|| format!("writing {}", temp.path().display()))?;
        temp.as_file()
            .sync_all()
            .wrap_err_with(|| format!("syncing {}", temp.path().display()))?;
        // The temporary file is removed when `persist` fails.
        temp.persist(&self.path)
            .map_err(|err| err.error)
            .wrap_err_with(|| format!("replacing {}", self.path.display()))?;
        sync_dir(dir)?;

        tracing::debug!(path = %self.path.display(), "store saved");
        Ok(())
    }

    /// Returns the persisted properties of `account_uid`.
    pub fn account(&self, account_uid: &str) -> AccountResult<Option<AccountProperties>> {
        let state = self.lock()?;
        Ok(state
            .uids
            .get(account_uid)
            .and_then(|key| state.accounts.get(key))
            .cloned())
    }

    /// Unique ids of every persisted account.
    pub fn account_uids(&self) -> AccountResult<Vec<String>> {
        Ok(self.lock()?.uids.keys().cloned().collect())
    }

    /// Replaces the persisted properties of `account_uid`, creating the
    /// account if needed.
    pub fn replace(&self, account_uid: &str, props: AccountProperties) -> AccountResult<AccountKey> {
        let mut state = self.lock()?;
        let key = match state.uids.get(account_uid) {
            Some(key) => key.clone(),
            None => {
                state.next_id += 1;
                let key = AccountKey::new(format!("acc{}", state.next_id));
                state.uids.insert(account_uid.to_owned(), key.clone());
                key
            }
        };
        state.accounts.insert(key.clone(), props);
        Ok(key)
    }

    /// Stores or clears a vault entry.
    pub fn set_password(&self, vault_key: &str, password: Option<&SecretString>) -> AccountResult<()> {
        let mut state = self.lock()?;
        match password {
            Some(password) => {
                state
                    .passwords
                    .insert(vault_key.to_owned(), password.expose_secret().to_owned());
            }
            None => {
                state.passwords.remove(vault_key);
            }
        }
        Ok(())
    }

    /// Removes every vault entry belonging to the STUN list of `account_uid`.
    ///
    /// Only keys of the form `<uid>.STUN<digits>` match, so the login
    /// password of an account whose uid merely starts with `<uid>.STUN`
    /// survives.
    pub fn clear_stun_passwords(&self, account_uid: &str) -> AccountResult<()> {
        let prefix = stun_vault_key(account_uid, STUN_PREFIX);
        self.lock()?
            .passwords
            .retain(|key, _| !is_stun_vault_entry(key, &prefix));
        Ok(())
    }

    fn lock(&self) -> AccountResult<MutexGuard<'_, StoreFile>> {
        self.state
            .lock()
            .map_err(|_| AccountError::PropertyStore("mutex poisoned".to_string()))
    }

    fn password(&self, vault_key: &str) -> AccountResult<Option<SecretString>> {
        let state = self
            .state
            .lock()
            .map_err(|_| AccountError::Credentials("mutex poisoned".to_string()))?;
        Ok(state
            .passwords
            .get(vault_key)
            .map(|p| SecretString::new(p.as_str().into())))
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> eyre::Result<()> {
    fs::File::open(dir)
        .and_then(|handle| handle.sync_all())
        .wrap_err_with(|| format!("syncing {}", dir.display()))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn sync_dir(_dir: &Path) -> eyre::Result<()> {
    Ok(())
}

fn is_stun_vault_entry(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

/// Vault key of the TURN password stored for `entry_prefix`.
pub fn stun_vault_key(account_uid: &str, entry_prefix: &str) -> String {
    format!("{account_uid}.{entry_prefix}")
}

impl PropertyStore for FileStore {
    fn list_names(&self, account: &AccountKey) -> AccountResult<Vec<String>> {
        Ok(self
            .lock()?
            .accounts
            .get(account)
            .map(|props| props.keys().map(str::to_owned).collect())
            .unwrap_or_default())
    }

    fn get(&self, account: &AccountKey, name: &str) -> AccountResult<Option<String>> {
        Ok(self
            .lock()?
            .accounts
            .get(account)
            .and_then(|props| props.get(name))
            .map(str::to_owned))
    }

    fn set(&self, account: &AccountKey, name: &str, value: &str) -> AccountResult<()> {
        self.lock()?
            .accounts
            .entry(account.clone())
            .or_default()
            .insert(name, value);
        Ok(())
    }

    fn delete(&self, account: &AccountKey, name: &str) -> AccountResult<()> {
        if let Some(props) = self.lock()?.accounts.get_mut(account) {
            props.remove(name);
        }
        Ok(())
    }
}

impl AccountLookup for FileStore {
    fn resolve(&self, _protocol: &str, account_uid: &str) -> AccountResult<Option<AccountKey>> {
        Ok(self.lock()?.uids.get(account_uid).cloned())
    }
}

impl PasswordLoader for FileStore {
    fn load(&self, account: &dyn AccountHandle) -> AccountResult<Option<SecretString>> {
        self.password(account.account_unique_id())
    }
}

impl StunPasswordLoader for FileStore {
    fn load(
        &self,
        account: &dyn AccountHandle,
        entry_prefix: &str,
    ) -> AccountResult<Option<SecretString>> {
        self.password(&stun_vault_key(account.account_unique_id(), entry_prefix))
    }
}

/// Finds the built-in media table unless media support is switched off.
struct CliLocator {
    media: Option<Arc<dyn MediaService>>,
}

impl ServiceLocator for CliLocator {
    fn media_service(&self) -> AccountResult<Option<Arc<dyn MediaService>>> {
        Ok(self.media.clone())
    }
}

/// [`AccountServices`] over a shared [`FileStore`].
pub struct FileServices {
    store: Arc<FileStore>,
    locator: Arc<CliLocator>,
}

impl FileServices {
    /// Bundles `store` with the built-in media service.
    pub fn new(store: Arc<FileStore>, media_enabled: bool) -> Self {
        let media = media_enabled
            .then(|| Arc::new(StaticMediaService::default()) as Arc<dyn MediaService>);
        Self {
            store,
            locator: Arc::new(CliLocator { media }),
        }
    }
}

impl AccountServices for FileServices {
    fn account_lookup(&self) -> Arc<dyn AccountLookup> {
        self.store.clone()
    }

    fn property_store(&self) -> Arc<dyn PropertyStore> {
        self.store.clone()
    }

    fn password_loader(&self) -> Arc<dyn PasswordLoader> {
        self.store.clone()
    }

    fn stun_password_loader(&self) -> Arc<dyn StunPasswordLoader> {
        self.store.clone()
    }

    fn service_locator(&self) -> Arc<dyn ServiceLocator> {
        self.locator.clone()
    }
}
