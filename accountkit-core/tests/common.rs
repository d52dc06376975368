//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use accountkit_core::platform::memory::MemoryPlatform;
use accountkit_core::{
    AccountKey, AccountLookup, AccountProperties, AccountResult, AccountServices, PasswordLoader,
    PropertyStore, ServiceLocator, StoredAccount, StunPasswordLoader, JABBER_PROTOCOL,
};

pub const ALICE_UID: &str = "Jabber:alice@example.com";

/// Platform wrapper that records lookups and deletes made through it.
pub struct RecordingPlatform {
    inner: MemoryPlatform,
    recorder: Arc<Recorder>,
}

pub struct Recorder {
    lookup: Arc<dyn AccountLookup>,
    store: Arc<dyn PropertyStore>,
    lookups: AtomicUsize,
    deletes: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().expect("deletes").clone()
    }
}

impl AccountLookup for Recorder {
    fn resolve(&self, protocol: &str, account_uid: &str) -> AccountResult<Option<AccountKey>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.lookup.resolve(protocol, account_uid)
    }
}

impl PropertyStore for Recorder {
    fn list_names(&self, account: &AccountKey) -> AccountResult<Vec<String>> {
        self.store.list_names(account)
    }

    fn get(&self, account: &AccountKey, name: &str) -> AccountResult<Option<String>> {
        self.store.get(account, name)
    }

    fn set(&self, account: &AccountKey, name: &str, value: &str) -> AccountResult<()> {
        self.store.set(account, name, value)
    }

    fn delete(&self, account: &AccountKey, name: &str) -> AccountResult<()> {
        self.deletes.lock().expect("deletes").push(name.to_owned());
        self.store.delete(account, name)
    }
}

impl RecordingPlatform {
    pub fn new() -> Self {
        let inner = MemoryPlatform::new();
        let recorder = Arc::new(Recorder {
            lookup: inner.account_lookup(),
            store: inner.property_store(),
            lookups: AtomicUsize::new(0),
            deletes: Mutex::new(Vec::new()),
        });
        Self { inner, recorder }
    }

    pub fn memory(&self) -> &MemoryPlatform {
        &self.inner
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }
}

impl AccountServices for RecordingPlatform {
    fn account_lookup(&self) -> Arc<dyn AccountLookup> {
        self.recorder.clone()
    }

    fn property_store(&self) -> Arc<dyn PropertyStore> {
        self.recorder.clone()
    }

    fn password_loader(&self) -> Arc<dyn PasswordLoader> {
        self.inner.password_loader()
    }

    fn stun_password_loader(&self) -> Arc<dyn StunPasswordLoader> {
        self.inner.stun_password_loader()
    }

    fn service_locator(&self) -> Arc<dyn ServiceLocator> {
        self.inner.service_locator()
    }
}

/// Persists an account for `alice@example.com` with `stun` STUN servers and
/// `nodes` Jingle Nodes, returning its snapshot.
pub fn persist_alice(platform: &MemoryPlatform, stun: usize, nodes: usize) -> StoredAccount {
    let mut props = AccountProperties::from_iter([
        ("USER_ID", "alice@example.com"),
        ("PROTOCOL_NAME", JABBER_PROTOCOL),
        ("ACCOUNT_UID", ALICE_UID),
        ("SERVER_ADDRESS", "xmpp.example.com"),
        ("SERVER_PORT", "5222"),
    ]);
    for i in 0..stun {
        props.insert(format!("STUN{i}.ADDRESS"), format!("stun{i}.example.com"));
        props.insert(format!("STUN{i}.PORT"), (3478 + i).to_string());
        props.insert(format!("STUN{i}.IS_TURN_SUPPORTED"), "false");
    }
    for i in 0..nodes {
        props.insert(
            format!("JINGLE_NODES{i}.ADDRESS"),
            format!("relay{i}.example.com"),
        );
        props.insert(format!("JINGLE_NODES{i}.IS_RELAY_SUPPORTED"), "true");
    }
    platform.store().persist(ALICE_UID, &props).expect("persist");
    StoredAccount::new(JABBER_PROTOCOL, props)
}

/// Reads the persisted properties of alice's account.
pub fn persisted_alice(platform: &MemoryPlatform) -> AccountProperties {
    let key = platform
        .store()
        .resolve(JABBER_PROTOCOL, ALICE_UID)
        .expect("resolve")
        .expect("alice is persisted");
    platform.store().account_properties(&key).expect("account")
}
