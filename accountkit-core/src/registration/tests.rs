use std::sync::Arc;

use secrecy::ExposeSecret;

use super::*;
use crate::account::{StoredAccount, JABBER_PROTOCOL};
use crate::platform::memory::{MemoryPlatform, MemoryServiceLocator, StaticMediaService};
use crate::platform::{AccountLookup, PropertyStore};

const UID: &str = "Jabber:alice@example.com";

fn persisted_account(platform: &MemoryPlatform, stun: usize, nodes: usize) -> StoredAccount {
    let mut props = AccountProperties::from_iter([
        (properties::USER_ID, "alice@example.com"),
        (properties::PROTOCOL_NAME, JABBER_PROTOCOL),
        (properties::ACCOUNT_UID, UID),
        (properties::ENCRYPTED_PASSWORD, "vault-marker"),
        ("SERVER_ADDRESS", "xmpp.example.com"),
    ]);
    for i in 0..stun {
        props.insert(format!("STUN{i}.ADDRESS"), format!("stun{i}.example.com"));
        props.insert(format!("STUN{i}.PORT"), "3478");
    }
    for i in 0..nodes {
        props.insert(format!("JINGLE_NODES{i}.ADDRESS"), format!("relay{i}.example.com"));
        props.insert(format!("JINGLE_NODES{i}.IS_RELAY_SUPPORTED"), "true");
    }
    platform.store().persist(UID, &props).expect("persist");
    StoredAccount::new(JABBER_PROTOCOL, props)
}

fn modification(password: Option<&str>) -> StoreRequest<'_> {
    StoreRequest {
        password,
        is_modification: true,
        ..StoreRequest::default()
    }
}

fn persisted_list_keys(platform: &MemoryPlatform) -> Vec<String> {
    let key = platform
        .store()
        .resolve(JABBER_PROTOCOL, UID)
        .expect("resolve")
        .expect("persisted");
    platform
        .store()
        .list_names(&key)
        .expect("list")
        .into_iter()
        .filter(|name| cleanup::is_list_key(name))
        .collect()
}

fn list_keys(props: &AccountProperties) -> Vec<&str> {
    props.keys().filter(|k| cleanup::is_list_key(k)).collect()
}

#[test]
fn test_load_decodes_lists() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 2, 1);

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");

    assert_eq!(registration.user_id(), Some("alice@example.com"));
    assert_eq!(registration.account_unique_id(), Some(UID));
    assert_eq!(registration.stun_servers().len(), 2);
    assert_eq!(registration.stun_servers()[1].address(), "stun1.example.com");
    assert_eq!(
        registration.jingle_nodes(),
        &[JingleNodeDescriptor::new("relay0.example.com", true)]
    );
    assert_eq!(registration.property("SERVER_ADDRESS"), Some("xmpp.example.com"));
}

#[test]
fn test_shrink_removes_stale_entries_everywhere() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 3, 2);

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");
    registration.stun_servers_mut().truncate(1);
    registration.jingle_nodes_mut().clear();

    let mut output = account.into_properties();
    registration
        .store_properties(&platform, &modification(Some("secret")), &mut output)
        .expect("store");

    let expected = vec![
        "STUN0.ADDRESS",
        "STUN0.IS_TURN_SUPPORTED",
        "STUN0.PORT",
        "STUN0.PROTOCOL",
    ];
    assert_eq!(list_keys(&output), expected);
    assert!(persisted_list_keys(&platform).is_empty());
    assert_eq!(output.get("SERVER_ADDRESS"), Some("xmpp.example.com"));
    assert!(!output.contains_key(properties::ENCRYPTED_PASSWORD));

    platform.store().persist(UID, &output).expect("persist");
    assert_eq!(persisted_list_keys(&platform), expected);
}

#[test]
fn test_repeated_store_is_idempotent() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 2, 2);

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");

    let mut first = account.into_properties();
    registration
        .store_properties(&platform, &modification(None), &mut first)
        .expect("first store");
    platform.store().persist(UID, &first).expect("persist");

    let mut second = first.clone();
    registration
        .store_properties(&platform, &modification(None), &mut second)
        .expect("second store");

    assert_eq!(first, second);
    assert_eq!(list_keys(&second).len(), 2 * 4 + 2 * 2);
}

#[test]
fn test_new_account_skips_cleanup() {
    let platform = MemoryPlatform::new();
    let mut registration = AccountRegistration::default();
    registration.set_user_id(Some("bob@example.com"));
    registration.add_stun_server(StunServerDescriptor::new("stun.example.com", 3478));

    let mut output = AccountProperties::new();
    let request = StoreRequest {
        password: Some("hunter2"),
        ..StoreRequest::default()
    };
    registration
        .store_properties(&platform, &request, &mut output)
        .expect("store");

    assert_eq!(output.get(properties::USER_ID), Some("bob@example.com"));
    assert_eq!(output.get(properties::PASSWORD), Some("hunter2"));
    assert_eq!(output.get(properties::PROTOCOL_NAME), Some(JABBER_PROTOCOL));
    assert!(list_keys(&output).is_empty());
}

#[test]
fn test_unresolved_edit_target_skips_cleanup() {
    let platform = MemoryPlatform::new();
    let account = StoredAccount::new(
        JABBER_PROTOCOL,
        AccountProperties::from_iter([
            (properties::USER_ID, "carol@example.com"),
            ("STUN0.ADDRESS", "stun.example.com"),
        ]),
    );

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");

    let mut output = account.into_properties();
    registration
        .store_properties(&platform, &modification(None), &mut output)
        .expect("store");

    assert_eq!(output.get("STUN0.ADDRESS"), Some("stun.example.com"));
    assert!(!registration.properties().contains_key("STUN0.ADDRESS"));
}

#[test]
fn test_invalid_descriptor_leaves_state_untouched() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 3, 0);

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");
    registration.add_stun_server(StunServerDescriptor::new("  ", 3478));

    let mut output = account.into_properties();
    let before = output.clone();
    let err = registration
        .store_properties(&platform, &modification(None), &mut output)
        .expect_err("blank address must be rejected");

    assert!(err.is_configuration());
    assert_eq!(output, before);
    assert_eq!(persisted_list_keys(&platform).len(), 6);
}

#[test]
fn test_list_over_configured_maximum_is_rejected() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 1, 0);
    let config = RegistrationConfig {
        max_stun_servers: 2,
        ..RegistrationConfig::default()
    };

    let mut registration = AccountRegistration::new(config);
    registration
        .load_account(&account, &platform)
        .expect("load");
    registration.add_stun_server(StunServerDescriptor::new("b.example.com", 3478));
    registration.add_stun_server(StunServerDescriptor::new("c.example.com", 3478));

    let mut output = account.into_properties();
    let before = output.clone();
    let err = registration
        .store_properties(&platform, &modification(None), &mut output)
        .expect_err("third server would never be read back");

    assert!(matches!(err, AccountError::Configuration { ref key, .. } if key == STUN_PREFIX));
    assert_eq!(output, before);
    assert_eq!(persisted_list_keys(&platform).len(), 2);

    registration.stun_servers_mut().truncate(2);
    registration
        .store_properties(&platform, &modification(None), &mut output)
        .expect("store within the limit");
    assert_eq!(output.get("STUN1.ADDRESS"), Some("b.example.com"));
    assert!(!output.contains_key("STUN2.ADDRESS"));
}

#[test]
fn test_malformed_setting_is_rejected_before_cleanup() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 1, 0);

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");
    registration.set_property("SERVER_ADDRESS", Some("evil\nSTUN0.ADDRESS=x"));

    let mut output = account.into_properties();
    let err = registration
        .store_properties(&platform, &modification(None), &mut output)
        .expect_err("line break must be rejected");

    assert!(matches!(err, AccountError::Configuration { ref key, .. } if key == "SERVER_ADDRESS"));
    assert_eq!(persisted_list_keys(&platform).len(), 2);
}

#[test]
fn test_failed_delete_propagates() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 2, 0);

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");
    platform.store().set_fail_writes(true);

    let mut output = account.into_properties();
    let before = output.clone();
    let err = registration
        .store_properties(&platform, &modification(None), &mut output)
        .expect_err("store is read-only");

    assert!(matches!(err, AccountError::PropertyStore(_)));
    assert_eq!(output, before);
}

#[test]
fn test_forgotten_password_never_reaches_output() {
    let platform = MemoryPlatform::new();
    let mut registration = AccountRegistration::default();
    registration.set_user_id(Some("alice@example.com"));
    registration.set_remember_password(false);
    registration.set_password(Some(crate::descriptor::secret("ignored")));
    assert!(registration.password().is_none());

    let mut output = AccountProperties::from_iter([(properties::PASSWORD, "stale")]);
    let request = StoreRequest {
        password: Some("typed"),
        ..StoreRequest::default()
    };
    registration
        .store_properties(&platform, &request, &mut output)
        .expect("store");

    assert!(!output.contains_key(properties::PASSWORD));
    assert!(registration.password().is_none());
}

#[test]
fn test_load_keeps_local_values() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 1, 0);

    let mut registration = AccountRegistration::default();
    registration.properties.insert("SERVER_ADDRESS", "local.example.com");
    registration.properties.insert("STUN0.ADDRESS", "local-stun.example.com");
    registration
        .load_account(&account, &platform)
        .expect("load");

    assert_eq!(registration.property("SERVER_ADDRESS"), Some("local.example.com"));
    assert_eq!(registration.stun_servers()[0].address(), "local-stun.example.com");
}

#[test]
fn test_load_attaches_stun_passwords_and_account_password() {
    let platform = MemoryPlatform::new();
    let account = persisted_account(&platform, 2, 0);
    platform.credentials().store_password(UID, "login");
    platform
        .credentials()
        .store_stun_password(UID, "STUN1", "turn-secret");

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");

    assert!(registration.remember_password());
    assert_eq!(
        registration.password().map(|p| p.expose_secret().to_owned()),
        Some("login".to_owned())
    );
    assert!(registration.stun_servers()[0].password().is_none());
    let credentials = registration.stun_credentials();
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].0, "STUN1");
    assert_eq!(credentials[0].1.expose_secret(), "turn-secret");
}

#[test]
fn test_non_persistent_password_is_dropped_on_load() {
    let platform = MemoryPlatform::new();
    let account = StoredAccount::new(
        JABBER_PROTOCOL,
        AccountProperties::from_iter([
            (properties::USER_ID, "alice@example.com"),
            (properties::PASSWORD_PERSISTENT, "false"),
        ]),
    );
    platform.credentials().store_password(UID, "login");

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");

    assert!(!registration.remember_password());
    assert!(registration.password().is_none());
}

#[test]
fn test_decode_stops_at_gap() {
    let platform = MemoryPlatform::new();
    let account = StoredAccount::new(
        JABBER_PROTOCOL,
        AccountProperties::from_iter([
            (properties::USER_ID, "alice@example.com"),
            ("STUN0.ADDRESS", "a.example.com"),
            ("STUN2.ADDRESS", "c.example.com"),
            ("JINGLE_NODES1.ADDRESS", "relay.example.com"),
        ]),
    );

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");

    assert_eq!(registration.stun_servers().len(), 1);
    assert!(registration.jingle_nodes().is_empty());
}

#[test]
fn test_media_disabled_keeps_default_encodings() {
    let platform = MemoryPlatform::with_locator(MemoryServiceLocator::failing());
    let account = persisted_account(&platform, 0, 0);

    let mut registration =
        AccountRegistration::new(RegistrationConfig::default().with_media_disabled(true));
    registration
        .load_account(&account, &platform)
        .expect("locator is never consulted");
    assert!(registration.encodings().priorities().is_empty());
}

#[test]
fn test_failing_locator_propagates() {
    let platform = MemoryPlatform::with_locator(MemoryServiceLocator::failing());
    let account = persisted_account(&platform, 0, 0);

    let mut registration = AccountRegistration::default();
    let err = registration
        .load_account(&account, &platform)
        .expect_err("locator fails");
    assert!(matches!(err, AccountError::ServiceLocator(_)));
}

#[test]
fn test_missing_media_service_uses_account_entries_only() {
    let platform = MemoryPlatform::with_locator(MemoryServiceLocator::default());
    let account = StoredAccount::new(
        JABBER_PROTOCOL,
        AccountProperties::from_iter([
            (properties::USER_ID, "alice@example.com"),
            ("Encodings.PCMU/8000", "10"),
        ]),
    );

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load");
    assert_eq!(registration.encodings().priorities().len(), 1);

    let media = MemoryPlatform::with_locator(MemoryServiceLocator::with_media(Arc::new(
        StaticMediaService::new(vec![("opus/48000".to_owned(), 750)]),
    )));
    let mut registration = AccountRegistration::default();
    registration.load_account(&account, &media).expect("load");
    assert_eq!(registration.encodings().priorities().len(), 2);
}

#[test]
fn test_store_writes_security_and_encodings() {
    let platform = MemoryPlatform::new();
    let mut registration = AccountRegistration::default();
    registration.set_user_id(Some("alice@example.com"));
    registration
        .security_mut()
        .set_savp_option(crate::security::SavpOption::Mandatory);

    let mut output = AccountProperties::new();
    registration
        .store_properties(&platform, &StoreRequest::default(), &mut output)
        .expect("store");

    assert_eq!(output.get(crate::security::SAVP_OPTION), Some("0"));
    assert_eq!(output.get(crate::encodings::OVERRIDE_ENCODINGS), Some("false"));
    assert_eq!(registration.properties().get(properties::USER_ID), Some("alice@example.com"));
}

#[test]
fn test_default_server() {
    let mut registration = AccountRegistration::default();
    assert_eq!(registration.default_server(), None);
    registration.set_user_id(Some("bob@gmail.com/phone"));
    assert_eq!(registration.default_server().as_deref(), Some("talk.google.com"));
}
