mod common;

use accountkit_core::{
    AccountProperties, AccountRegistration, JingleNodeDescriptor, StoreRequest, StoredAccount,
    StunServerDescriptor, TransportProtocol, JABBER_PROTOCOL,
};
use secrecy::ExposeSecret;

fn modification() -> StoreRequest<'static> {
    StoreRequest {
        is_modification: true,
        ..StoreRequest::default()
    }
}

fn stun_addresses(props: &AccountProperties) -> Vec<&str> {
    props
        .with_prefix("STUN")
        .filter(|(key, _)| key.ends_with(".ADDRESS"))
        .map(|(_, value)| value)
        .collect()
}

#[test]
fn test_edit_session_end_to_end() {
    let platform = common::RecordingPlatform::new();
    let account = common::persist_alice(platform.memory(), 3, 2);
    platform
        .memory()
        .credentials()
        .store_stun_password(common::ALICE_UID, "STUN2", "turn-pass");

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load account");
    assert_eq!(registration.stun_servers().len(), 3);
    assert_eq!(registration.jingle_nodes().len(), 2);
    assert!(registration.stun_servers()[2].password().is_some());

    // Drop the middle server and promote the TURN one.
    registration.stun_servers_mut().remove(1);
    let turn = &mut registration.stun_servers_mut()[1];
    turn.set_turn_supported(true);
    turn.set_username(Some("alice"));
    turn.set_protocol(TransportProtocol::Tcp);
    registration.jingle_nodes_mut().truncate(1);

    let mut output = account.into_properties();
    registration
        .store_properties(&platform, &modification(), &mut output)
        .expect("store");

    assert_eq!(platform.recorder().lookups(), 1);
    assert_eq!(platform.recorder().deletes().len(), 3 * 3 + 2 * 2);
    assert_eq!(
        stun_addresses(&output),
        vec!["stun0.example.com", "stun2.example.com"]
    );
    assert_eq!(output.get("STUN1.PORT"), Some("3480"));
    assert_eq!(output.get("STUN1.PROTOCOL"), Some("tcp"));
    assert_eq!(output.get("STUN1.USERNAME"), Some("alice"));
    assert!(!output.contains_key("STUN2.ADDRESS"));
    assert!(!output.contains_key("JINGLE_NODES1.ADDRESS"));
    assert_eq!(output.get("SERVER_PORT"), Some("5222"));

    let credentials = registration.stun_credentials();
    assert_eq!(credentials.len(), 1);
    assert_eq!(credentials[0].0, "STUN1");
    assert_eq!(credentials[0].1.expose_secret(), "turn-pass");
    assert!(output.iter().all(|(_, value)| value != "turn-pass"));

    // The host persists the output; a fresh session reads back the edit.
    platform
        .memory()
        .store()
        .persist(common::ALICE_UID, &output)
        .expect("persist");
    let reloaded = StoredAccount::new(JABBER_PROTOCOL, common::persisted_alice(platform.memory()));
    let mut next = AccountRegistration::default();
    next.load_account(&reloaded, &platform).expect("reload");

    let summary = |servers: &[StunServerDescriptor]| {
        servers
            .iter()
            .map(|s| (s.address().to_owned(), s.port(), s.protocol(), s.is_turn_supported()))
            .collect::<Vec<_>>()
    };
    assert_eq!(summary(next.stun_servers()), summary(registration.stun_servers()));
    assert_eq!(next.stun_servers()[1].username(), Some("alice"));
    assert_eq!(
        next.jingle_nodes(),
        &[JingleNodeDescriptor::new("relay0.example.com", true)]
    );
}

#[test]
fn test_new_account_never_looks_up() {
    let platform = common::RecordingPlatform::new();

    let mut registration = AccountRegistration::default();
    registration.set_user_id(Some("dave@example.org"));
    registration.add_stun_server(StunServerDescriptor::new("stun.example.org", 3478));
    registration.add_jingle_node(JingleNodeDescriptor::new("relay.example.org", false));

    let mut output = AccountProperties::new();
    let request = StoreRequest {
        password: Some("pw"),
        protocol_icon_path: Some("icons/jabber.png"),
        ..StoreRequest::default()
    };
    registration
        .store_properties(&platform, &request, &mut output)
        .expect("store");

    assert_eq!(platform.recorder().lookups(), 0);
    assert!(platform.recorder().deletes().is_empty());
    assert!(stun_addresses(&output).is_empty());
    assert_eq!(output.get("PROTOCOL_ICON_PATH"), Some("icons/jabber.png"));
    assert_eq!(output.get("PASSWORD"), Some("pw"));
    assert_eq!(registration.default_server().as_deref(), Some("example.org"));
}

#[test]
fn test_rejected_store_commits_nothing() {
    let platform = common::RecordingPlatform::new();
    let account = common::persist_alice(platform.memory(), 2, 0);

    let mut registration = AccountRegistration::default();
    registration
        .load_account(&account, &platform)
        .expect("load account");
    registration.add_jingle_node(JingleNodeDescriptor::new("@broken", true));

    let mut output = account.into_properties();
    let before = output.clone();
    let err = registration
        .store_properties(&platform, &modification(), &mut output)
        .expect_err("invalid relay");

    assert!(err.is_configuration());
    assert!(platform.recorder().deletes().is_empty());
    assert_eq!(output, before);
    assert_eq!(
        stun_addresses(&common::persisted_alice(platform.memory())),
        vec!["stun0.example.com", "stun1.example.com"]
    );
}
