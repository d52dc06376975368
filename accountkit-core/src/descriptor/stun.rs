use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use strum::{Display, EnumString};

use super::{non_blank, secret};
use crate::codec::{field_key, IndexedDescriptor};
use crate::error::{AccountError, AccountResult};
use crate::properties::AccountProperties;

/// Prefix of the STUN/TURN server list.
pub const STUN_PREFIX: &str = "STUN";
/// Upper bound on stored STUN servers.
pub const MAX_STUN_SERVER_COUNT: usize = 100;
/// Port used when none is stored.
pub const DEFAULT_STUN_PORT: u16 = 3478;

const ADDRESS: &str = "ADDRESS";
const PORT: &str = "PORT";
const USERNAME: &str = "USERNAME";
const IS_TURN_SUPPORTED: &str = "IS_TURN_SUPPORTED";
const PROTOCOL: &str = "PROTOCOL";

/// Transport used to reach a STUN/TURN server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TransportProtocol {
    /// Plain UDP.
    #[default]
    Udp,
    /// TCP.
    Tcp,
    /// TLS over TCP.
    Tls,
}

/// A user-supplied STUN (optionally TURN) server.
///
/// The password is never written to the property map; it lives in the
/// password vault keyed by the entry prefix and is attached on load.
#[derive(Debug)]
pub struct StunServerDescriptor {
    address: String,
    port: u16,
    turn_supported: bool,
    username: Option<String>,
    password: Option<SecretString>,
    protocol: TransportProtocol,
}

impl StunServerDescriptor {
    /// Creates a STUN server entry for `address:port`.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            turn_supported: false,
            username: None,
            password: None,
            protocol: TransportProtocol::default(),
        }
    }

    /// Creates a TURN-capable entry with credentials.
    pub fn turn(
        address: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: &str,
    ) -> Self {
        Self {
            turn_supported: true,
            username: Some(username.into()),
            password: Some(secret(password)),
            ..Self::new(address, port)
        }
    }

    /// Server host name or IP address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the server also relays media (TURN).
    #[must_use]
    pub const fn is_turn_supported(&self) -> bool {
        self.turn_supported
    }

    /// Sets TURN support.
    pub fn set_turn_supported(&mut self, turn_supported: bool) {
        self.turn_supported = turn_supported;
    }

    /// TURN username.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Sets the TURN username; empty clears it.
    pub fn set_username(&mut self, username: Option<&str>) {
        self.username = non_blank(username).map(str::to_owned);
    }

    /// TURN password, if attached.
    #[must_use]
    pub const fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    /// Attaches the TURN password.
    pub fn set_password(&mut self, password: SecretString) {
        self.password = Some(password);
    }

    /// Transport protocol.
    #[must_use]
    pub const fn protocol(&self) -> TransportProtocol {
        self.protocol
    }

    /// Sets the transport protocol.
    pub fn set_protocol(&mut self, protocol: TransportProtocol) {
        self.protocol = protocol;
    }
}

impl IndexedDescriptor for StunServerDescriptor {
    fn store_descriptor(&self, props: &mut AccountProperties, entry_prefix: &str) {
        props.insert(field_key(entry_prefix, ADDRESS), self.address.trim());
        props.insert(field_key(entry_prefix, PORT), self.port.to_string());
        props.insert(
            field_key(entry_prefix, IS_TURN_SUPPORTED),
            self.turn_supported.to_string(),
        );
        props.insert(field_key(entry_prefix, PROTOCOL), self.protocol.to_string());
        if let Some(username) = &self.username {
            props.insert(field_key(entry_prefix, USERNAME), username.as_str());
        }
    }

    fn load_descriptor(props: &AccountProperties, entry_prefix: &str) -> Option<Self> {
        let address = non_blank(props.get(&field_key(entry_prefix, ADDRESS)))?;

        let port = match props.get(&field_key(entry_prefix, PORT)) {
            None => DEFAULT_STUN_PORT,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("ignoring malformed port {raw:?} for {entry_prefix}");
                DEFAULT_STUN_PORT
            }),
        };
        let protocol = props
            .get(&field_key(entry_prefix, PROTOCOL))
            .and_then(|raw| TransportProtocol::from_str(raw.trim()).ok())
            .unwrap_or_default();

        Some(Self {
            address: address.to_owned(),
            port,
            turn_supported: props.get_bool(&field_key(entry_prefix, IS_TURN_SUPPORTED), false),
            username: non_blank(props.get(&field_key(entry_prefix, USERNAME))).map(str::to_owned),
            password: None,
            protocol,
        })
    }

    fn validate(&self, entry_prefix: &str) -> AccountResult<()> {
        if self.address.trim().is_empty() {
            return Err(AccountError::configuration(
                field_key(entry_prefix, ADDRESS),
                "STUN server address is empty",
            ));
        }
        if self.address.chars().any(char::is_whitespace) {
            return Err(AccountError::configuration(
                field_key(entry_prefix, ADDRESS),
                "STUN server address contains whitespace",
            ));
        }
        if self.port == 0 {
            return Err(AccountError::configuration(
                field_key(entry_prefix, PORT),
                "port 0 is not usable",
            ));
        }
        if self.turn_supported && self.password.is_some() && self.username.is_none() {
            return Err(AccountError::configuration(
                field_key(entry_prefix, USERNAME),
                "TURN password given without a username",
            ));
        }
        Ok(())
    }
}

impl Clone for StunServerDescriptor {
    fn clone(&self) -> Self {
        Self {
            address: self.address.clone(),
            port: self.port,
            turn_supported: self.turn_supported,
            username: self.username.clone(),
            password: self.password.as_ref().map(|p| secret(p.expose_secret())),
            protocol: self.protocol,
        }
    }
}

impl PartialEq for StunServerDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.port == other.port
            && self.turn_supported == other.turn_supported
            && self.username == other.username
            && self.protocol == other.protocol
            && self.password.as_ref().map(|p| p.expose_secret())
                == other.password.as_ref().map(|p| p.expose_secret())
    }
}

impl Eq for StunServerDescriptor {}
