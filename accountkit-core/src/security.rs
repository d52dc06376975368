//! Media security settings of an account.

use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::account::AccountHandle;
use crate::properties::AccountProperties;

/// Whether calls are encrypted by default.
pub const DEFAULT_ENCRYPTION: &str = "DEFAULT_ENCRYPTION";
/// Whether the ZRTP hash is advertised in signalling.
pub const DEFAULT_SIPZRTP_ATTRIBUTE: &str = "DEFAULT_SIPZRTP_ATTRIBUTE";
/// RTP/SAVP indication mode.
pub const SAVP_OPTION: &str = "SAVP_OPTION";
/// Enabled SDES cipher suites, comma separated.
pub const SDES_CIPHER_SUITES: &str = "SDES_CIPHER_SUITES";
/// Prefix of `ENCRYPTION_PROTOCOL.<NAME> = <priority>` entries.
pub const ENCRYPTION_PROTOCOL: &str = "ENCRYPTION_PROTOCOL";
/// Prefix of `ENCRYPTION_PROTOCOL_STATUS.<NAME> = <bool>` entries.
pub const ENCRYPTION_PROTOCOL_STATUS: &str = "ENCRYPTION_PROTOCOL_STATUS";

/// Media encryption key-exchange protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EncryptionProtocol {
    /// ZRTP key agreement.
    Zrtp,
    /// SDES keys carried in signalling.
    Sdes,
    /// DTLS-SRTP.
    DtlsSrtp,
}

/// RTP/SAVP indication mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SavpOption {
    /// Plain RTP/AVP only.
    #[default]
    Off,
    /// RTP/SAVP only.
    Mandatory,
    /// Offer both.
    Optional,
}

impl SavpOption {
    /// Stored representation (`0`, `1`, `2`).
    #[must_use]
    pub const fn as_property(self) -> &'static str {
        match self {
            Self::Off => "0",
            Self::Mandatory => "1",
            Self::Optional => "2",
        }
    }

    /// Parses the stored representation.
    #[must_use]
    pub fn from_property(value: &str) -> Option<Self> {
        match value.trim() {
            "0" => Some(Self::Off),
            "1" => Some(Self::Mandatory),
            "2" => Some(Self::Optional),
            _ => None,
        }
    }
}

/// Security sub-registration: owns the encryption-related account keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRegistration {
    default_encryption: bool,
    sip_zrtp_attribute: bool,
    savp_option: SavpOption,
    savp_pinned: bool,
    sdes_cipher_suites: Option<String>,
    encryption_protocols: Vec<(EncryptionProtocol, bool)>,
}

impl Default for SecurityRegistration {
    fn default() -> Self {
        Self {
            default_encryption: true,
            sip_zrtp_attribute: true,
            savp_option: SavpOption::Off,
            savp_pinned: false,
            sdes_cipher_suites: None,
            encryption_protocols: default_protocols(),
        }
    }
}

fn default_protocols() -> Vec<(EncryptionProtocol, bool)> {
    EncryptionProtocol::iter()
        .map(|p| (p, p == EncryptionProtocol::Zrtp))
        .collect()
}

impl SecurityRegistration {
    /// Security settings for XMPP accounts.
    ///
    /// RTP/SAVP indication does not apply to Jingle, so it is pinned to
    /// [`SavpOption::Off`].
    #[must_use]
    pub fn xmpp() -> Self {
        Self {
            savp_pinned: true,
            ..Self::default()
        }
    }

    /// Whether calls are encrypted by default.
    #[must_use]
    pub const fn default_encryption(&self) -> bool {
        self.default_encryption
    }

    /// Sets default call encryption.
    pub fn set_default_encryption(&mut self, enabled: bool) {
        self.default_encryption = enabled;
    }

    /// Whether the ZRTP hash is advertised.
    #[must_use]
    pub const fn sip_zrtp_attribute(&self) -> bool {
        self.sip_zrtp_attribute
    }

    /// Sets ZRTP hash advertisement.
    pub fn set_sip_zrtp_attribute(&mut self, enabled: bool) {
        self.sip_zrtp_attribute = enabled;
    }

    /// RTP/SAVP indication mode.
    #[must_use]
    pub const fn savp_option(&self) -> SavpOption {
        if self.savp_pinned {
            SavpOption::Off
        } else {
            self.savp_option
        }
    }

    /// Sets the RTP/SAVP mode. Ignored for XMPP accounts.
    pub fn set_savp_option(&mut self, option: SavpOption) {
        if self.savp_pinned {
            log::debug!("ignoring SAVP option {option:?}: not applicable to this protocol");
            return;
        }
        self.savp_option = option;
    }

    /// Enabled SDES cipher suites.
    #[must_use]
    pub fn sdes_cipher_suites(&self) -> Option<&str> {
        self.sdes_cipher_suites.as_deref()
    }

    /// Sets the SDES cipher suites; empty clears them.
    pub fn set_sdes_cipher_suites(&mut self, suites: Option<&str>) {
        self.sdes_cipher_suites = suites
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
    }

    /// Encryption protocols in priority order with their enabled flag.
    #[must_use]
    pub fn encryption_protocols(&self) -> &[(EncryptionProtocol, bool)] {
        &self.encryption_protocols
    }

    /// Replaces the protocol priority list. Protocols left out are appended
    /// disabled.
    pub fn set_encryption_protocols(&mut self, protocols: Vec<(EncryptionProtocol, bool)>) {
        self.encryption_protocols = complete_protocols(protocols);
    }

    /// Enables or disables one protocol, keeping its priority.
    pub fn set_protocol_enabled(&mut self, protocol: EncryptionProtocol, enabled: bool) {
        for entry in &mut self.encryption_protocols {
            if entry.0 == protocol {
                entry.1 = enabled;
            }
        }
    }

    /// Loads the security settings of `account`.
    pub fn load(&mut self, account: &dyn AccountHandle) {
        let props = account.properties();
        self.default_encryption = props.get_bool(DEFAULT_ENCRYPTION, true);
        self.sip_zrtp_attribute = props.get_bool(DEFAULT_SIPZRTP_ATTRIBUTE, true);
        if !self.savp_pinned {
            self.savp_option = props
                .get(SAVP_OPTION)
                .and_then(SavpOption::from_property)
                .unwrap_or_default();
        }
        self.set_sdes_cipher_suites(props.get(SDES_CIPHER_SUITES));
        self.encryption_protocols = load_protocols(props);
    }

    /// Writes the security settings into `props`.
    pub fn store(&self, props: &mut AccountProperties) {
        props.insert(DEFAULT_ENCRYPTION, self.default_encryption.to_string());
        props.insert(DEFAULT_SIPZRTP_ATTRIBUTE, self.sip_zrtp_attribute.to_string());
        props.insert(SAVP_OPTION, self.savp_option().as_property());
        if let Some(suites) = &self.sdes_cipher_suites {
            props.insert(SDES_CIPHER_SUITES, suites.as_str());
        }
        for (priority, (protocol, enabled)) in self.encryption_protocols.iter().enumerate() {
            props.insert(
                format!("{ENCRYPTION_PROTOCOL}.{protocol}"),
                priority.to_string(),
            );
            props.insert(
                format!("{ENCRYPTION_PROTOCOL_STATUS}.{protocol}"),
                enabled.to_string(),
            );
        }
    }
}

fn load_protocols(props: &AccountProperties) -> Vec<(EncryptionProtocol, bool)> {
    let prefix = format!("{ENCRYPTION_PROTOCOL}.");
    let mut ranked: Vec<(u32, EncryptionProtocol)> = props
        .with_prefix(&prefix)
        .filter_map(|(key, value)| {
            let name = &key[prefix.len()..];
            let Ok(protocol) = EncryptionProtocol::from_str(name) else {
                log::warn!("ignoring unknown encryption protocol {name:?}");
                return None;
            };
            let priority = value.trim().parse::<u32>().ok()?;
            Some((priority, protocol))
        })
        .collect();

    if ranked.is_empty() {
        return default_protocols();
    }
    ranked.sort_by_key(|(priority, _)| *priority);

    complete_protocols(
        ranked
            .into_iter()
            .map(|(_, protocol)| {
                let status = format!("{ENCRYPTION_PROTOCOL_STATUS}.{protocol}");
                (protocol, props.get_bool(&status, false))
            })
            .collect(),
    )
}

fn complete_protocols(
    mut protocols: Vec<(EncryptionProtocol, bool)>,
) -> Vec<(EncryptionProtocol, bool)> {
    let mut seen = Vec::with_capacity(protocols.len());
    protocols.retain(|(p, _)| {
        if seen.contains(p) {
            false
        } else {
            seen.push(*p);
            true
        }
    });
    for protocol in EncryptionProtocol::iter() {
        if !seen.contains(&protocol) {
            protocols.push((protocol, false));
        }
    }
    protocols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{StoredAccount, JABBER_PROTOCOL};

    fn account(entries: &[(&str, &str)]) -> StoredAccount {
        StoredAccount::new(
            JABBER_PROTOCOL,
            entries.iter().copied().collect::<AccountProperties>(),
        )
    }

    #[test]
    fn test_defaults_store() {
        let mut props = AccountProperties::new();
        SecurityRegistration::xmpp().store(&mut props);

        assert_eq!(props.get(DEFAULT_ENCRYPTION), Some("true"));
        assert_eq!(props.get(SAVP_OPTION), Some("0"));
        assert_eq!(props.get("ENCRYPTION_PROTOCOL.ZRTP"), Some("0"));
        assert_eq!(props.get("ENCRYPTION_PROTOCOL.SDES"), Some("1"));
        assert_eq!(props.get("ENCRYPTION_PROTOCOL.DTLS_SRTP"), Some("2"));
        assert_eq!(props.get("ENCRYPTION_PROTOCOL_STATUS.ZRTP"), Some("true"));
        assert_eq!(props.get("ENCRYPTION_PROTOCOL_STATUS.SDES"), Some("false"));
    }

    #[test]
    fn test_xmpp_pins_savp_off() {
        let mut security = SecurityRegistration::xmpp();
        security.set_savp_option(SavpOption::Mandatory);
        assert_eq!(security.savp_option(), SavpOption::Off);

        security.load(&account(&[(SAVP_OPTION, "2")]));
        assert_eq!(security.savp_option(), SavpOption::Off);

        let mut generic = SecurityRegistration::default();
        generic.load(&account(&[(SAVP_OPTION, "2")]));
        assert_eq!(generic.savp_option(), SavpOption::Optional);
    }

    #[test]
    fn test_load_orders_protocols_by_priority() {
        let mut security = SecurityRegistration::xmpp();
        security.load(&account(&[
            ("ENCRYPTION_PROTOCOL.DTLS_SRTP", "0"),
            ("ENCRYPTION_PROTOCOL.ZRTP", "1"),
            ("ENCRYPTION_PROTOCOL_STATUS.DTLS_SRTP", "true"),
            ("ENCRYPTION_PROTOCOL.BOGUS", "2"),
            (DEFAULT_ENCRYPTION, "false"),
            (SDES_CIPHER_SUITES, "AES_CM_128_HMAC_SHA1_80"),
        ]));

        assert_eq!(
            security.encryption_protocols(),
            &[
                (EncryptionProtocol::DtlsSrtp, true),
                (EncryptionProtocol::Zrtp, false),
                (EncryptionProtocol::Sdes, false),
            ]
        );
        assert!(!security.default_encryption());
        assert_eq!(security.sdes_cipher_suites(), Some("AES_CM_128_HMAC_SHA1_80"));
    }

    #[test]
    fn test_set_protocols_deduplicates() {
        let mut security = SecurityRegistration::default();
        security.set_encryption_protocols(vec![
            (EncryptionProtocol::Sdes, true),
            (EncryptionProtocol::Sdes, false),
        ]);
        assert_eq!(
            security.encryption_protocols(),
            &[
                (EncryptionProtocol::Sdes, true),
                (EncryptionProtocol::Zrtp, false),
                (EncryptionProtocol::DtlsSrtp, false),
            ]
        );
        security.set_protocol_enabled(EncryptionProtocol::Zrtp, true);
        assert_eq!(security.encryption_protocols()[1], (EncryptionProtocol::Zrtp, true));
    }
}
