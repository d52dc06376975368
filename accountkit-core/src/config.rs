use crate::account::JABBER_PROTOCOL;
use crate::descriptor::{MAX_JN_RELAY_COUNT, MAX_STUN_SERVER_COUNT};

/// Settings for an [`crate::AccountRegistration`] session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationConfig {
    /// Protocol name used to resolve persisted accounts.
    pub protocol: String,
    /// Maximum number of STUN servers read back on load.
    pub max_stun_servers: usize,
    /// Maximum number of Jingle Nodes read back on load.
    pub max_jingle_nodes: usize,
    /// Set when the media engine failed to start; encoding settings are
    /// then left at their defaults on load.
    pub media_disabled: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            protocol: JABBER_PROTOCOL.to_owned(),
            max_stun_servers: MAX_STUN_SERVER_COUNT,
            max_jingle_nodes: MAX_JN_RELAY_COUNT,
            media_disabled: false,
        }
    }
}

impl RegistrationConfig {
    /// Returns this config with media support switched off.
    #[must_use]
    pub fn with_media_disabled(mut self, media_disabled: bool) -> Self {
        self.media_disabled = media_disabled;
        self
    }
}
