//! Descriptors stored in indexed property lists.

mod jingle_node;
mod stun;

pub use jingle_node::{JingleNodeDescriptor, JN_PREFIX, MAX_JN_RELAY_COUNT};
pub use stun::{
    StunServerDescriptor, TransportProtocol, DEFAULT_STUN_PORT, MAX_STUN_SERVER_COUNT, STUN_PREFIX,
};

use secrecy::SecretString;

/// Wraps `value` as a secret.
pub(crate) fn secret(value: &str) -> SecretString {
    SecretString::new(value.into())
}

/// Returns a trimmed, non-empty field value.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
