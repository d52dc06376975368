//! Helpers for XMPP addresses (`local@domain/resource`).

/// Domain that users type for Google Talk accounts.
pub const GOOGLE_USER_SUFFIX: &str = "gmail.com";
/// Server that actually serves [`GOOGLE_USER_SUFFIX`] accounts.
pub const GOOGLE_CONNECT_SRV: &str = "talk.google.com";

/// Returns the domain part of a `local@domain[/resource]` user id.
///
/// Returns `None` when there is no `@` before the resource or the domain is
/// empty.
#[must_use]
pub fn parse_domain(user_id: &str) -> Option<&str> {
    let bare = user_id.split_once('/').map_or(user_id, |(bare, _)| bare);
    let (_, domain) = bare.split_once('@')?;
    let domain = domain.trim();
    (!domain.is_empty()).then_some(domain)
}

/// Returns the server to connect to for `user_name`.
///
/// This is the domain of the user id, except for reserved alias domains that
/// are served by a different host.
#[must_use]
#[cfg_attr(feature = "ffi", uniffi::export)]
pub fn server_from_user_name(user_name: &str) -> Option<String> {
    let domain = parse_domain(user_name)?;
    if domain.eq_ignore_ascii_case(GOOGLE_USER_SUFFIX) {
        Some(GOOGLE_CONNECT_SRV.to_owned())
    } else {
        Some(domain.to_owned())
    }
}
