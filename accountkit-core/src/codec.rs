//! Indexed-list property codec.
//!
//! An ordered list of descriptors is flattened into a property map by writing
//! entry `i` under keys of the form `<prefix><i>.<field>`:
//!
//! ```text
//! STUN0.ADDRESS            = stun.example.com
//! STUN0.PORT               = 3478
//! STUN1.ADDRESS            = turn.example.com
//! STUN1.IS_TURN_SUPPORTED  = true
//! ```
//!
//! Indices are unpadded and contiguous from `0`. Decoding stops at the first
//! index that yields no descriptor, so gaps are never produced and a stale
//! tail after a gap is never read back.

use crate::error::{AccountError, AccountResult};
use crate::properties::AccountProperties;

/// A record that can be stored at one index of an indexed list.
pub trait IndexedDescriptor: Sized {
    /// Writes this descriptor's fields under `entry_prefix` (e.g. `STUN0`).
    fn store_descriptor(&self, props: &mut AccountProperties, entry_prefix: &str);

    /// Reads a descriptor stored under `entry_prefix`.
    ///
    /// Returns `None` when no descriptor is stored there; this is how list
    /// decoding detects the end of the list.
    fn load_descriptor(props: &AccountProperties, entry_prefix: &str) -> Option<Self>;

    /// Checks that the descriptor can be stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AccountError::Configuration`] if a required field is
    /// missing or malformed.
    fn validate(&self, entry_prefix: &str) -> AccountResult<()>;
}

/// Returns the entry prefix for index `index`, e.g. `STUN2`.
#[must_use]
pub fn entry_prefix(list_prefix: &str, index: usize) -> String {
    format!("{list_prefix}{index}")
}

/// Returns the full key of `field` under `entry_prefix`, e.g. `STUN2.PORT`.
#[must_use]
pub fn field_key(entry_prefix: &str, field: &str) -> String {
    format!("{entry_prefix}.{field}")
}

/// Returns `true` if `key` has the shape `<list_prefix><digits>.<field>`.
#[must_use]
pub fn is_indexed_key(list_prefix: &str, key: &str) -> bool {
    let Some(rest) = key.strip_prefix(list_prefix) else {
        return false;
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && rest.as_bytes().get(digits) == Some(&b'.')
}

/// Writes `list` under `list_prefix`, starting at index 0.
///
/// Entries beyond `list.len()` that already exist in `props` are left alone;
/// callers replacing a longer list must remove the old range first.
pub fn encode<D: IndexedDescriptor>(list: &[D], list_prefix: &str, props: &mut AccountProperties) {
    for (index, descriptor) in list.iter().enumerate() {
        descriptor.store_descriptor(props, &entry_prefix(list_prefix, index));
    }
}

/// Validates every entry of `list` as it would be encoded under `list_prefix`.
///
/// A list longer than `max_count` is rejected, since [`decode`] would never
/// read the tail back.
///
/// # Errors
///
/// Returns [`AccountError::Configuration`] for an overlong list, otherwise
/// the first validation failure.
pub fn validate<D: IndexedDescriptor>(
    list: &[D],
    list_prefix: &str,
    max_count: usize,
) -> AccountResult<()> {
    if list.len() > max_count {
        return Err(AccountError::configuration(
            list_prefix,
            format!("{} entries exceed the limit of {max_count}", list.len()),
        ));
    }
    list.iter()
        .enumerate()
        .try_for_each(|(index, d)| d.validate(&entry_prefix(list_prefix, index)))
}

/// Reads the list stored under `list_prefix`, at most `max_count` entries.
#[must_use]
pub fn decode<D: IndexedDescriptor>(
    props: &AccountProperties,
    list_prefix: &str,
    max_count: usize,
) -> Vec<D> {
    entries(props, list_prefix, max_count)
        .map(|(_, descriptor)| descriptor)
        .collect()
}

/// Iterates over `(entry_prefix, descriptor)` pairs stored under `list_prefix`.
///
/// Yields indices `0, 1, ...` and ends at the first missing index or after
/// `max_count` entries.
pub fn entries<'a, D: IndexedDescriptor>(
    props: &'a AccountProperties,
    list_prefix: &'a str,
    max_count: usize,
) -> IndexedEntries<'a, D> {
    IndexedEntries {
        props,
        list_prefix,
        next_index: 0,
        max_count,
        done: false,
        _descriptor: std::marker::PhantomData,
    }
}

/// Iterator returned by [`entries`].
pub struct IndexedEntries<'a, D> {
    props: &'a AccountProperties,
    list_prefix: &'a str,
    next_index: usize,
    max_count: usize,
    done: bool,
    _descriptor: std::marker::PhantomData<D>,
}

impl<D: IndexedDescriptor> Iterator for IndexedEntries<'_, D> {
    type Item = (String, D);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_index >= self.max_count {
            return None;
        }
        let prefix = entry_prefix(self.list_prefix, self.next_index);
        if let Some(descriptor) = D::load_descriptor(self.props, &prefix) {
            self.next_index += 1;
            Some((prefix, descriptor))
        } else {
            log::debug!("indexed list {} ends at {}", self.list_prefix, self.next_index);
            self.done = true;
            None
        }
    }
}

impl<D: IndexedDescriptor> std::iter::FusedIterator for IndexedEntries<'_, D> {}
