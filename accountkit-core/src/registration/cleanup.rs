//! Removal of persisted STUN/Jingle Nodes entries before a list is re-encoded.
//!
//! Re-encoding a shorter list only overwrites indices `0..len`, so the
//! previous tail must be deleted or it would be read back after a later
//! gap-free extension. Cleanup is split into a plan, computed before any
//! validation runs, and [`CleanupPlan::apply`], called only once the staged
//! output is known to be valid.

use std::sync::Arc;

use crate::account::AccountKey;
use crate::codec::is_indexed_key;
use crate::descriptor::{JN_PREFIX, STUN_PREFIX};
use crate::error::AccountResult;
use crate::platform::{AccountServices, PropertyStore};
use crate::properties::AccountProperties;

/// Returns `true` for keys owned by the STUN or Jingle Nodes lists.
pub(super) fn is_list_key(name: &str) -> bool {
    is_indexed_key(STUN_PREFIX, name) || is_indexed_key(JN_PREFIX, name)
}

/// Persisted list entries scheduled for deletion.
pub(super) struct CleanupPlan {
    store: Arc<dyn PropertyStore>,
    key: AccountKey,
    stale: Vec<String>,
}

impl CleanupPlan {
    /// Plans the cleanup for the edited account `account_uid`.
    ///
    /// Returns `None` when the account has never been persisted; there is
    /// nothing to orphan in that case.
    pub(super) fn prepare(
        services: &dyn AccountServices,
        protocol: &str,
        account_uid: &str,
    ) -> AccountResult<Option<Self>> {
        let Some(key) = services.account_lookup().resolve(protocol, account_uid)? else {
            log::debug!("no persisted account for {account_uid}; skipping list cleanup");
            return Ok(None);
        };
        let store = services.property_store();
        let stale = store.names_matching(&key, &is_list_key)?;
        Ok(Some(Self { store, key, stale }))
    }

    /// Drops list entries from a copy of the caller's output map.
    pub(super) fn purge_output(output: &mut AccountProperties) -> usize {
        output.remove_where(is_list_key)
    }

    /// Deletes the stale entries from the persisted store.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failed delete.
    pub(super) fn apply(self) -> AccountResult<()> {
        for name in &self.stale {
            self.store.delete(&self.key, name)?;
        }
        log::debug!(
            "removed {} persisted list entries from {}",
            self.stale.len(),
            self.key
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_list_key() {
        assert!(is_list_key("STUN0.ADDRESS"));
        assert!(is_list_key("JINGLE_NODES4.IS_RELAY_SUPPORTED"));
        assert!(!is_list_key("USER_ID"));
        assert!(!is_list_key("AUTO_DISCOVER_STUN"));
        assert!(!is_list_key("JINGLE_NODES_ENABLED"));
    }

    #[test]
    fn test_purge_output() {
        let mut output = AccountProperties::from_iter([
            ("STUN0.ADDRESS", "a"),
            ("STUN1.ADDRESS", "b"),
            ("JINGLE_NODES0.ADDRESS", "c"),
            ("USER_ID", "alice@example.com"),
        ]);
        assert_eq!(CleanupPlan::purge_output(&mut output), 3);
        assert_eq!(output.keys().collect::<Vec<_>>(), vec!["USER_ID"]);
    }
}
