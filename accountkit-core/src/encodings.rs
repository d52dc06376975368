//! Per-account codec priority overrides.

use std::collections::BTreeMap;

use crate::account::AccountHandle;
use crate::platform::MediaService;
use crate::properties::AccountProperties;

/// Whether the account overrides the global encoding priorities.
pub const OVERRIDE_ENCODINGS: &str = "OVERRIDE_ENCODINGS";
/// Prefix of `Encodings.<name>/<clock rate> = <priority>` entries.
pub const ENCODING_PROP_PREFIX: &str = "Encodings";

/// Encodings sub-registration.
///
/// Priorities are only written out while [`override_encodings`] is set; an
/// account without the override follows the media engine's global table.
///
/// [`override_encodings`]: EncodingsRegistration::override_encodings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingsRegistration {
    override_encodings: bool,
    priorities: BTreeMap<String, u32>,
}

impl EncodingsRegistration {
    /// Whether this account overrides the global encoding table.
    #[must_use]
    pub const fn override_encodings(&self) -> bool {
        self.override_encodings
    }

    /// Enables or disables the override.
    pub fn set_override_encodings(&mut self, enabled: bool) {
        self.override_encodings = enabled;
    }

    /// Priority per encoding. `0` disables an encoding.
    #[must_use]
    pub const fn priorities(&self) -> &BTreeMap<String, u32> {
        &self.priorities
    }

    /// Sets the priority of `encoding` (e.g. `opus/48000`).
    pub fn set_priority(&mut self, encoding: impl Into<String>, priority: u32) {
        self.priorities.insert(encoding.into(), priority);
    }

    /// Loads the encoding settings of `account`.
    ///
    /// Defaults come from `media_service` when one is available; the
    /// account's own entries take precedence.
    pub fn load(&mut self, account: &dyn AccountHandle, media_service: Option<&dyn MediaService>) {
        let props = account.properties();
        self.override_encodings = props.get_bool(OVERRIDE_ENCODINGS, false);

        self.priorities = media_service
            .map(|media| media.default_encoding_priorities().into_iter().collect())
            .unwrap_or_default();

        let prefix = format!("{ENCODING_PROP_PREFIX}.");
        for (key, value) in props.with_prefix(&prefix) {
            let encoding = &key[prefix.len()..];
            match value.trim().parse::<u32>() {
                Ok(priority) => {
                    self.priorities.insert(encoding.to_owned(), priority);
                }
                Err(_) => log::warn!("ignoring malformed priority {value:?} for {encoding}"),
            }
        }
    }

    /// Writes the encoding settings into `props`.
    pub fn store(&self, props: &mut AccountProperties) {
        props.insert(OVERRIDE_ENCODINGS, self.override_encodings.to_string());
        if self.override_encodings {
            for (encoding, priority) in &self.priorities {
                props.insert(
                    format!("{ENCODING_PROP_PREFIX}.{encoding}"),
                    priority.to_string(),
                );
            }
        }
    }
}
