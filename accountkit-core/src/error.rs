use thiserror::Error;

/// Result type for account registration operations.
pub type AccountResult<T> = Result<T, AccountError>;

/// Error outputs from `AccountKit`
#[derive(Debug, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum AccountError {
    /// A staged property value failed structural validation. Nothing was
    /// committed to the persisted store.
    #[error("configuration_error: {key}: {reason}")]
    Configuration {
        /// Property key (or entry prefix) holding the invalid value.
        key: String,
        /// Description of the problem.
        reason: String,
    },
    /// The persisted property store could not be read or updated.
    #[error("property_store_error: {0}")]
    PropertyStore(String),
    /// Resolving a persisted account key failed.
    #[error("account_lookup_error: {0}")]
    AccountLookup(String),
    /// The password vault refused or failed a lookup.
    #[error("credentials_error: {0}")]
    Credentials(String),
    /// A required runtime service could not be located.
    #[error("service_locator_error: {0}")]
    ServiceLocator(String),
}

impl AccountError {
    /// Creates a [`AccountError::Configuration`] error.
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a structural validation failure.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
