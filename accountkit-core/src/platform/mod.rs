//! Platform abstraction traits for account registration.
//!
//! The registration model never reaches into global state. Everything it
//! needs from the host application is injected through these traits:
//!
//! - [`PropertyStore`]: the persisted account configuration
//! - [`AccountLookup`]: maps an account UID to its persisted key
//! - [`PasswordLoader`] / [`StunPasswordLoader`]: the password vault
//! - [`ServiceLocator`]: optional runtime services such as [`MediaService`]
//!
//! [`AccountServices`] bundles them so a session can be handed one provider.
//!
//! # Platform Implementations
//!
//! ## Android (Kotlin)
//! - `PropertyStore` / `AccountLookup`: the configuration database
//! - `PasswordLoader`: `CredentialsStorageService`
//! - `ServiceLocator`: the service registry, returning no media service when
//!   media support failed to initialise
//!
//! ## Tests
//! - [`memory::MemoryPlatform`] provides in-memory versions of every trait.

mod credentials;
mod lookup;
pub mod memory;
mod property_store;
mod services;

pub use credentials::{PasswordLoader, StunPasswordLoader};
pub use lookup::AccountLookup;
pub use property_store::PropertyStore;
pub use services::{AccountServices, MediaService, ServiceLocator};

// Re-export memory implementations for testing
pub use memory::MemoryPlatform;
