//! Registration model for XMPP messaging accounts.
//!
//! Captures the connectivity settings entered while creating or editing an
//! account (STUN/TURN servers, Jingle Nodes relays, media security and codec
//! priorities) and reconciles them with a flat, persisted property store.
//!
//! The host application supplies its storage, password vault and service
//! registry through the traits in [`platform`].
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod account;
pub use account::*;

pub mod codec;

mod config;
pub use config::*;

pub mod descriptor;
pub use descriptor::{JingleNodeDescriptor, StunServerDescriptor, TransportProtocol};

pub mod encodings;
pub use encodings::EncodingsRegistration;

mod error;
pub use error::*;

mod identity;
pub use identity::*;

pub mod jid;

pub mod logger;

pub mod platform;
pub use platform::{
    AccountLookup, AccountServices, MediaService, PasswordLoader, PropertyStore, ServiceLocator,
    StunPasswordLoader,
};

pub mod properties;
pub use properties::AccountProperties;

mod registration;
pub use registration::{AccountRegistration, StoreRequest};

pub mod security;
pub use security::{EncryptionProtocol, SavpOption, SecurityRegistration};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("accountkit_core");
