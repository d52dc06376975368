//! The account registration model behind the account setup and edit flows.

mod cleanup;
#[cfg(test)]
mod tests;

use secrecy::{ExposeSecret, SecretString};

use self::cleanup::CleanupPlan;
use crate::account::AccountHandle;
use crate::codec;
use crate::config::RegistrationConfig;
use crate::descriptor::{secret, JingleNodeDescriptor, StunServerDescriptor, JN_PREFIX, STUN_PREFIX};
use crate::encodings::EncodingsRegistration;
use crate::error::{AccountError, AccountResult};
use crate::identity::AccountIdentity;
use crate::jid;
use crate::platform::AccountServices;
use crate::properties::{self, AccountProperties};
use crate::security::SecurityRegistration;

/// Caller-supplied inputs of [`AccountRegistration::store_properties`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreRequest<'a> {
    /// Password typed by the user. Dropped unless the password is remembered.
    pub password: Option<&'a str>,
    /// Protocol icon to record, if any.
    pub protocol_icon_path: Option<&'a str>,
    /// Account icon to record, if any.
    pub account_icon_path: Option<&'a str>,
    /// `true` when editing an account that was loaded with
    /// [`AccountRegistration::load_account`].
    pub is_modification: bool,
}

/// All user input of an account setup or edit session.
///
/// A registration is created for one session, filled either from user input
/// or with [`load_account`](Self::load_account), and discarded after
/// [`store_properties`](Self::store_properties) succeeds. Loading merges
/// persisted properties *under* whatever the scratch buffer already holds,
/// so reusing an instance across sessions would carry stale values forward.
#[derive(Debug)]
pub struct AccountRegistration {
    config: RegistrationConfig,
    identity: AccountIdentity,
    user_id: Option<String>,
    password: Option<SecretString>,
    remember_password: bool,
    edited_account_uid: Option<String>,
    stun_servers: Vec<StunServerDescriptor>,
    jingle_nodes: Vec<JingleNodeDescriptor>,
    security: SecurityRegistration,
    encodings: EncodingsRegistration,
    settings: AccountProperties,
    properties: AccountProperties,
}

impl Default for AccountRegistration {
    fn default() -> Self {
        Self::new(RegistrationConfig::default())
    }
}

impl AccountRegistration {
    /// Creates an empty registration for a new account.
    #[must_use]
    pub fn new(config: RegistrationConfig) -> Self {
        Self {
            identity: AccountIdentity::new(config.protocol.clone()),
            config,
            user_id: None,
            password: None,
            remember_password: true,
            edited_account_uid: None,
            stun_servers: Vec::new(),
            jingle_nodes: Vec::new(),
            security: SecurityRegistration::xmpp(),
            encodings: EncodingsRegistration::default(),
            settings: AccountProperties::new(),
            properties: AccountProperties::new(),
        }
    }

    /// Session settings.
    #[must_use]
    pub const fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// The user identifier (`local@domain`).
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Sets the user identifier; empty clears it.
    pub fn set_user_id(&mut self, user_id: Option<&str>) {
        self.user_id = user_id.filter(|u| !u.is_empty()).map(str::to_owned);
    }

    /// The password, present only while it is remembered.
    #[must_use]
    pub const fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    /// Sets the password. Ignored while the password is not remembered.
    pub fn set_password(&mut self, password: Option<SecretString>) {
        if self.remember_password {
            self.password = password;
        } else {
            self.password = None;
        }
    }

    /// Whether the password is kept.
    #[must_use]
    pub const fn remember_password(&self) -> bool {
        self.remember_password
    }

    /// Sets whether the password is kept; `false` clears it.
    pub fn set_remember_password(&mut self, remember: bool) {
        self.remember_password = remember;
        if !remember {
            self.password = None;
        }
    }

    /// Unique id of the account being edited; `None` for a new account.
    #[must_use]
    pub fn account_unique_id(&self) -> Option<&str> {
        self.edited_account_uid.as_deref()
    }

    /// User-supplied STUN/TURN servers, in priority order.
    #[must_use]
    pub fn stun_servers(&self) -> &[StunServerDescriptor] {
        &self.stun_servers
    }

    /// Mutable access to the STUN server list.
    pub fn stun_servers_mut(&mut self) -> &mut Vec<StunServerDescriptor> {
        &mut self.stun_servers
    }

    /// Appends a STUN server.
    pub fn add_stun_server(&mut self, server: StunServerDescriptor) {
        self.stun_servers.push(server);
    }

    /// User-supplied Jingle Nodes, in priority order.
    #[must_use]
    pub fn jingle_nodes(&self) -> &[JingleNodeDescriptor] {
        &self.jingle_nodes
    }

    /// Mutable access to the Jingle Nodes list.
    pub fn jingle_nodes_mut(&mut self) -> &mut Vec<JingleNodeDescriptor> {
        &mut self.jingle_nodes
    }

    /// Appends a Jingle Node.
    pub fn add_jingle_node(&mut self, node: JingleNodeDescriptor) {
        self.jingle_nodes.push(node);
    }

    /// Security settings.
    #[must_use]
    pub const fn security(&self) -> &SecurityRegistration {
        &self.security
    }

    /// Mutable security settings.
    pub fn security_mut(&mut self) -> &mut SecurityRegistration {
        &mut self.security
    }

    /// Encoding settings.
    #[must_use]
    pub const fn encodings(&self) -> &EncodingsRegistration {
        &self.encodings
    }

    /// Mutable encoding settings.
    pub fn encodings_mut(&mut self) -> &mut EncodingsRegistration {
        &mut self.encodings
    }

    /// Scratch properties: the merged account properties after a load, the
    /// staged properties after a store.
    #[must_use]
    pub const fn properties(&self) -> &AccountProperties {
        &self.properties
    }

    /// Looks up a property, preferring values set in this session over the
    /// ones merged in by [`load_account`](Self::load_account).
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.settings.get(key).or_else(|| self.properties.get(key))
    }

    /// Sets a property not owned by any typed field (e.g. `SERVER_ADDRESS`).
    ///
    /// Such settings are written on every store; `None` or an empty value
    /// drops a previous setting.
    pub fn set_property(&mut self, key: &str, value: Option<&str>) {
        self.settings.set_or_remove_if_empty(key, value);
    }

    /// Baseline identity configuration.
    #[must_use]
    pub const fn identity(&self) -> &AccountIdentity {
        &self.identity
    }

    /// Server to connect to, derived from the user id.
    #[must_use]
    pub fn default_server(&self) -> Option<String> {
        self.user_id().and_then(jid::server_from_user_name)
    }

    /// TURN passwords to hand to the password vault, keyed by entry prefix
    /// (`STUN0`, `STUN1`, ...). These are never written to the properties.
    #[must_use]
    pub fn stun_credentials(&self) -> Vec<(String, &SecretString)> {
        self.stun_servers
            .iter()
            .enumerate()
            .filter_map(|(index, server)| {
                server
                    .password()
                    .map(|password| (codec::entry_prefix(STUN_PREFIX, index), password))
            })
            .collect()
    }

    /// Fills this registration from a persisted account.
    ///
    /// The account's properties are merged into the scratch buffer without
    /// overwriting entries already present, then the typed fields and both
    /// lists are decoded from the merged buffer.
    ///
    /// # Errors
    ///
    /// Returns the first failing capability call (password vault or service
    /// locator). The registration may be partly filled in that case.
    pub fn load_account(
        &mut self,
        account: &dyn AccountHandle,
        services: &dyn AccountServices,
    ) -> AccountResult<()> {
        self.properties.merge_missing(account.properties());

        self.set_user_id(account.user_id());
        self.edited_account_uid = Some(account.account_unique_id().to_owned());
        let password = services.password_loader().load(account)?;
        self.remember_password = account.is_password_persistent();
        self.password = password.filter(|_| self.remember_password);

        self.security.load(account);

        let stun_passwords = services.stun_password_loader();
        self.stun_servers.clear();
        for (entry_prefix, mut server) in codec::entries::<StunServerDescriptor>(
            &self.properties,
            STUN_PREFIX,
            self.config.max_stun_servers,
        ) {
            if let Some(password) = stun_passwords.load(account, &entry_prefix)? {
                server.set_password(password);
            }
            self.stun_servers.push(server);
        }

        self.jingle_nodes = codec::decode(&self.properties, JN_PREFIX, self.config.max_jingle_nodes);

        if self.config.media_disabled {
            log::debug!("media disabled; keeping default encodings");
        } else {
            let media = services.service_locator().media_service()?;
            self.encodings.load(account, media.as_deref());
        }

        log::debug!(
            "loaded {} with {} STUN servers and {} Jingle Nodes",
            account.account_unique_id(),
            self.stun_servers.len(),
            self.jingle_nodes.len()
        );
        Ok(())
    }

    /// Writes this registration into `output`, ready for persistence.
    ///
    /// For a modification of a persisted account, every STUN and Jingle
    /// Nodes entry is first removed from the persisted store and from
    /// `output`, and both lists are re-encoded from index 0. New accounts
    /// carry no list entries.
    ///
    /// A list entry is a key of the form `<prefix><digits>.<field>` (e.g.
    /// `STUN3.PORT`, `JINGLE_NODES0.ADDRESS`). Other keys that merely start
    /// with `STUN` or `JINGLE_NODES`, such as `JINGLE_NODES_ENABLED`, are
    /// kept.
    ///
    /// The result is fully staged and validated before anything is deleted
    /// from the store or written to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Configuration`] if a staged value is invalid
    /// or a list holds more entries than the session config reads back;
    /// neither the store nor `output` is touched then. Capability failures
    /// are returned as-is.
    pub fn store_properties(
        &mut self,
        services: &dyn AccountServices,
        request: &StoreRequest<'_>,
        output: &mut AccountProperties,
    ) -> AccountResult<()> {
        self.properties.clear();
        self.password = if self.remember_password {
            request.password.map(secret)
        } else {
            None
        };

        let mut staged = self.settings.clone();
        staged.set_or_remove_if_empty(properties::USER_ID, self.user_id.as_deref());
        staged.set_or_remove_if_empty(
            properties::PASSWORD,
            self.password.as_ref().map(|p| p.expose_secret()),
        );

        let cleanup = match self.edited_account_uid.as_deref() {
            Some(uid) if request.is_modification && !uid.is_empty() => {
                CleanupPlan::prepare(services, self.identity.protocol(), uid)?
            }
            _ => None,
        };
        if cleanup.is_some() {
            codec::validate(&self.stun_servers, STUN_PREFIX, self.config.max_stun_servers)?;
            codec::validate(&self.jingle_nodes, JN_PREFIX, self.config.max_jingle_nodes)?;
            codec::encode(&self.stun_servers, STUN_PREFIX, &mut staged);
            codec::encode(&self.jingle_nodes, JN_PREFIX, &mut staged);
        }

        self.security.store(&mut staged);
        self.encodings.store(&mut staged);
        validate_staged(&staged)?;

        let mut next_output = output.clone();
        if cleanup.is_some() {
            let purged = CleanupPlan::purge_output(&mut next_output);
            log::debug!("dropped {purged} list entries from the output map");
        }
        if self.password.is_none() {
            next_output.remove(properties::PASSWORD);
        }
        let mut identity = self.identity.clone();
        identity.store_properties(
            request.protocol_icon_path,
            request.account_icon_path,
            staged.clone(),
            &mut next_output,
        );

        if let Some(plan) = cleanup {
            plan.apply()?;
        }
        self.identity = identity;
        self.properties = staged;
        *output = next_output;
        Ok(())
    }
}

/// Rejects staged entries that cannot be persisted as flat properties.
fn validate_staged(staged: &AccountProperties) -> AccountResult<()> {
    for (key, value) in staged.iter() {
        if key.trim().is_empty() || key.contains(char::is_whitespace) {
            return Err(AccountError::configuration(key, "malformed property name"));
        }
        if value.contains(|c: char| c == '\n' || c == '\r' || c == '\0') {
            return Err(AccountError::configuration(
                key,
                "value contains a line break or NUL",
            ));
        }
    }
    Ok(())
}
