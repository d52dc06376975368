use std::sync::Arc;

use accountkit_core::descriptor::DEFAULT_STUN_PORT;
use accountkit_core::jid::server_from_user_name;
use accountkit_core::{
    account_unique_id, AccountHandle, AccountProperties, AccountRegistration, JingleNodeDescriptor,
    RegistrationConfig, StoreRequest, StoredAccount, StunServerDescriptor, TransportProtocol,
};
use eyre::{bail, eyre, WrapErr};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::store::{stun_vault_key, FileServices, FileStore};

/// Connection server setting written on account creation.
const SERVER_ADDRESS: &str = "SERVER_ADDRESS";

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Create a new account
    Create {
        /// User id (`local@domain`)
        user_id: String,
        /// Login password
        #[arg(long, env = "ACCOUNTKIT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Do not keep the password
        #[arg(long)]
        no_remember: bool,
        /// Server to connect to (defaults to the one derived from the user id)
        #[arg(long)]
        server: Option<String>,
    },
    /// Show an account and its relay configuration
    Show {
        /// User id
        user_id: String,
    },
    /// List stored accounts
    List,
    /// Append a STUN/TURN server to an account
    AddStun {
        /// User id
        user_id: String,
        /// Server host name or address
        address: String,
        /// Server port
        #[arg(long, default_value_t = DEFAULT_STUN_PORT)]
        port: u16,
        /// TURN username; enables TURN
        #[arg(long)]
        username: Option<String>,
        /// TURN password
        #[arg(long, requires = "username")]
        password: Option<String>,
        /// Transport protocol (udp, tcp, tls)
        #[arg(long, default_value = "udp")]
        protocol: TransportProtocol,
    },
    /// Remove the STUN server at `index`
    RemoveStun {
        /// User id
        user_id: String,
        /// Position in the list, starting at 0
        index: usize,
    },
    /// Append a Jingle Nodes relay to an account
    AddRelay {
        /// User id
        user_id: String,
        /// JID of the node
        jid: String,
        /// The node only tracks relays
        #[arg(long)]
        tracker_only: bool,
    },
    /// Remove the Jingle Node at `index`
    RemoveRelay {
        /// User id
        user_id: String,
        /// Position in the list, starting at 0
        index: usize,
    },
    /// Print the server a user id connects to
    Server {
        /// User id
        user_id: String,
    },
}

/// Per-invocation settings shared by every command.
pub struct Context {
    pub store: Arc<FileStore>,
    pub config: RegistrationConfig,
    pub json: bool,
}

impl Context {
    fn services(&self) -> FileServices {
        FileServices::new(self.store.clone(), !self.config.media_disabled)
    }
}

pub fn run(command: Commands, ctx: &Context) -> eyre::Result<()> {
    match command {
        Commands::Create {
            user_id,
            password,
            no_remember,
            server,
        } => create(ctx, &user_id, password.as_deref(), !no_remember, server.as_deref()),
        Commands::Show { user_id } => show(ctx, &user_id),
        Commands::List => list(ctx),
        Commands::AddStun {
            user_id,
            address,
            port,
            username,
            password,
            protocol,
        } => edit(ctx, &user_id, |registration| {
            let mut server = StunServerDescriptor::new(address, port);
            server.set_protocol(protocol);
            if let Some(username) = username.as_deref() {
                server.set_turn_supported(true);
                server.set_username(Some(username));
            }
            if let Some(password) = password {
                server.set_password(SecretString::new(password.into()));
            }
            registration.add_stun_server(server);
            Ok(())
        }),
        Commands::RemoveStun { user_id, index } => edit(ctx, &user_id, |registration| {
            let servers = registration.stun_servers_mut();
            if index >= servers.len() {
                bail!("no STUN server at index {index} ({} configured)", servers.len());
            }
            let removed = servers.remove(index);
            tracing::info!(address = removed.address(), "removed STUN server");
            Ok(())
        }),
        Commands::AddRelay {
            user_id,
            jid,
            tracker_only,
        } => edit(ctx, &user_id, |registration| {
            registration.add_jingle_node(JingleNodeDescriptor::new(jid, !tracker_only));
            Ok(())
        }),
        Commands::RemoveRelay { user_id, index } => edit(ctx, &user_id, |registration| {
            let nodes = registration.jingle_nodes_mut();
            if index >= nodes.len() {
                bail!("no Jingle Node at index {index} ({} configured)", nodes.len());
            }
            let removed = nodes.remove(index);
            tracing::info!(jid = removed.jid(), "removed Jingle Node");
            Ok(())
        }),
        Commands::Server { user_id } => {
            let server = server_from_user_name(&user_id)
                .ok_or_else(|| eyre!("{user_id:?} has no domain part"))?;
            println!("{server}");
            Ok(())
        }
    }
}

fn uid_of(ctx: &Context, user_id: &str) -> String {
    account_unique_id(&ctx.config.protocol, user_id)
}

fn create(
    ctx: &Context,
    user_id: &str,
    password: Option<&str>,
    remember: bool,
    server: Option<&str>,
) -> eyre::Result<()> {
    let uid = uid_of(ctx, user_id);
    if ctx.store.account(&uid)?.is_some() {
        bail!("account {uid} already exists");
    }

    let mut registration = AccountRegistration::new(ctx.config.clone());
    registration.set_user_id(Some(user_id));
    registration.set_remember_password(remember);
    let server = server
        .map(str::to_owned)
        .or_else(|| registration.default_server())
        .ok_or_else(|| eyre!("cannot derive a server from {user_id:?}; pass --server"))?;
    registration.set_property(SERVER_ADDRESS, Some(&server));

    let mut output = AccountProperties::from_iter([(
        accountkit_core::properties::ACCOUNT_UID,
        uid.as_str(),
    )]);
    let request = StoreRequest {
        password,
        ..StoreRequest::default()
    };
    registration
        .store_properties(&ctx.services(), &request, &mut output)
        .wrap_err("storing new account")?;
    if !remember {
        output.insert(accountkit_core::properties::PASSWORD_PERSISTENT, "false");
    }

    persist(ctx, &uid, &registration, output)?;
    tracing::info!(%uid, %server, "account created");
    Ok(())
}

/// Runs one load/modify/store cycle against a persisted account.
fn edit(
    ctx: &Context,
    user_id: &str,
    modify: impl FnOnce(&mut AccountRegistration) -> eyre::Result<()>,
) -> eyre::Result<()> {
    let uid = uid_of(ctx, user_id);
    let account = load(ctx, &uid)?;
    let services = ctx.services();

    let mut registration = AccountRegistration::new(ctx.config.clone());
    registration
        .load_account(&account, &services)
        .wrap_err_with(|| format!("loading {uid}"))?;
    modify(&mut registration)?;

    let password = registration
        .password()
        .map(|p| p.expose_secret().to_owned());
    let request = StoreRequest {
        password: password.as_deref(),
        is_modification: true,
        ..StoreRequest::default()
    };
    let mut output = account.into_properties();
    registration
        .store_properties(&services, &request, &mut output)
        .wrap_err_with(|| format!("storing {uid}"))?;

    persist(ctx, &uid, &registration, output)
}

fn load(ctx: &Context, uid: &str) -> eyre::Result<StoredAccount> {
    let props = ctx
        .store
        .account(uid)?
        .ok_or_else(|| eyre!("no account {uid}"))?;
    Ok(StoredAccount::new(&ctx.config.protocol, props))
}

/// Moves secrets into the vault, writes the properties and saves the file.
fn persist(
    ctx: &Context,
    uid: &str,
    registration: &AccountRegistration,
    mut output: AccountProperties,
) -> eyre::Result<()> {
    output.remove(accountkit_core::properties::PASSWORD);
    ctx.store.set_password(uid, registration.password())?;
    ctx.store.clear_stun_passwords(uid)?;
    for (entry_prefix, password) in registration.stun_credentials() {
        ctx.store
            .set_password(&stun_vault_key(uid, &entry_prefix), Some(password))?;
    }
    ctx.store.replace(uid, output)?;
    ctx.store.save()
}

#[derive(Serialize)]
struct AccountSummary<'a> {
    uid: &'a str,
    user_id: Option<&'a str>,
    server: Option<String>,
    password_saved: bool,
    stun_servers: Vec<StunSummary<'a>>,
    jingle_nodes: Vec<RelaySummary<'a>>,
    default_encryption: bool,
    override_encodings: bool,
}

#[derive(Serialize)]
struct StunSummary<'a> {
    address: &'a str,
    port: u16,
    protocol: String,
    turn: bool,
    username: Option<&'a str>,
    has_password: bool,
}

#[derive(Serialize)]
struct RelaySummary<'a> {
    jid: &'a str,
    relay: bool,
}

fn show(ctx: &Context, user_id: &str) -> eyre::Result<()> {
    let uid = uid_of(ctx, user_id);
    let account = load(ctx, &uid)?;
    let mut registration = AccountRegistration::new(ctx.config.clone());
    registration.load_account(&account, &ctx.services())?;

    let summary = AccountSummary {
        uid: account.account_unique_id(),
        user_id: registration.user_id(),
        server: registration
            .property(SERVER_ADDRESS)
            .map(str::to_owned)
            .or_else(|| registration.default_server()),
        password_saved: registration.password().is_some(),
        stun_servers: registration
            .stun_servers()
            .iter()
            .map(|s| StunSummary {
                address: s.address(),
                port: s.port(),
                protocol: s.protocol().to_string(),
                turn: s.is_turn_supported(),
                username: s.username(),
                has_password: s.password().is_some(),
            })
            .collect(),
        jingle_nodes: registration
            .jingle_nodes()
            .iter()
            .map(|n| RelaySummary {
                jid: n.jid(),
                relay: n.is_relay_supported(),
            })
            .collect(),
        default_encryption: registration.security().default_encryption(),
        override_encodings: registration.encodings().override_encodings(),
    };

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", summary.uid);
    println!("  server: {}", summary.server.as_deref().unwrap_or("-"));
    println!("  password saved: {}", summary.password_saved);
    println!("  STUN servers:");
    for (i, s) in summary.stun_servers.iter().enumerate() {
        let turn = if s.turn { " turn" } else { "" };
        println!("    [{i}] {}:{} {}{turn}", s.address, s.port, s.protocol);
    }
    println!("  Jingle Nodes:");
    for (i, n) in summary.jingle_nodes.iter().enumerate() {
        let kind = if n.relay { "relay" } else { "tracker" };
        println!("    [{i}] {} {kind}", n.jid);
    }
    Ok(())
}

fn list(ctx: &Context) -> eyre::Result<()> {
    let uids = ctx.store.account_uids()?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&uids)?);
    } else {
        for uid in uids {
            println!("{uid}");
        }
    }
    Ok(())
}
