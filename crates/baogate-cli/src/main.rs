//! `baogate` console: a terminal client for the Baogate gateway.
//!
//! Logs in through the gateway, keeps the session token in a file, and
//! replays it on every call. Secrets are browsed as folders with breadcrumbs;
//! userpass accounts and policies are listed and managed by name.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod gateway;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;

use baogate_core::path::list_children;
use baogate_core::{FileTokenStore, Location, Session, SessionError};
use baogate_upstream::{KvData, UserUpdate};

use crate::gateway::{Gateway, LoginRequest};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

/// Policies that ship with every server and cannot be edited.
const BUILTIN_POLICIES: [&str; 2] = ["root", "default"];

// ── CLI structure ────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "baogate",
    version,
    about = "Baogate console: browse secrets, manage users and view policies through the gateway",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         BAOGATE_ADDR        Gateway address (default: http://127.0.0.1:3000)\n  \
         BAOGATE_TOKEN_FILE  Session token file (default: ~/.baogate/token)\n\n\
         {DIM}Examples:{RESET}\n  \
         baogate login --username alice --password hunter2\n  \
         baogate secrets ls app\n  \
         baogate secrets put app/db user=admin password=s3cret\n  \
         baogate users update alice --policies dev,ops"
    ),
)]
struct Cli {
    /// Gateway address.
    #[arg(long, env = "BAOGATE_ADDR", default_value = "http://127.0.0.1:3000")]
    addr: String,

    /// File the session token is kept in.
    #[arg(long, env = "BAOGATE_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a token or a username and password.
    Login {
        /// An existing upstream token.
        #[arg(long, conflicts_with_all = ["username", "password"])]
        token: Option<String>,
        /// Userpass username.
        #[arg(long, requires = "password")]
        username: Option<String>,
        /// Userpass password.
        #[arg(long, requires = "username")]
        password: Option<String>,
    },
    /// Forget the stored session token.
    Logout,
    /// Show whether a session token is stored.
    Status,
    /// KV secrets: browse folders, read and write leaves.
    Secrets {
        #[command(subcommand)]
        action: SecretsCommands,
    },
    /// Userpass account management.
    Users {
        #[command(subcommand)]
        action: UsersCommands,
    },
    /// Access control policies (read-only).
    Policies {
        #[command(subcommand)]
        action: PoliciesCommands,
    },
}

#[derive(Subcommand)]
enum SecretsCommands {
    /// List the children of a folder (root when omitted).
    Ls {
        /// Folder path, e.g. `app/db`.
        path: Option<String>,
    },
    /// Read the current version of a secret.
    Get { path: String },
    /// Create a secret from key=value pairs.
    Put {
        path: String,
        #[arg(required = true)]
        data: Vec<String>,
    },
    /// Change some keys of a secret and keep the rest.
    ///
    /// Reads the current version, applies the key=value pairs over it, drops
    /// every `--remove` key, and writes the result as a new version.
    Edit {
        path: String,
        #[arg(required_unless_present = "remove")]
        data: Vec<String>,
        /// Key to delete from the secret. Repeatable.
        #[arg(long = "remove", value_name = "KEY")]
        remove: Vec<String>,
    },
    /// Delete a secret and all its versions.
    Rm { path: String },
}

#[derive(Subcommand)]
enum UsersCommands {
    /// List userpass accounts.
    Ls,
    /// Show an account's policies.
    Get { username: String },
    /// Create an account.
    Create {
        username: String,
        #[arg(long)]
        password: String,
        /// Comma-separated policy names.
        #[arg(long, value_delimiter = ',')]
        policies: Vec<String>,
    },
    /// Change an account's password and/or policies.
    Update {
        username: String,
        #[arg(long)]
        password: Option<String>,
        /// Comma-separated policy names. Pass an empty value to clear.
        #[arg(long, value_delimiter = ',')]
        policies: Option<Vec<String>>,
    },
    /// Delete an account.
    Rm { username: String },
}

#[derive(Subcommand)]
enum PoliciesCommands {
    /// List policy names.
    Ls,
    /// Show a policy's rules.
    Get { name: String },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_breadcrumbs(location: &Location) {
    let mut line = String::from("secret");
    for crumb in location.breadcrumbs() {
        line.push_str(" / ");
        if crumb.navigable {
            line.push_str(&crumb.label);
        } else {
            line.push_str(BOLD);
            line.push_str(&crumb.label);
            line.push_str(RESET);
        }
    }
    println!("  {DIM}path:{RESET} {line}");
}

fn print_names(names: &[String], empty: &str) {
    if names.is_empty() {
        println!("  {DIM}({empty}){RESET}");
    }
    for name in names {
        println!("  {CYAN}├─{RESET} {name}");
    }
}

fn parse_kv_pairs(pairs: &[String]) -> Result<KvData> {
    let mut map = KvData::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid key=value pair: '{pair}'"))?;
        if key.is_empty() {
            bail!("empty key in pair: '{pair}'");
        }
        map.insert(key.to_owned(), Value::String(value.to_owned()));
    }
    Ok(map)
}

/// Apply `set` over `current` and drop the `remove` keys.
fn merge_secret(mut current: KvData, set: KvData, remove: &[String]) -> Result<KvData> {
    for key in remove {
        if set.contains_key(key) {
            bail!("key '{key}' is both set and removed");
        }
        if current.remove(key).is_none() {
            bail!("secret has no key '{key}'");
        }
    }
    current.extend(set);
    Ok(current)
}

/// Strings print bare; other JSON values print as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Session ──────────────────────────────────────────────────────────

fn token_file(cli_value: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_value {
        return Ok(path);
    }
    let home = std::env::var_os("HOME")
        .context("cannot locate the home directory; pass --token-file")?;
    Ok(PathBuf::from(home).join(".baogate").join("token"))
}

fn open_session(path: PathBuf) -> Result<Session<FileTokenStore>> {
    Session::rehydrate(FileTokenStore::new(path)).context("failed to read the session token")
}

/// Gateway client carrying the session's token, or an error if logged out.
fn authed_gateway(addr: &str, session: &Session<FileTokenStore>) -> Result<Gateway> {
    match session.require() {
        Ok(token) => Ok(Gateway::new(addr, Some(token.to_owned()))),
        Err(SessionError::NotAuthenticated) => bail!("not logged in; run `baogate login` first"),
        Err(e) => Err(e.into()),
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut session = open_session(token_file(cli.token_file)?)?;

    match cli.command {
        Commands::Login {
            token,
            username,
            password,
        } => cmd_login(&cli.addr, &mut session, token, username, password).await,
        Commands::Logout => cmd_logout(&mut session),
        Commands::Status => {
            cmd_status(&cli.addr, &session);
            Ok(())
        }
        Commands::Secrets { action } => {
            cmd_secrets(&authed_gateway(&cli.addr, &session)?, action).await
        }
        Commands::Users { action } => cmd_users(&authed_gateway(&cli.addr, &session)?, action).await,
        Commands::Policies { action } => {
            cmd_policies(&authed_gateway(&cli.addr, &session)?, action).await
        }
    }
}

// ── Session commands ─────────────────────────────────────────────────

async fn cmd_login(
    addr: &str,
    session: &mut Session<FileTokenStore>,
    token: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let request = match (&token, &username, &password) {
        (Some(token), _, _) => LoginRequest::Token { token },
        (None, Some(username), Some(password)) => LoginRequest::Userpass { username, password },
        _ => bail!("pass --token, or --username and --password"),
    };

    let reply = Gateway::new(addr, None).login(&request).await?;
    session
        .login(reply.token)
        .context("logged in, but failed to store the session token")?;

    println!();
    match username {
        Some(user) => success(&format!("Logged in as {BOLD}{user}{RESET}")),
        None => success("Logged in with token"),
    }
    kv_line("Token file", &session.store().path().display().to_string());
    println!();
    Ok(())
}

fn cmd_logout(session: &mut Session<FileTokenStore>) -> Result<()> {
    let was_logged_in = session.is_authenticated();
    session.logout().context("failed to clear the session token")?;

    println!();
    if was_logged_in {
        success("Logged out. The token stays valid on the server until it expires.");
    } else {
        warning("No session to log out of.");
    }
    println!();
    Ok(())
}

fn cmd_status(addr: &str, session: &Session<FileTokenStore>) {
    header("🔐", "Session");
    kv_line("Gateway", addr);
    kv_line("Token file", &session.store().path().display().to_string());
    let state = if session.is_authenticated() {
        format!("{GREEN}logged in{RESET}")
    } else {
        format!("{RED}not logged in{RESET}")
    };
    kv_line("Status", &state);
    println!();
}

// ── Secrets commands ─────────────────────────────────────────────────

async fn cmd_secrets(gateway: &Gateway, action: SecretsCommands) -> Result<()> {
    match action {
        SecretsCommands::Ls { path } => {
            let location = Location::at(path.as_deref().unwrap_or_default());
            let children = list_children(gateway, location.current()).await?;

            header("📂", "Secrets");
            print_breadcrumbs(&location);
            println!();
            if children.is_empty() {
                println!("  {DIM}(empty){RESET}");
            }
            for child in &children {
                if child.is_folder() {
                    println!("  {CYAN}▸{RESET} {BOLD}{}/{RESET}", child.display_name());
                } else {
                    println!("  {DIM}·{RESET} {}", child.display_name());
                }
            }
            println!();
        }
        SecretsCommands::Get { path } => {
            let secret = gateway.get_secret(&path).await?;
            let version = secret.data.metadata;

            header("📦", &format!("Secret: {path}"));
            for (k, v) in &secret.data.data {
                kv_line(k, &display_value(v));
            }
            println!();
            kv_line("Version", &version.version.to_string());
            if !version.created_time.is_empty() {
                kv_line("Created", &version.created_time);
            }
            if version.destroyed {
                warning("This version has been destroyed.");
            }
            println!();
        }
        SecretsCommands::Put { path, data } => {
            let map = parse_kv_pairs(&data)?;
            let written = gateway.create_secret(&path, &map).await?;
            println!();
            success(&format!(
                "Secret written to {BOLD}{path}{RESET} (version {})",
                written.data.version
            ));
            println!();
        }
        SecretsCommands::Edit { path, data, remove } => {
            let set = parse_kv_pairs(&data)?;
            let current = gateway.get_secret(&path).await?.data.data;
            let merged = merge_secret(current, set, &remove)?;
            let written = gateway.update_secret(&path, &merged).await?;
            println!();
            success(&format!(
                "Secret {BOLD}{path}{RESET} updated (version {})",
                written.data.version
            ));
            println!();
        }
        SecretsCommands::Rm { path } => {
            gateway.delete_secret(&path).await?;
            println!();
            success(&format!("Secret at {BOLD}{path}{RESET} deleted."));
            println!();
        }
    }
    Ok(())
}

// ── Users commands ───────────────────────────────────────────────────

async fn cmd_users(gateway: &Gateway, action: UsersCommands) -> Result<()> {
    match action {
        UsersCommands::Ls => {
            let users = gateway.list_users().await?;
            header("👤", "Users");
            print_names(&users.data.keys, "no users");
            println!();
        }
        UsersCommands::Get { username } => {
            let user = gateway.get_user(&username).await?;
            header("👤", &format!("User: {username}"));
            kv_line("Policies", &user.data.policies.join(", "));
            if !user.data.token_policies.is_empty() {
                kv_line("Token policies", &user.data.token_policies.join(", "));
            }
            println!();
        }
        UsersCommands::Create {
            username,
            password,
            policies,
        } => {
            gateway.create_user(&username, &password, &policies).await?;
            println!();
            success(&format!("User {BOLD}{username}{RESET} created."));
            println!();
        }
        UsersCommands::Update {
            username,
            password,
            policies,
        } => {
            let update = UserUpdate {
                password,
                policies: policies.map(|p| p.into_iter().filter(|s| !s.is_empty()).collect()),
            };
            if update.is_noop() {
                bail!("nothing to update; pass --password and/or --policies");
            }
            let reply = gateway.update_user(&username, &update).await?;
            let fields = reply
                .updated
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!();
            success(&format!("User {BOLD}{username}{RESET} updated ({fields})."));
            println!();
        }
        UsersCommands::Rm { username } => {
            gateway.delete_user(&username).await?;
            println!();
            success(&format!("User {BOLD}{username}{RESET} deleted."));
            println!();
        }
    }
    Ok(())
}

// ── Policies commands ────────────────────────────────────────────────

async fn cmd_policies(gateway: &Gateway, action: PoliciesCommands) -> Result<()> {
    match action {
        PoliciesCommands::Ls => {
            let policies = gateway.list_policies().await?;
            header("📜", "Policies");
            if policies.data.keys.is_empty() {
                println!("  {DIM}(no policies){RESET}");
            }
            for name in &policies.data.keys {
                if BUILTIN_POLICIES.contains(&name.as_str()) {
                    println!("  {CYAN}├─{RESET} {name} {DIM}(built-in, read-only){RESET}");
                } else {
                    println!("  {CYAN}├─{RESET} {name}");
                }
            }
            println!();
        }
        PoliciesCommands::Get { name } => {
            let policy = gateway.get_policy(&name).await?;
            header("📜", &format!("Policy: {name}"));
            if BUILTIN_POLICIES.contains(&name.as_str()) {
                println!("  {DIM}built-in, read-only{RESET}");
            }
            println!();
            println!("{}", policy.data.rules);
            println!();
        }
    }
    Ok(())
}
