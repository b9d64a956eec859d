//! Recipebox Admin CLI
//!
//! Administration tool for accounts and tokens, working directly against the
//! server's database.
//!
//! # Usage
//!
//! ```bash
//! recipebox-admin user add cook@example.com --password 's3cret!' --name Cook
//! recipebox-admin user create-superuser admin@example.com
//! recipebox-admin user list --search example.com
//! recipebox-admin user deactivate cook@example.com
//! recipebox-admin token revoke cook@example.com
//! recipebox-admin token purge
//! ```
//!
//! # Environment Variables
//!
//! - `RECIPEBOX_PASSWORD`: password for `user add` and `user create-superuser`
//!   when `--password` is not given
//! - `RECIPEBOX_DATABASE_PATH`: database file (see the server for the rest)

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

use recipebox::db::init_db;
use recipebox::models::User;
use recipebox::server::{AccountAttributes, AppState};
use recipebox::Config;

type CliResult = Result<(), Box<dyn std::error::Error>>;

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "recipebox-admin")]
#[command(version)]
#[command(about = "Recipebox administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage accounts
    User(UserCommand),
    /// Manage issued tokens
    Token(TokenCommand),
}

#[derive(Args)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Args)]
struct NewAccountArgs {
    /// Account email address
    email: String,
    /// Account password
    #[arg(long, short, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
    password: String,
    /// Display name
    #[arg(long, short)]
    name: Option<String>,
    /// Extra attribute as key=value (name, is_active, is_staff, is_superuser)
    #[arg(long = "attr", value_name = "KEY=VALUE")]
    attrs: Vec<String>,
}

#[derive(Subcommand)]
enum UserSubcommand {
    /// Add a new account
    Add(NewAccountArgs),
    /// Add an account with staff and superuser rights
    CreateSuperuser(NewAccountArgs),
    /// List accounts
    List {
        /// Only accounts whose email or name contains this text
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Show one account
    Show {
        email: String,
    },
    /// Allow an account to log in again
    Activate {
        email: String,
    },
    /// Block an account from logging in
    Deactivate {
        email: String,
    },
    /// Grant or remove staff status
    SetStaff {
        email: String,
        /// Remove staff status instead of granting it
        #[arg(long)]
        revoke: bool,
    },
    /// Remove an account and everything it owns
    Remove {
        email: String,
    },
}

#[derive(Args)]
struct TokenCommand {
    #[command(subcommand)]
    command: TokenSubcommand,
}

#[derive(Subcommand)]
enum TokenSubcommand {
    /// Revoke every token of an account
    Revoke {
        email: String,
    },
    /// Delete expired tokens
    Purge,
}

// ============================================================================
// Commands
// ============================================================================

/// Parses `key=value` pairs. Values that read as JSON (`true`, `42`) keep
/// that type; anything else is a string.
fn parse_attrs(pairs: &[String]) -> Result<Map<String, Value>, String> {
    let mut fields = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", pair))?;
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

fn attributes(args: &NewAccountArgs) -> Result<AccountAttributes, String> {
    let mut fields = parse_attrs(&args.attrs)?;
    for key in fields.keys() {
        if !AccountAttributes::ALLOWED.contains(&key.as_str()) {
            eprintln!("Warning: ignoring unknown attribute '{}'", key);
        }
    }
    if let Some(name) = &args.name {
        fields.insert("name".into(), Value::String(name.clone()));
    }
    Ok(AccountAttributes::from_fields(&fields))
}

fn print_user(user: &User) {
    println!("Email:        {}", user.email);
    println!("  Id:         {}", user.id);
    println!("  Name:       {}", user.name);
    println!("  Active:     {}", user.is_active);
    println!("  Staff:      {}", user.is_staff);
    println!("  Superuser:  {}", user.is_superuser);
    println!("  Joined:     {}", user.date_joined.to_rfc3339());
    match user.last_login {
        Some(at) => println!("  Last login: {}", at.to_rfc3339()),
        None => println!("  Last login: never"),
    }
}

async fn add_user(state: &AppState, args: NewAccountArgs, elevated: bool) -> CliResult {
    let attrs = attributes(&args)?;
    let user = if elevated {
        state
            .accounts
            .create_elevated_account(&args.email, &args.password, attrs)
            .await?
    } else {
        state
            .accounts
            .create_account(&args.email, &args.password, attrs)
            .await?
    };

    println!("Added user: {}", user.email);
    if !user.name.is_empty() {
        println!("  Name: {}", user.name);
    }
    if user.is_superuser {
        println!("  Superuser: yes");
    } else if user.is_staff {
        println!("  Staff: yes");
    }
    Ok(())
}

async fn list_users(state: &AppState, search: Option<String>) -> CliResult {
    let users = state.accounts.list_accounts(search.as_deref()).await?;

    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!("{:<6} {:<40} {:<20} {:<8}", "ID", "EMAIL", "NAME", "FLAGS");
    println!("{}", "-".repeat(80));

    for user in &users {
        let mut flags = String::new();
        if !user.is_active {
            flags.push('i');
        }
        if user.is_staff {
            flags.push('s');
        }
        if user.is_superuser {
            flags.push('S');
        }
        println!(
            "{:<6} {:<40} {:<20} {:<8}",
            user.id, user.email, user.name, flags
        );
    }

    println!();
    println!("Total: {} user(s)", users.len());

    Ok(())
}

async fn run(cli: Cli) -> CliResult {
    let config = Config::load(cli.config)?;
    let pool = init_db(&config.database_path).await?;
    let state = AppState::new(pool, &config)?;

    match cli.command {
        Commands::User(user_cmd) => match user_cmd.command {
            UserSubcommand::Add(args) => add_user(&state, args, false).await?,
            UserSubcommand::CreateSuperuser(args) => add_user(&state, args, true).await?,
            UserSubcommand::List { search } => list_users(&state, search).await?,
            UserSubcommand::Show { email } => print_user(&state.accounts.find(&email).await?),
            UserSubcommand::Activate { email } => {
                let user = state.accounts.set_active(&email, true).await?;
                println!("Activated user: {}", user.email);
            }
            UserSubcommand::Deactivate { email } => {
                let user = state.accounts.set_active(&email, false).await?;
                let revoked = state.tokens.revoke_all(&user).await?;
                println!("Deactivated user: {} ({} token(s) revoked)", user.email, revoked);
            }
            UserSubcommand::SetStaff { email, revoke } => {
                let user = state.accounts.set_staff(&email, !revoke).await?;
                println!("Staff for {}: {}", user.email, user.is_staff);
            }
            UserSubcommand::Remove { email } => {
                state.accounts.delete_account(&email).await?;
                println!("Removed user: {}", email);
            }
        },
        Commands::Token(token_cmd) => match token_cmd.command {
            TokenSubcommand::Revoke { email } => {
                let user = state.accounts.find(&email).await?;
                let revoked = state.tokens.revoke_all(&user).await?;
                println!("Revoked {} token(s) for {}", revoked, user.email);
            }
            TokenSubcommand::Purge => {
                let purged = state.tokens.purge_expired().await?;
                println!("Purged {} expired token(s)", purged);
            }
        },
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attrs_types() {
        let fields = parse_attrs(&[
            "is_staff=true".to_string(),
            "name=Head Chef".to_string(),
        ])
        .unwrap();

        assert_eq!(fields["is_staff"], Value::Bool(true));
        assert_eq!(fields["name"], Value::String("Head Chef".into()));
    }

    #[test]
    fn test_parse_attrs_rejects_missing_equals() {
        assert!(parse_attrs(&["is_staff".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses_superuser() {
        let cli = Cli::try_parse_from([
            "recipebox-admin",
            "user",
            "create-superuser",
            "admin@example.com",
            "--password",
            "IamSuper!",
        ])
        .unwrap();

        match cli.command {
            Commands::User(UserCommand {
                command: UserSubcommand::CreateSuperuser(args),
            }) => {
                assert_eq!(args.email, "admin@example.com");
                assert_eq!(args.password, "IamSuper!");
            }
            _ => panic!("unexpected command"),
        }
    }
}
