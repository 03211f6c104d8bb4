//! Directory connection commands

use clap::{Args, Subcommand};

use dirgate_db::models::{DirectoryServerConfig, NewDirectoryServerConfig};

use crate::commands::truncate;
use crate::config::Config;
use crate::context::{open_database, AppContext};
use crate::error::{CliError, CliResult};

/// Directory commands
#[derive(Args, Debug)]
pub struct DirectoryArgs {
    #[command(subcommand)]
    pub command: DirectoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum DirectoryCommands {
    /// Bind to the directory and record the result on the active profile
    Test,
    /// Manage stored server profiles
    #[command(subcommand)]
    Profile(ProfileCommands),
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Store a new server profile
    Add(AddArgs),
    /// List stored profiles
    List(ListArgs),
    /// Make a profile the active one
    Activate(IdArg),
    /// Delete a profile
    Remove(IdArg),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub host: String,

    #[arg(long, default_value = "389")]
    pub port: u16,

    /// Use LDAPS
    #[arg(long)]
    pub ssl: bool,

    /// Base DN, e.g. dc=example,dc=com
    #[arg(long)]
    pub base_dn: String,

    #[arg(long)]
    pub bind_dn: String,

    #[arg(long, env = "DIRGATE_BIND_PASSWORD", hide_env_values = true)]
    pub bind_password: Option<String>,

    /// Activate the profile after storing it
    #[arg(long)]
    pub activate: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct IdArg {
    /// Profile id
    pub id: i64,
}

/// Execute directory commands
pub async fn execute(args: DirectoryArgs, config: Config) -> CliResult<()> {
    match args.command {
        DirectoryCommands::Test => execute_test(config).await,
        DirectoryCommands::Profile(command) => execute_profile(command, config).await,
    }
}

async fn execute_test(config: Config) -> CliResult<()> {
    let ctx = AppContext::init(config).await?;
    let outcome = ctx.manager.test_connection().await?;
    let test = outcome.value;

    println!("{}", outcome.message);
    println!("  Backend:   {}", test.backend);
    println!("  Base DN:   {}", test.base_dn);
    if let Some(id) = test.recorded_on {
        println!("  Recorded on profile #{id}");
    }
    Ok(())
}

async fn execute_profile(command: ProfileCommands, config: Config) -> CliResult<()> {
    let db = open_database(&config).await?;

    match command {
        ProfileCommands::Add(a) => {
            let profile = DirectoryServerConfig::create(
                db.inner(),
                &NewDirectoryServerConfig {
                    name: a.name,
                    host: a.host,
                    port: i64::from(a.port),
                    use_ssl: a.ssl,
                    base_dn: a.base_dn,
                    bind_dn: a.bind_dn,
                    bind_password: a.bind_password,
                },
            )
            .await?;
            println!("Profile '{}' stored as #{}", profile.name, profile.id);

            if a.activate {
                activate(&db, profile.id).await?;
            }
        }
        ProfileCommands::List(a) => {
            let profiles = DirectoryServerConfig::list(db.inner()).await?;
            if a.json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else if profiles.is_empty() {
                println!("No directory profiles stored.");
            } else {
                print_profile_table(&profiles);
            }
        }
        ProfileCommands::Activate(a) => activate(&db, a.id).await?,
        ProfileCommands::Remove(a) => {
            if !DirectoryServerConfig::delete(db.inner(), a.id).await? {
                return Err(CliError::NotFound(format!("directory profile #{}", a.id)));
            }
            println!("Profile #{} removed", a.id);
        }
    }
    Ok(())
}

async fn activate(db: &dirgate_db::DbPool, id: i64) -> CliResult<()> {
    let profile = DirectoryServerConfig::activate(db.inner(), id)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("directory profile #{id}")))?;
    println!("Profile '{}' is now active", profile.name);
    Ok(())
}

fn print_profile_table(profiles: &[DirectoryServerConfig]) {
    println!(
        "{:<5} {:<3} {:<18} {:<28} {:<25} {:<10}",
        "ID", "", "NAME", "URL", "BASE DN", "LAST TEST"
    );
    println!("{}", "-".repeat(94));

    for profile in profiles {
        let scheme = if profile.use_ssl { "ldaps" } else { "ldap" };
        let url = format!("{scheme}://{}:{}", profile.host, profile.port);
        let last_test = match profile.last_test_ok {
            Some(true) => "ok",
            Some(false) => "failed",
            None => "-",
        };
        println!(
            "{:<5} {:<3} {:<18} {:<28} {:<25} {:<10}",
            profile.id,
            if profile.is_active { "*" } else { "" },
            truncate(&profile.name, 16),
            truncate(&url, 26),
            truncate(&profile.base_dn, 23),
            last_test
        );
    }
}
