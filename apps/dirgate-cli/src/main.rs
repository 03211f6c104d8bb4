//! dirgate - operator CLI for the identity directory gateway
//!
//! Provisions and maintains directory users and groups, issues passwords,
//! stores them envelope-encrypted and delivers them by SMS.

use clap::{Parser, Subcommand};

mod commands;
mod config;
mod context;
mod error;
mod logging;

use config::Config;
use error::CliResult;
use logging::LogFormat;

/// dirgate - Directory user lifecycle and password delivery
#[derive(Parser)]
#[command(name = "dirgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log line format (logs are written to stderr)
    #[arg(long, global = true, value_enum, env = "DIRGATE_LOG_FORMAT", default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the local database schema
    Migrate,

    /// Manage directory users
    User(commands::user::UserArgs),

    /// Change, resend and generate passwords
    Password(commands::password::PasswordArgs),

    /// Manage directory groups
    Group(commands::group::GroupArgs),

    /// Reconcile the local mirror with the directory
    Sync(commands::sync::SyncArgs),

    /// Test the directory connection and manage server profiles
    Directory(commands::directory::DirectoryArgs),

    /// Send messages, check credit and manage templates
    Sms(commands::sms::SmsArgs),
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result = match Config::from_env() {
        Ok(config) => {
            logging::init_logging(&config.log_filter, cli.log_format);
            run(cli.command, config).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = %e, exit_code = e.exit_code(), "Command failed");
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(command: Commands, config: Config) -> CliResult<()> {
    match command {
        Commands::Migrate => {
            context::open_database(&config).await?;
            println!("Database schema is up to date ({})", config.database_url);
            Ok(())
        }
        Commands::User(args) => commands::user::execute(args, config).await,
        Commands::Password(args) => commands::password::execute(args, config).await,
        Commands::Group(args) => commands::group::execute(args, config).await,
        Commands::Sync(args) => commands::sync::execute(args, config).await,
        Commands::Directory(args) => commands::directory::execute(args, config).await,
        Commands::Sms(args) => commands::sms::execute(args, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_create() {
        let cli = Cli::try_parse_from([
            "dirgate",
            "user",
            "create",
            "alice",
            "--given-name",
            "Alice",
            "--sn",
            "Smith",
            "--mail",
            "alice@x.com",
            "--mobile",
            "09121234567",
            "--group",
            "devs",
            "--group",
            "ops",
            "--sms",
        ])
        .unwrap();

        let Commands::User(args) = cli.command else {
            panic!("expected user command");
        };
        let commands::user::UserCommands::Create(create) = args.command else {
            panic!("expected create");
        };
        assert_eq!(create.uid, "alice");
        assert_eq!(create.groups, vec!["devs", "ops"]);
        assert!(create.sms);
        assert_eq!(create.admin, "cli");
    }

    #[test]
    fn test_parse_expire_conflicts() {
        assert!(Cli::try_parse_from(["dirgate", "user", "expire", "alice", "--days", "3"]).is_ok());
        assert!(
            Cli::try_parse_from(["dirgate", "user", "expire", "alice", "--days", "3", "--clear"])
                .is_err()
        );
    }

    #[test]
    fn test_parse_sync_default_target() {
        let cli = Cli::try_parse_from(["dirgate", "sync"]).unwrap();
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync command");
        };
        assert_eq!(args.target, commands::sync::SyncTarget::All);
    }

    #[test]
    fn test_parse_log_format() {
        let cli = Cli::try_parse_from(["dirgate", "--log-format", "text", "migrate"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Text);
    }
}
