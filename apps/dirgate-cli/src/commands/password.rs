//! Password issuance commands

use clap::{Args, Subcommand};

use dirgate_identity::AdminId;
use dirgate_secrets::{strength, SecretIssuer, StrengthReport};

use crate::commands::describe_delivery;
use crate::config::Config;
use crate::context::AppContext;
use crate::error::{CliError, CliResult};

/// Password commands
#[derive(Args, Debug)]
pub struct PasswordArgs {
    #[command(subcommand)]
    pub command: PasswordCommands,
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommands {
    /// Reset a user's password through the directory
    Change(ChangeArgs),
    /// Send a previously issued password again by SMS
    Resend(ResendArgs),
    /// Generate a password without touching the directory
    Generate(GenerateArgs),
    /// Score a password
    Strength(StrengthArgs),
}

#[derive(Args, Debug)]
pub struct ChangeArgs {
    /// User id (uid)
    pub uid: String,

    /// Use this password instead of generating one
    #[arg(long, env = "DIRGATE_NEW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Send the new password by SMS
    #[arg(long)]
    pub sms: bool,

    /// Administrator recorded on the issued secret
    #[arg(long, env = "DIRGATE_ADMIN", default_value = "cli")]
    pub admin: String,
}

#[derive(Args, Debug)]
pub struct ResendArgs {
    /// Issued secret id
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(long, default_value_t = SecretIssuer::default().length)]
    pub length: usize,

    /// Letters and digits only
    #[arg(long)]
    pub no_special: bool,

    /// Number of passwords to generate
    #[arg(long, default_value = "1")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct StrengthArgs {
    #[arg(env = "DIRGATE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute password commands
pub async fn execute(args: PasswordArgs, config: Config) -> CliResult<()> {
    match args.command {
        PasswordCommands::Change(a) => execute_change(a, config).await,
        PasswordCommands::Resend(a) => execute_resend(a, config).await,
        PasswordCommands::Generate(a) => execute_generate(a),
        PasswordCommands::Strength(a) => execute_strength(a),
    }
}

async fn execute_change(args: ChangeArgs, config: Config) -> CliResult<()> {
    let ctx = AppContext::init(config).await?;
    let outcome = ctx
        .manager
        .change_password(&args.uid, args.password, args.sms, &AdminId::new(args.admin))
        .await?;
    let changed = outcome.value;

    println!("{}", outcome.message);
    println!();
    println!("  Password:        {}", changed.secret.expose());
    println!("  Issued secret:   #{}", changed.issued_secret_id);
    println!("  SMS:             {}", describe_delivery(&changed.delivery));
    Ok(())
}

async fn execute_resend(args: ResendArgs, config: Config) -> CliResult<()> {
    let ctx = AppContext::init(config).await?;
    let outcome = ctx.manager.resend_secret(args.id).await?;
    println!("{}", outcome.message);
    Ok(())
}

fn execute_generate(args: GenerateArgs) -> CliResult<()> {
    if args.length == 0 || args.count == 0 {
        return Err(CliError::Validation(
            "--length and --count must be greater than zero".to_string(),
        ));
    }
    let issuer = SecretIssuer {
        length: args.length,
        include_special: !args.no_special,
    };
    for _ in 0..args.count {
        let secret = issuer.issue();
        let report = strength(secret.expose());
        println!("{}  ({})", secret.expose(), report.label);
    }
    Ok(())
}

fn execute_strength(args: StrengthArgs) -> CliResult<()> {
    let report = strength(&args.password);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &StrengthReport) {
    println!(
        "Strength: {} ({}/{})",
        report.label, report.score, report.max_score
    );
    for suggestion in &report.suggestions {
        println!("  - {suggestion}");
    }
}
