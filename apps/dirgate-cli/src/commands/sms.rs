//! SMS provider commands

use clap::{Args, Subcommand};

use dirgate_db::models::{NewNotificationTemplate, NotificationLog, NotificationTemplate};
use dirgate_notify::template::TEMPLATE_VARIABLES;
use dirgate_notify::DEFAULT_TEMPLATE;

use crate::commands::truncate;
use crate::config::Config;
use crate::context::{open_database, AppContext};
use crate::error::{CliError, CliResult};

/// SMS commands
#[derive(Args, Debug)]
pub struct SmsArgs {
    #[command(subcommand)]
    pub command: SmsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SmsCommands {
    /// Send a free-form message
    Send(SendArgs),
    /// Show the remaining account credit
    Balance,
    /// Manage the message template used for password delivery
    #[command(subcommand)]
    Template(TemplateCommands),
    /// Show the delivery log
    Logs(LogsArgs),
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Recipient mobile number
    #[arg(long)]
    pub to: String,

    pub message: String,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// Create or replace a template and make it active
    Set(TemplateSetArgs),
    /// Show the template in use
    Show,
}

#[derive(Args, Debug)]
pub struct TemplateSetArgs {
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Handlebars body using {{username}}, {{password}} and {{full_name}}
    pub body: String,
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Only messages sent to this number
    #[arg(long)]
    pub recipient: Option<String>,

    #[arg(long, default_value = "20")]
    pub limit: i64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute SMS commands
pub async fn execute(args: SmsArgs, config: Config) -> CliResult<()> {
    match args.command {
        SmsCommands::Send(a) => execute_send(a, config).await,
        SmsCommands::Balance => execute_balance(config).await,
        SmsCommands::Template(command) => execute_template(command, config).await,
        SmsCommands::Logs(a) => execute_logs(a, config).await,
    }
}

async fn execute_send(args: SendArgs, config: Config) -> CliResult<()> {
    let ctx = AppContext::init(config).await?;
    let dispatcher = ctx.require_dispatcher()?;

    let dispatch = dispatcher.send(&args.to, &args.message).await?;
    let report = dispatch.report;
    if report.success {
        println!(
            "Message sent via {} (id {}, log #{})",
            dispatcher.provider_name(),
            report.message_id.as_deref().unwrap_or("-"),
            dispatch.log.id
        );
        Ok(())
    } else {
        Err(CliError::Validation(format!(
            "SMS not sent: {}",
            report.error.as_deref().unwrap_or("Unknown error")
        )))
    }
}

async fn execute_balance(config: Config) -> CliResult<()> {
    let ctx = AppContext::init(config).await?;
    let dispatcher = ctx.require_dispatcher()?;
    let credit = dispatcher.balance().await?;
    println!("{}: {credit}", dispatcher.provider_name());
    Ok(())
}

async fn execute_template(command: TemplateCommands, config: Config) -> CliResult<()> {
    let db = open_database(&config).await?;

    match command {
        TemplateCommands::Set(a) => {
            if a.body.trim().is_empty() {
                return Err(CliError::Validation("template body must not be empty".to_string()));
            }
            let variables = TEMPLATE_VARIABLES
                .iter()
                .filter(|name| a.body.contains(&format!("{{{{{name}}}}}")))
                .map(|name| name.to_string())
                .collect();
            let template = NotificationTemplate::upsert(
                db.inner(),
                &NewNotificationTemplate {
                    name: a.name,
                    body: a.body,
                    variables,
                    is_active: Some(true),
                },
            )
            .await?;
            println!("Template '{}' saved and active", template.name);
        }
        TemplateCommands::Show => match NotificationTemplate::find_active(db.inner()).await? {
            Some(template) => {
                println!("Template '{}':", template.name);
                println!("{}", template.body);
            }
            None => {
                println!("No active template; using the built-in default:");
                println!("{DEFAULT_TEMPLATE}");
            }
        },
    }
    Ok(())
}

async fn execute_logs(args: LogsArgs, config: Config) -> CliResult<()> {
    crate::commands::validate_pagination(args.limit, 0)?;
    let db = open_database(&config).await?;

    let logs = match &args.recipient {
        Some(recipient) => NotificationLog::list_for_recipient(db.inner(), recipient)
            .await?
            .into_iter()
            .take(usize::try_from(args.limit).unwrap_or(usize::MAX))
            .collect(),
        None => NotificationLog::list_recent(db.inner(), args.limit).await?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
    } else if logs.is_empty() {
        println!("No messages logged.");
    } else {
        println!(
            "{:<6} {:<20} {:<14} {:<12} {:<8} {:<30}",
            "ID", "CREATED", "RECIPIENT", "PROVIDER", "STATUS", "DETAIL"
        );
        println!("{}", "-".repeat(94));
        for log in &logs {
            let detail = log
                .error
                .as_deref()
                .or(log.message_id.as_deref())
                .unwrap_or("-");
            println!(
                "{:<6} {:<20} {:<14} {:<12} {:<8} {:<30}",
                log.id,
                log.created_at.format("%Y-%m-%d %H:%M:%S"),
                truncate(&log.recipient, 14),
                log.provider,
                log.status,
                truncate(detail, 30)
            );
        }
    }
    Ok(())
}
