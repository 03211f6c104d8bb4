//! User lifecycle commands

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use dirgate_db::models::DirectoryUser;
use dirgate_directory::DirectoryClient as _;
use dirgate_identity::{AdminId, CreateUserRequest, ExpirationChange, UpdateUserRequest};

use crate::commands::{describe_delivery, truncate, validate_pagination};
use crate::config::Config;
use crate::context::{open_database, AppContext};
use crate::error::{CliError, CliResult};

/// User management commands
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user in the directory and issue an initial password
    Create(CreateArgs),
    /// Change directory attributes of a user
    Update(UpdateArgs),
    /// Delete a user from the directory and the local mirror
    Delete(UidArg),
    /// Clear nsAccountLock
    Enable(UidArg),
    /// Set nsAccountLock
    Disable(UidArg),
    /// Lock the Kerberos principal
    Lock(UidArg),
    /// Clear failed logins and record an admin unlock
    Unlock(UidArg),
    /// Push password expiration far out and clear lockout state
    RelaxPolicy(UidArg),
    /// Set or clear the Kerberos principal expiration
    Expire(ExpireArgs),
    /// Show a user as stored in the directory
    Show(ShowArgs),
    /// List users in the local mirror
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct UidArg {
    /// User id (uid)
    pub uid: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// User id (uid)
    pub uid: String,

    /// Common name; defaults to "<given name> <surname>"
    #[arg(long)]
    pub cn: Option<String>,

    /// Surname
    #[arg(long, default_value = "")]
    pub sn: String,

    /// Given name
    #[arg(long, default_value = "")]
    pub given_name: String,

    #[arg(long, default_value = "")]
    pub mail: String,

    /// Mobile number used for SMS delivery
    #[arg(long)]
    pub mobile: Option<String>,

    /// Group to join (repeatable); missing groups are created
    #[arg(long = "group")]
    pub groups: Vec<String>,

    /// Send the initial password by SMS
    #[arg(long)]
    pub sms: bool,

    /// Use this initial password instead of generating one
    #[arg(long, env = "DIRGATE_INITIAL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Administrator recorded on the issued secret
    #[arg(long, env = "DIRGATE_ADMIN", default_value = "cli")]
    pub admin: String,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub uid: String,

    #[arg(long)]
    pub cn: Option<String>,

    #[arg(long)]
    pub sn: Option<String>,

    #[arg(long)]
    pub given_name: Option<String>,

    #[arg(long)]
    pub mail: Option<String>,

    #[arg(long)]
    pub mobile: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExpireArgs {
    pub uid: String,

    /// Expire at this RFC 3339 timestamp
    #[arg(long, conflicts_with_all = ["days", "hours", "clear"])]
    pub at: Option<DateTime<Utc>>,

    /// Expire this many days from now
    #[arg(long, conflicts_with = "clear")]
    pub days: Option<i64>,

    /// Expire this many hours from now (added to --days)
    #[arg(long, conflicts_with = "clear")]
    pub hours: Option<i64>,

    /// Remove the expiration
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub uid: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Maximum number of users to return
    #[arg(long, default_value = "50")]
    pub limit: i64,

    /// Offset for pagination
    #[arg(long, default_value = "0")]
    pub offset: i64,
}

/// Execute user commands
pub async fn execute(args: UserArgs, config: Config) -> CliResult<()> {
    match args.command {
        UserCommands::List(a) => execute_list(a, config).await,
        UserCommands::Create(a) => execute_create(a, &AppContext::init(config).await?).await,
        UserCommands::Show(a) => execute_show(a, &AppContext::init(config).await?).await,
        command => {
            let ctx = AppContext::init(config).await?;
            let message = execute_change(command, &ctx).await?;
            println!("{message}");
            Ok(())
        }
    }
}

async fn execute_change(command: UserCommands, ctx: &AppContext) -> CliResult<String> {
    let manager = &ctx.manager;
    let message = match command {
        UserCommands::Update(a) => {
            let request = UpdateUserRequest {
                cn: a.cn,
                sn: a.sn,
                given_name: a.given_name,
                mail: a.mail,
                mobile: a.mobile,
            };
            manager.update_user(&a.uid, request).await?.message
        }
        UserCommands::Delete(a) => manager.delete_user(&a.uid).await?.message,
        UserCommands::Enable(a) => manager.enable_user(&a.uid).await?.message,
        UserCommands::Disable(a) => manager.disable_user(&a.uid).await?.message,
        UserCommands::Lock(a) => manager.lock_user(&a.uid).await?.message,
        UserCommands::Unlock(a) => manager.unlock_user(&a.uid).await?.message,
        UserCommands::RelaxPolicy(a) => manager.relax_password_policy(&a.uid).await?.message,
        UserCommands::Expire(a) => {
            let change = expiration_change(&a)?;
            manager.set_principal_expiration(&a.uid, change).await?.message
        }
        UserCommands::Create(_) | UserCommands::Show(_) | UserCommands::List(_) => {
            return Err(CliError::Validation("not a state-changing command".to_string()))
        }
    };
    Ok(message)
}

async fn execute_create(args: CreateArgs, ctx: &AppContext) -> CliResult<()> {
    let cn = args.cn.unwrap_or_else(|| {
        let joined = format!("{} {}", args.given_name, args.sn);
        let joined = joined.trim();
        if joined.is_empty() {
            args.uid.clone()
        } else {
            joined.to_string()
        }
    });
    let request = CreateUserRequest {
        uid: args.uid,
        cn,
        sn: args.sn,
        given_name: args.given_name,
        mail: args.mail,
        mobile: args.mobile,
        groups: args.groups,
        send_sms: args.sms,
        password: args.password,
    };

    let outcome = ctx
        .manager
        .create_user(request, &AdminId::new(args.admin))
        .await?;
    let created = outcome.value;

    println!("{}", outcome.message);
    println!();
    println!("  Username:        {}", created.uid);
    println!("  Password:        {}", created.secret.expose());
    println!("  Issued secret:   #{}", created.issued_secret_id);
    println!("  SMS:             {}", describe_delivery(&created.delivery));
    for failure in &created.group_failures {
        println!("  Group {:<10} {}", format!("{}:", failure.group), failure.error);
    }
    Ok(())
}

async fn execute_show(args: ShowArgs, ctx: &AppContext) -> CliResult<()> {
    let entry = ctx
        .manager
        .directory()
        .get_user(&args.uid)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("user '{}'", args.uid)))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("DN:                 {}", entry.dn);
    println!("Name:               {}", entry.display_name());
    println!("Mail:               {}", dash(&entry.mail));
    println!("Mobile:             {}", dash(&entry.mobile));
    println!(
        "Account locked:     {}",
        entry.account_locked.map_or("-".to_string(), |l| l.to_string())
    );
    println!(
        "Principal expires:  {}",
        entry
            .principal_expiration
            .map_or("never".to_string(), |at| at.to_rfc3339())
    );
    println!(
        "Failed logins:      {}",
        entry.login_failed_count.unwrap_or_default()
    );
    Ok(())
}

async fn execute_list(args: ListArgs, config: Config) -> CliResult<()> {
    validate_pagination(args.limit, args.offset)?;
    let db = open_database(&config).await?;

    let users = DirectoryUser::list(db.inner(), args.limit, args.offset).await?;
    let total = DirectoryUser::count(db.inner()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else if users.is_empty() {
        println!("No users found.");
    } else {
        print_user_table(&users);
        println!();
        println!("Showing {} of {} users", users.len(), total);
    }
    Ok(())
}

fn print_user_table(users: &[DirectoryUser]) {
    println!(
        "{:<20} {:<25} {:<30} {:<15}",
        "UID", "NAME", "MAIL", "MOBILE"
    );
    println!("{}", "-".repeat(92));

    for user in users {
        println!(
            "{:<20} {:<25} {:<30} {:<15}",
            truncate(&user.uid, 18),
            truncate(&user.full_name(), 23),
            truncate(&user.mail, 28),
            user.mobile.as_deref().unwrap_or("-")
        );
    }
}

fn expiration_change(args: &ExpireArgs) -> CliResult<ExpirationChange> {
    if args.clear {
        return Ok(ExpirationChange::Clear);
    }
    if let Some(at) = args.at {
        return Ok(ExpirationChange::At(at));
    }
    match (args.days, args.hours) {
        (None, None) => Err(CliError::Validation(
            "one of --at, --days, --hours or --clear is required".to_string(),
        )),
        (days, hours) => Ok(ExpirationChange::In {
            days: days.unwrap_or(0),
            hours: hours.unwrap_or(0),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expire(days: Option<i64>, hours: Option<i64>, clear: bool) -> ExpireArgs {
        ExpireArgs {
            uid: "alice".to_string(),
            at: None,
            days,
            hours,
            clear,
        }
    }

    #[test]
    fn test_expiration_change() {
        assert_eq!(
            expiration_change(&expire(None, None, true)).unwrap(),
            ExpirationChange::Clear
        );
        assert_eq!(
            expiration_change(&expire(Some(30), None, false)).unwrap(),
            ExpirationChange::In { days: 30, hours: 0 }
        );
        assert_eq!(
            expiration_change(&expire(None, Some(12), false)).unwrap(),
            ExpirationChange::In { days: 0, hours: 12 }
        );
        assert!(expiration_change(&expire(None, None, false)).is_err());
    }
}
