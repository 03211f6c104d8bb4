//! Group commands

use clap::{Args, Subcommand};

use dirgate_db::models::DirectoryGroup;

use crate::commands::truncate;
use crate::config::Config;
use crate::context::{open_database, AppContext};
use crate::error::CliResult;

/// Group management commands
#[derive(Args, Debug)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommands,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommands {
    /// Create a group in the directory
    Create(CreateArgs),
    /// Add a user to a group
    Add(MembershipArgs),
    /// Remove a user from a group
    Remove(MembershipArgs),
    /// List groups in the local mirror
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Group name (cn)
    pub cn: String,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct MembershipArgs {
    /// User id (uid)
    pub uid: String,
    /// Group name (cn)
    pub group: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute group commands
pub async fn execute(args: GroupArgs, config: Config) -> CliResult<()> {
    let message = match args.command {
        GroupCommands::List(a) => return execute_list(a, config).await,
        GroupCommands::Create(a) => {
            let ctx = AppContext::init(config).await?;
            ctx.manager
                .create_group(&a.cn, a.description.as_deref())
                .await?
                .message
        }
        GroupCommands::Add(a) => {
            let ctx = AppContext::init(config).await?;
            ctx.manager.add_to_group(&a.uid, &a.group).await?.message
        }
        GroupCommands::Remove(a) => {
            let ctx = AppContext::init(config).await?;
            ctx.manager.remove_from_group(&a.uid, &a.group).await?.message
        }
    };
    println!("{message}");
    Ok(())
}

async fn execute_list(args: ListArgs, config: Config) -> CliResult<()> {
    let db = open_database(&config).await?;
    let groups = DirectoryGroup::list(db.inner()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else if groups.is_empty() {
        println!("No groups found.");
    } else {
        println!("{:<25} {:<10} {:<40}", "CN", "GID", "DESCRIPTION");
        println!("{}", "-".repeat(77));
        for group in &groups {
            println!(
                "{:<25} {:<10} {:<40}",
                truncate(&group.cn, 23),
                group.gid_number.map_or("-".to_string(), |g| g.to_string()),
                truncate(group.description.as_deref().unwrap_or("-"), 38)
            );
        }
    }
    Ok(())
}
