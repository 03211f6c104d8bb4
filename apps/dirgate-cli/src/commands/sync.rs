//! Directory to mirror reconciliation

use clap::{Args, ValueEnum};

use crate::config::Config;
use crate::context::AppContext;
use crate::error::CliResult;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// What to synchronize
    #[arg(value_enum, default_value_t = SyncTarget::All)]
    pub target: SyncTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncTarget {
    Users,
    Groups,
    All,
}

/// Execute sync
pub async fn execute(args: SyncArgs, config: Config) -> CliResult<()> {
    let ctx = AppContext::init(config).await?;

    // Users first so group sync can link the new rows
    if matches!(args.target, SyncTarget::Users | SyncTarget::All) {
        println!("{}", ctx.manager.sync_from_directory().await?.message);
    }
    if matches!(args.target, SyncTarget::Groups | SyncTarget::All) {
        println!("{}", ctx.manager.sync_groups().await?.message);
    }
    Ok(())
}
