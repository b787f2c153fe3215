//! `paddock init` - create (or reset) both stores

use anyhow::Result;
use clap::Args;

use super::Stores;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Drop all tasks and warehouse data first
    #[arg(long)]
    pub reset: bool,
}

pub fn run(args: InitArgs, config: &Config) -> Result<()> {
    // Opening bootstraps both schemas
    let stores = Stores::open(config)?;
    if args.reset {
        stores.tasks.reset()?;
        stores.warehouse.reset()?;
    }
    eprintln!(
        "Task store: {}\nWarehouse:  {}",
        config.storage.task_db.display(),
        config.storage.warehouse.display()
    );
    Ok(())
}
