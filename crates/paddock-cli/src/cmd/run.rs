//! `paddock run` - discover and consume concurrently, then export

use anyhow::Result;
use clap::Args;
use paddock_core::ProgressContext;

use super::{LoadMode, Stores, discovery_config, print_run_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Maximum number of tasks to create (0 = unlimited)
    #[arg(default_value_t = 0)]
    pub limit: usize,

    /// Incremental (watermarked) or full discovery
    #[arg(value_enum, default_value = "inc")]
    pub mode: LoadMode,
}

pub async fn run(
    args: RunArgs,
    config: &Config,
    workers: usize,
    progress: &ProgressContext,
) -> Result<()> {
    let stores = Stores::open(config)?;
    let ctx = stores.context(config)?;
    let summary = paddock_pipeline::run(
        &ctx,
        discovery_config(args.limit, args.mode),
        workers,
        progress,
    )
    .await?;
    print_run_summary(&summary);

    super::export::export(&stores, &config.export.path)?;
    Ok(())
}
